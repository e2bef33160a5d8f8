use crate::coordinator::Coordinator;

use super::{CliError, CommandRegistry};

/// Entry point for running CLI commands against one coordinator.
pub struct CliService {
    registry: CommandRegistry,
}

impl CliService {
    /// Creates a service with every built-in command registered.
    pub fn new(coordinator: Coordinator) -> Self {
        let mut registry = CommandRegistry::new(coordinator);
        registry.register_all_commands();

        CliService { registry }
    }

    /// Executes a command by category and name. `help` (or no category)
    /// returns the command list.
    ///
    /// # Errors
    /// Returns `CliError::CommandNotFound` if the command doesn't exist in
    /// the category, or the command's own error.
    pub fn execute_command(
        &self,
        category: &str,
        command_name: &str,
        args: &[String],
    ) -> Result<String, CliError> {
        if category.is_empty() || category == "help" {
            return Ok(self.registry.help());
        }
        self.registry.execute(category, command_name, args)
    }

    /// Lists all available commands organized by category.
    pub fn list_all(&self) -> Vec<(String, Vec<String>)> {
        self.registry.list_commands()
    }
}
