use std::collections::HashMap;

use crate::coordinator::Coordinator;

use super::{
    CliError, Command,
    commands::{config, status, tdb},
    formatting::{format_category, format_command, format_description, format_header, format_usage},
    types::CommandMetadata,
};

/// Registry for CLI commands organized by category.
///
/// ```text
/// registry
/// ├── config
/// │   ├── dump
/// │   ├── get
/// │   └── watch
/// ├── status
/// │   └── show
/// └── tdb
///     ├── publisher
///     └── summary
/// ```
pub struct CommandRegistry {
    /// Category name -> (command name -> command implementation)
    categories: HashMap<String, HashMap<String, Box<dyn Command>>>,
    coordinator: Coordinator,
}

impl CommandRegistry {
    /// Creates an empty registry. Commands are added with
    /// [`register_command`](Self::register_command) or
    /// [`register_all_commands`](Self::register_all_commands).
    pub fn new(coordinator: Coordinator) -> Self {
        Self {
            categories: HashMap::new(),
            coordinator,
        }
    }

    /// Registers a command in `category`, replacing any command of the same
    /// name.
    pub fn register_command(&mut self, category: &str, command: Box<dyn Command>) {
        self.categories
            .entry(category.to_string())
            .or_default()
            .insert(command.metadata().name, command);
    }

    /// Executes a command by category and name.
    ///
    /// # Errors
    ///
    /// Returns `CliError::CommandNotFound` for an unknown category or
    /// command, `CliError::InvalidArguments` for a wrong argument count, and
    /// whatever the command itself returns.
    pub fn execute(
        &self,
        category: &str,
        command_name: &str,
        args: &[String],
    ) -> Result<String, CliError> {
        let found_category = self.categories.get(category).ok_or_else(|| {
            CliError::CommandNotFound(format!("Failed to find category '{category}'"))
        })?;

        let found_command = found_category.get(command_name).ok_or_else(|| {
            CliError::CommandNotFound(format!("Failed to find command '{command_name}'"))
        })?;

        Self::validate_args(&found_command.metadata(), args)?;

        found_command.execute(args)
    }

    /// All registered commands by category, both sorted alphabetically.
    pub fn list_commands(&self) -> Vec<(String, Vec<String>)> {
        let mut categories: Vec<(String, Vec<String>)> = self
            .categories
            .iter()
            .map(|(category, commands)| {
                let mut command_list: Vec<String> = commands.keys().cloned().collect();
                command_list.sort();

                (category.clone(), command_list)
            })
            .collect();

        categories.sort();

        categories
    }

    /// Help text listing every command with its description and examples.
    pub fn help(&self) -> String {
        let mut out = format_header("fleetconf commands");
        out.push('\n');

        for (category, names) in self.list_commands() {
            out.push_str(&format!("\n{}\n", format_category(&category)));
            for name in names {
                let Some(command) = self.categories.get(&category).and_then(|c| c.get(&name))
                else {
                    continue;
                };
                let metadata = command.metadata();
                let args: Vec<String> = metadata
                    .args
                    .iter()
                    .map(|arg| {
                        if arg.required {
                            format!("<{}>", arg.name)
                        } else {
                            format!("[{}]", arg.name)
                        }
                    })
                    .collect();

                out.push_str(&format!(
                    "  {} {}  {}\n",
                    format_command(&name),
                    args.join(" "),
                    format_description(&metadata.description)
                ));
                for example in &metadata.examples {
                    out.push_str(&format!("      {}\n", format_usage(example)));
                }
            }
        }
        out
    }

    fn validate_args(metadata: &CommandMetadata, args: &[String]) -> Result<(), CliError> {
        let required_count = metadata.args.iter().filter(|arg| arg.required).count();
        let total_count = metadata.args.len();

        if args.len() < required_count {
            return Err(CliError::InvalidArguments(format!(
                "Expected at least {} arguments, got {}",
                required_count,
                args.len(),
            )));
        }

        if args.len() > total_count {
            return Err(CliError::InvalidArguments(format!(
                "Expected at most {} arguments, got {}",
                total_count,
                args.len(),
            )));
        }

        Ok(())
    }

    /// Registers every built-in command.
    pub fn register_all_commands(&mut self) {
        let coordinator = self.coordinator.clone();
        config::register_commands(self, &coordinator);
        tdb::register_commands(self, &coordinator);
        status::register_commands(self, &coordinator);
    }
}
