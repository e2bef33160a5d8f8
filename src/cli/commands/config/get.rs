use crate::{
    cli::{
        CliError, Command, CommandResult,
        commands::ensure_loaded,
        formatting::format_value,
        types::{ArgType, CommandArg, CommandMetadata},
    },
    coordinator::Coordinator,
};

/// Prints the merged value of one configuration key.
///
/// # Example Usage
///
/// ```bash
/// fleetconf config get fleet.ui.port
/// fleetconf config get fleet.localIdentity
/// ```
pub struct GetCommand {
    coordinator: Coordinator,
}

impl GetCommand {
    /// Creates a new GetCommand reading from `coordinator`.
    pub fn new(coordinator: Coordinator) -> Self {
        Self { coordinator }
    }
}

impl Command for GetCommand {
    /// # Errors
    ///
    /// * `CliError::InvalidArguments` - If no key argument is provided
    /// * `CliError::ConfigError` - If loading fails or the key is unset
    fn execute(&self, args: &[String]) -> CommandResult {
        let key = args.first().ok_or_else(|| {
            CliError::InvalidArguments("Expected <key> argument for 'get' command".to_string())
        })?;

        ensure_loaded(&self.coordinator)?;

        let snapshot = self.coordinator.current();
        let value = snapshot
            .get(key)
            .ok_or_else(|| CliError::ConfigError(format!("Key '{key}' is not set")))?;

        Ok(format!("{}: {}", key, format_value(Some(value))))
    }

    fn metadata(&self) -> CommandMetadata {
        CommandMetadata {
            name: "get".to_string(),
            description: "Get a merged configuration value".to_string(),
            category: "config".to_string(),
            args: vec![CommandArg {
                name: "key".to_string(),
                description: "Configuration key (e.g., fleet.ui.port)".to_string(),
                required: true,
                value_type: ArgType::Key,
            }],
            examples: vec![
                "fleetconf config get fleet.ui.port".to_string(),
                "fleetconf config get fleet.localIdentity".to_string(),
            ],
        }
    }
}
