use crate::{
    cli::{
        Command, CommandResult,
        commands::ensure_loaded,
        types::{ArgType, CommandArg, CommandMetadata},
    },
    coordinator::Coordinator,
};

/// Prints every merged key, or those under a prefix, as `key=value` lines.
pub struct DumpCommand {
    coordinator: Coordinator,
}

impl DumpCommand {
    /// Creates a new DumpCommand reading from `coordinator`.
    pub fn new(coordinator: Coordinator) -> Self {
        Self { coordinator }
    }
}

impl Command for DumpCommand {
    fn execute(&self, args: &[String]) -> CommandResult {
        ensure_loaded(&self.coordinator)?;

        let snapshot = self.coordinator.current();
        let tree = snapshot.tree();

        let lines: Vec<String> = match args.first() {
            Some(prefix) => tree
                .keys_under(prefix)
                .map(|key| format!("{key}={}", tree.get_or(key, "")))
                .collect(),
            None => tree.iter().map(|(key, value)| format!("{key}={value}")).collect(),
        };

        Ok(lines.join("\n"))
    }

    fn metadata(&self) -> CommandMetadata {
        CommandMetadata {
            name: "dump".to_string(),
            description: "Print the merged configuration".to_string(),
            category: "config".to_string(),
            args: vec![CommandArg {
                name: "prefix".to_string(),
                description: "Only keys under this prefix".to_string(),
                required: false,
                value_type: ArgType::Prefix,
            }],
            examples: vec![
                "fleetconf config dump".to_string(),
                "fleetconf config dump fleet.platform".to_string(),
            ],
        }
    }
}
