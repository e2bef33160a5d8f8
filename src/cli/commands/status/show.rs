use crate::{
    cli::{
        CliError, Command, CommandResult,
        types::{ArgType, CommandArg, CommandMetadata},
    },
    coordinator::Coordinator,
};

const FORMATS: [&str; 2] = ["text", "json"];

/// Runs one reload cycle and prints the resulting status, including the
/// error of a failed load.
pub struct ShowCommand {
    coordinator: Coordinator,
}

impl ShowCommand {
    /// Creates a new ShowCommand reporting on `coordinator`.
    pub fn new(coordinator: Coordinator) -> Self {
        Self { coordinator }
    }
}

impl Command for ShowCommand {
    fn execute(&self, args: &[String]) -> CommandResult {
        let format = args.first().map_or("text", String::as_str);
        if !FORMATS.contains(&format) {
            return Err(CliError::InvalidArguments(format!(
                "Unknown format '{format}', expected one of: {}",
                FORMATS.join(", ")
            )));
        }

        if !self.coordinator.is_loaded() {
            let _ = self.coordinator.update_config();
        }
        let report = self.coordinator.status();

        match format {
            "json" => serde_json::to_string_pretty(&report)
                .map_err(|e| CliError::ServiceError(e.to_string())),
            _ => Ok(report.to_string().trim_end().to_string()),
        }
    }

    fn metadata(&self) -> CommandMetadata {
        CommandMetadata {
            name: "show".to_string(),
            description: "Show configuration load status".to_string(),
            category: "status".to_string(),
            args: vec![CommandArg {
                name: "format".to_string(),
                description: "Output format".to_string(),
                required: false,
                value_type: ArgType::Choice(FORMATS.iter().map(ToString::to_string).collect()),
            }],
            examples: vec![
                "fleetconf status show".to_string(),
                "fleetconf status show json".to_string(),
            ],
        }
    }
}
