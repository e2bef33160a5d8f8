use crate::{
    cli::{
        CliError, Command, CommandResult,
        commands::ensure_loaded,
        formatting::{format_header, format_subheader},
        types::{ArgType, CommandArg, CommandMetadata},
    },
    coordinator::Coordinator,
};

/// Lists one publisher's titles and their AUs.
pub struct PublisherCommand {
    coordinator: Coordinator,
}

impl PublisherCommand {
    /// Creates a new PublisherCommand reading from `coordinator`.
    pub fn new(coordinator: Coordinator) -> Self {
        Self { coordinator }
    }
}

impl Command for PublisherCommand {
    fn execute(&self, args: &[String]) -> CommandResult {
        let name = args.first().ok_or_else(|| {
            CliError::InvalidArguments("Expected <name> argument for 'publisher' command".to_string())
        })?;

        ensure_loaded(&self.coordinator)?;
        let tdb = self.coordinator.tdb();

        let (_, publisher) = tdb
            .publisher_by_name(name)
            .ok_or_else(|| CliError::ConfigError(format!("No publisher named '{name}'")))?;

        let mut out = vec![format_header(publisher.name())];
        for title in publisher.titles().iter().filter_map(|id| tdb.title(*id)) {
            out.push(format_subheader(&format!("{} ({})", title.name(), title.id())));
            for au in tdb.title_aus(title) {
                out.push(format!("  {}  {}", au.name(), au.key()));
            }
        }

        Ok(out.join("\n"))
    }

    fn metadata(&self) -> CommandMetadata {
        CommandMetadata {
            name: "publisher".to_string(),
            description: "List a publisher's titles and AUs".to_string(),
            category: "tdb".to_string(),
            args: vec![CommandArg {
                name: "name".to_string(),
                description: "Publisher name, exactly as in the catalog".to_string(),
                required: true,
                value_type: ArgType::String,
            }],
            examples: vec!["fleetconf tdb publisher 'Acme Press'".to_string()],
        }
    }
}
