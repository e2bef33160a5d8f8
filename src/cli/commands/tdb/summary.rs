use crate::{
    cli::{
        Command, CommandResult,
        commands::ensure_loaded,
        formatting::format_header,
        types::CommandMetadata,
    },
    coordinator::Coordinator,
};

/// Prints catalog totals and per-plugin AU counts.
pub struct SummaryCommand {
    coordinator: Coordinator,
}

impl SummaryCommand {
    /// Creates a new SummaryCommand reading from `coordinator`.
    pub fn new(coordinator: Coordinator) -> Self {
        Self { coordinator }
    }
}

impl Command for SummaryCommand {
    fn execute(&self, _args: &[String]) -> CommandResult {
        ensure_loaded(&self.coordinator)?;
        let tdb = self.coordinator.tdb();

        let mut out = vec![
            format_header("Title database"),
            format!("Publishers: {}", tdb.publisher_count()),
            format!("Titles: {}", tdb.title_count()),
            format!("AUs: {}", tdb.au_count()),
        ];

        for plugin in tdb.plugin_ids() {
            out.push(format!("  {plugin}: {}", tdb.aus_for_plugin(plugin).count()));
        }

        Ok(out.join("\n"))
    }

    fn metadata(&self) -> CommandMetadata {
        CommandMetadata {
            name: "summary".to_string(),
            description: "Show title database totals".to_string(),
            category: "tdb".to_string(),
            args: vec![],
            examples: vec!["fleetconf tdb summary".to_string()],
        }
    }
}
