//! Title database (catalog) inspection commands.
mod publisher;
mod summary;

pub use publisher::PublisherCommand;
pub use summary::SummaryCommand;

use crate::{cli::CommandRegistry, coordinator::Coordinator};

/// Registers the "tdb" category: `summary` and `publisher`.
pub fn register_commands(registry: &mut CommandRegistry, coordinator: &Coordinator) {
    const CATEGORY_NAME: &str = "tdb";

    registry.register_command(CATEGORY_NAME, Box::new(SummaryCommand::new(coordinator.clone())));
    registry.register_command(CATEGORY_NAME, Box::new(PublisherCommand::new(coordinator.clone())));
}
