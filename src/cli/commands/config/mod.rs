//! Configuration inspection commands.
mod dump;
mod get;
mod watch;

pub use dump::DumpCommand;
pub use get::GetCommand;
pub use watch::WatchCommand;

use crate::{cli::CommandRegistry, coordinator::Coordinator};

/// Registers the "config" category: `get`, `dump` and `watch`.
pub fn register_commands(registry: &mut CommandRegistry, coordinator: &Coordinator) {
    const CATEGORY_NAME: &str = "config";

    registry.register_command(CATEGORY_NAME, Box::new(GetCommand::new(coordinator.clone())));
    registry.register_command(CATEGORY_NAME, Box::new(DumpCommand::new(coordinator.clone())));
    registry.register_command(CATEGORY_NAME, Box::new(WatchCommand::new(coordinator.clone())));
}
