//! Load status commands.
mod show;

pub use show::ShowCommand;

use crate::{cli::CommandRegistry, coordinator::Coordinator};

/// Registers the "status" category.
pub fn register_commands(registry: &mut CommandRegistry, coordinator: &Coordinator) {
    registry.register_command("status", Box::new(ShowCommand::new(coordinator.clone())));
}
