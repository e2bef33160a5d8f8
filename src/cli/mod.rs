//! Command-line interface for inspecting a node's configuration.
//!
//! Commands are organized by category (`config`, `tdb`, `status`) and share
//! one [`Coordinator`](crate::coordinator::Coordinator). Each command loads
//! the configuration once if nothing is installed yet.

mod commands;
pub mod formatting;
mod registry;
mod service;
mod types;

#[cfg(test)]
mod tests;

pub use commands::config::GetCommand;
pub use registry::CommandRegistry;
pub use service::CliService;
pub use types::{ArgType, CliError, Command, CommandArg, CommandMetadata, CommandResult};
