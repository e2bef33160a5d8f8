pub mod config;
pub mod status;
pub mod tdb;

use crate::{cli::CliError, coordinator::Coordinator};

/// Runs one reload cycle unless a configuration is already installed.
fn ensure_loaded(coordinator: &Coordinator) -> Result<(), CliError> {
    if coordinator.is_loaded() {
        return Ok(());
    }

    coordinator
        .update_config()
        .map(|_| ())
        .map_err(|e| CliError::ConfigError(e.to_string()))
}
