use std::path::PathBuf;

use thiserror::Error;

use crate::{source::SourceError, tdb::TdbError, tree::TreeError};

/// Error types for the fleetconf crate.
///
/// Per-module errors convert into this enum at the coordinator boundary.
#[derive(Error, Debug)]
pub enum FleetError {
    /// Value tree error
    #[error(transparent)]
    Tree(#[from] TreeError),

    /// Source load error
    #[error(transparent)]
    Source(#[from] SourceError),

    /// Catalog error
    #[error(transparent)]
    Tdb(#[from] TdbError),

    /// Standard I/O operation error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Writing a cache-config file failed at the rename step
    #[error("failed to persist '{path}': {details}")]
    Persistence {
        /// Destination path
        path: PathBuf,
        /// Failure details
        details: String,
    },

    /// Node settings could not be located or parsed
    #[error("failed to load settings at '{location}': {details}")]
    Settings {
        /// Settings file path, or "environment"
        location: String,
        /// Failure details
        details: String,
    },

    /// A reload cycle exceeded the watchdog timeout
    #[error("reload cycle wedged for more than {0:?}")]
    Wedged(std::time::Duration),

    /// No configuration has been installed yet
    #[error("configuration not loaded")]
    NotLoaded,

    /// A background task failed or panicked
    #[error("task failed: {0}")]
    Task(String),
}

/// A specialized `Result` type for fleetconf operations.
pub type Result<T> = std::result::Result<T, FleetError>;

impl FleetError {
    /// Creates a settings error with file path context.
    pub fn settings(error: impl std::fmt::Display, path: Option<&std::path::Path>) -> Self {
        let location = match path {
            Some(p) => p.to_string_lossy().to_string(),
            None => "environment".to_string(),
        };

        FleetError::Settings {
            location,
            details: error.to_string(),
        }
    }
}
