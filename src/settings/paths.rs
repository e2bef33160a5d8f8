use std::{
    env,
    io::{Error, ErrorKind},
    path::PathBuf,
};

/// Environment variable naming the node settings file explicitly.
pub const SETTINGS_ENV: &str = "FLEETCONF_SETTINGS";

/// Locates the node's own settings and log directories.
///
/// Follows the XDG Base Directory specification.
pub struct ConfigPaths;

impl ConfigPaths {
    /// Returns the configuration directory path for the application
    ///
    /// - First checks `XDG_CONFIG_HOME`
    /// - Falls back to `$HOME/.config`
    /// - Appends "fleetconf" to the base config directory
    ///
    /// # Errors
    /// Returns an error if neither `XDG_CONFIG_HOME` nor `HOME` environment variables are set
    pub fn config_dir() -> Result<PathBuf, Error> {
        let config_home = env::var("XDG_CONFIG_HOME")
            .or_else(|_| env::var("HOME").map(|home| format!("{home}/.config")))
            .map_err(|_| {
                Error::new(
                    ErrorKind::NotFound,
                    "Neither XDG_CONFIG_HOME nor HOME environment variable found",
                )
            })?;

        Ok(PathBuf::from(config_home).join("fleetconf"))
    }

    /// Path of the node settings file: `$FLEETCONF_SETTINGS`, else
    /// `node.toml` in [`config_dir`](Self::config_dir).
    ///
    /// # Errors
    /// Returns an error if no location can be determined.
    pub fn settings_file() -> Result<PathBuf, Error> {
        if let Ok(explicit) = env::var(SETTINGS_ENV) {
            return Ok(PathBuf::from(explicit));
        }
        Ok(Self::config_dir()?.join("node.toml"))
    }

    /// Returns the application data directory, creating it if needed.
    ///
    /// # Errors
    /// Returns an error if HOME is not set or the directory cannot be created
    pub fn app_data_dir() -> Result<PathBuf, Error> {
        let data_dir = env::var("HOME")
            .map(|home| format!("{home}/.fleetconf"))
            .map_err(|_| Error::new(ErrorKind::NotFound, "HOME environment variable not found"))?;

        let app_dir = PathBuf::from(data_dir);
        if !app_dir.exists() {
            std::fs::create_dir_all(&app_dir)?;
        }

        Ok(app_dir)
    }

    /// Returns the log directory, creating it if needed.
    ///
    /// # Errors
    /// Returns error if directory cannot be created
    pub fn log_dir() -> Result<PathBuf, Error> {
        let log_dir = Self::app_data_dir()?.join("logs");
        if !log_dir.exists() {
            std::fs::create_dir_all(&log_dir)?;
        }

        Ok(log_dir)
    }
}
