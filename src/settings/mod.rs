//! The node's own bootstrap settings: which sources to load and how.

mod paths;

use std::{
    fs,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use tracing::instrument;

pub use paths::{ConfigPaths, SETTINGS_ENV};

use crate::core::{FleetError, Result};

/// One configured source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceEntry {
    /// File path, `file://`, `http(s)://` or `jar:` URL
    pub url: String,

    /// A failure aborts the reload cycle. URLs ending in `.opt` are never
    /// fatal when missing, whatever this says.
    #[serde(default = "default_required")]
    pub required: bool,

    /// Loaded first and used to derive platform conditionals
    #[serde(default)]
    pub platform: bool,
}

impl SourceEntry {
    /// Required, non-platform source.
    pub fn required(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            required: true,
            platform: false,
        }
    }

    /// Optional, non-platform source.
    pub fn optional(url: impl Into<String>) -> Self {
        Self {
            required: false,
            ..Self::required(url)
        }
    }

    /// Required platform source.
    pub fn platform(url: impl Into<String>) -> Self {
        Self {
            platform: true,
            ..Self::required(url)
        }
    }
}

fn default_required() -> bool {
    true
}

/// Settings read from `node.toml`.
///
/// ```toml
/// bundled_catalogs = ["jar:file:///opt/fleet/tdb.zip!/tdb.xml"]
/// local_config_dir = "/var/fleet/config"
/// status_listen = "127.0.0.1:8081"
/// watch_local_files = true
///
/// [[sources]]
/// url = "/etc/fleet/platform.txt"
/// platform = true
///
/// [[sources]]
/// url = "https://props.example.org/fleet.xml"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeSettings {
    /// Platform and administrator sources, in precedence order
    pub sources: Vec<SourceEntry>,
    /// Catalog URLs loaded before everything else; always optional
    pub bundled_catalogs: Vec<String>,
    /// Overrides the cache-config directory derived from the platform tree
    pub local_config_dir: Option<PathBuf>,
    /// Address for the fallback status listener while nothing is loaded
    pub status_listen: Option<String>,
    /// Reload when local source files or cache-config files change
    pub watch_local_files: bool,
    /// Daemon version used by XML version conditionals
    pub daemon_version: Option<String>,
}

impl NodeSettings {
    /// Parses settings from TOML text.
    ///
    /// # Errors
    /// Returns `FleetError::Settings` on invalid TOML.
    pub fn from_toml_str(text: &str, path: Option<&Path>) -> Result<Self> {
        toml::from_str(text).map_err(|e| FleetError::settings(e, path))
    }

    /// Loads settings from `path`.
    ///
    /// # Errors
    /// Returns `FleetError::Settings` if the file cannot be read or parsed.
    #[instrument]
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|e| FleetError::settings(e, Some(path)))?;
        Self::from_toml_str(&text, Some(path))
    }

    /// Loads settings from the default location.
    ///
    /// # Errors
    /// Returns `FleetError::Settings` if the location is unknown or the
    /// file is unreadable.
    pub fn load_default() -> Result<Self> {
        let path = ConfigPaths::settings_file().map_err(|e| FleetError::settings(e, None))?;
        Self::load(&path)
    }

    /// Sources flagged `platform`.
    pub fn platform_sources(&self) -> impl Iterator<Item = &SourceEntry> {
        self.sources.iter().filter(|s| s.platform)
    }

    /// Administrator sources (everything not flagged `platform`).
    pub fn admin_sources(&self) -> impl Iterator<Item = &SourceEntry> {
        self.sources.iter().filter(|s| !s.platform)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn parses_full_settings() {
        let settings = NodeSettings::from_toml_str(
            r#"
            bundled_catalogs = ["jar:file:///opt/tdb.zip!/tdb.xml"]
            status_listen = "127.0.0.1:0"
            watch_local_files = true

            [[sources]]
            url = "/etc/fleet/platform.txt"
            platform = true

            [[sources]]
            url = "http://props/fleet.xml"

            [[sources]]
            url = "http://props/extra.xml"
            required = false
            "#,
            None,
        )
        .unwrap();

        assert_eq!(settings.platform_sources().count(), 1);
        let admin: Vec<_> = settings.admin_sources().collect();
        assert_eq!(admin.len(), 2);
        assert!(admin[0].required);
        assert!(!admin[1].required);
        assert!(settings.watch_local_files);
        assert_eq!(settings.local_config_dir, None);
    }

    #[test]
    fn empty_document_is_default() {
        assert_eq!(NodeSettings::from_toml_str("", None).unwrap(), NodeSettings::default());
    }

    #[test]
    fn bad_toml_names_location() {
        let err = NodeSettings::from_toml_str("sources = 3", Some(Path::new("/x/node.toml"))).unwrap_err();
        assert!(err.to_string().contains("/x/node.toml"));
    }
}
