//! Local cache-config files: small flat files written by the node itself
//! (access lists, AU definitions, expert overrides) and loaded as the
//! last, highest-precedence sources.

use std::{
    fs,
    io::{ErrorKind, Write},
    path::{Path, PathBuf},
    sync::PoisonError,
};

use tempfile::NamedTempFile;
use tracing::{debug, info, instrument};

use super::{
    Coordinator,
    params::{DEFAULT_CACHE_CONFIG_DIR, PARAM_CACHE_CONFIG_DIR, PARAM_FILE_VERSION_PREFIX, platform},
};
use crate::{
    core::{FleetError, Result},
    source::{
        FilterPolicy, KeyFilter, SourceError, SourceOptions,
        parse::{parse_flat, render_flat},
    },
    tree::{ValueTree, key_ops::join_key},
};

/// Expert overrides; platform and config-loading keys are filtered out.
pub const EXPERT_CONFIG_FILE: &str = "expert_config.txt";

/// Cache-config files loaded on every cycle, in precedence order.
pub const CACHE_CONFIG_FILES: &[&str] = &[
    "ui_ip_access.txt",
    "proxy_ip_access.txt",
    "au.txt",
    "icp_server_config.txt",
    "audit_proxy_config.txt",
    "access_groups_config.txt",
    EXPERT_CONFIG_FILE,
];

const EXPERT_DENIED: &[&str] = &[r"^fleet\.platform\.", r"^fleet\.config\."];

/// Source options for the cache-config file `name`.
pub(super) fn options_for(name: &str) -> SourceOptions {
    let filter = (name == EXPERT_CONFIG_FILE)
        .then(|| KeyFilter::deny(EXPERT_DENIED, FilterPolicy::Lenient).ok())
        .flatten();

    SourceOptions {
        platform: false,
        filter,
    }
}

/// Cache-config directory named by the platform tree, if any.
pub(super) fn dir_from_platform(platform_tree: &ValueTree) -> Option<PathBuf> {
    let first = platform_tree
        .get_list(platform::DISK_SPACE_PATHS)
        .into_iter()
        .next()?;
    let relative = platform_tree.get_or(PARAM_CACHE_CONFIG_DIR, DEFAULT_CACHE_CONFIG_DIR);
    Some(Path::new(&first).join(relative))
}

fn version_key(name: &str) -> String {
    let stem = Path::new(name)
        .file_stem()
        .map_or_else(|| name.to_string(), |s| s.to_string_lossy().into_owned());
    join_key(PARAM_FILE_VERSION_PREFIX, &stem)
}

impl Coordinator {
    /// Fixes the cache-config directory the first time one is known.
    pub(super) fn resolve_cache_config_dir(&self, platform_tree: &ValueTree) {
        if self.inner.cache_dir.get().is_some() {
            return;
        }
        if let Some(dir) = dir_from_platform(platform_tree) {
            info!(dir = %dir.display(), "Cache config directory");
            let _ = self.inner.cache_dir.set(dir);
        }
    }

    fn cache_config_path(&self, name: &str) -> Result<PathBuf> {
        self.cache_config_dir()
            .map(|dir| dir.join(name))
            .ok_or(FleetError::NotLoaded)
    }

    /// Writes `tree` to the cache-config file `name`.
    ///
    /// The file is written to a temporary sibling and renamed into place, so
    /// readers see either the old or the new content in full. A version
    /// stamp is added. Unless `suppress_reload` is set, a reload cycle is
    /// requested afterwards.
    ///
    /// # Errors
    /// `NotLoaded` if the directory is not known yet, `Io` for write
    /// failures and `Persistence` if the rename fails.
    #[instrument(skip(self, tree, header), fields(keys = tree.len()))]
    pub fn write_cache_config_file(
        &self,
        name: &str,
        tree: &ValueTree,
        header: Option<&str>,
        suppress_reload: bool,
    ) -> Result<()> {
        let _guard = self
            .inner
            .cache_write
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        let path = self.cache_config_path(name)?;
        let dir = path.parent().ok_or(FleetError::NotLoaded)?;
        fs::create_dir_all(dir)?;

        let mut stamped = tree.copy();
        stamped.put(version_key(name), "1")?;

        let mut temp = NamedTempFile::new_in(dir)?;
        temp.write_all(render_flat(&stamped, header).as_bytes())?;
        temp.as_file().sync_all()?;
        temp.persist(&path).map_err(|e| FleetError::Persistence {
            path: path.clone(),
            details: e.error.to_string(),
        })?;
        debug!(path = %path.display(), "Wrote cache config file");

        if let Some(source) = self.inner.registry.just_get(&path.to_string_lossy()) {
            source.set_needs_reload();
        }
        if !suppress_reload {
            self.force_reload();
        }
        Ok(())
    }

    /// Reads the cache-config file `name` without its version stamp.
    /// A missing file reads as an empty tree.
    ///
    /// # Errors
    /// `NotLoaded` if the directory is not known yet, `Io` for read
    /// failures and `Source` if the content does not parse.
    pub fn read_cache_config_file(&self, name: &str) -> Result<ValueTree> {
        let path = self.cache_config_path(name)?;

        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(ValueTree::new()),
            Err(e) => return Err(e.into()),
        };

        let mut tree = parse_flat(&text)
            .map_err(|message| SourceError::malformed(&path.to_string_lossy(), message))?;
        tree.remove(&version_key(name))?;
        Ok(tree)
    }
}
