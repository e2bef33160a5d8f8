//! Process-wide cache of configuration sources keyed by URL.

use std::{
    collections::HashMap,
    sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard, PoisonError},
};

use tracing::{debug, info};

use crate::source::{LoadContext, SharedSource, Source, SourceError, SourceOptions};

/// Keyed cache of [`Source`]s.
///
/// A source is only cached after its first load succeeds, so a URL that
/// fails initially is retried from scratch on the next request.
#[derive(Debug, Default)]
pub struct SourceRegistry {
    sources: RwLock<HashMap<String, SharedSource>>,
}

impl SourceRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, SharedSource>> {
        self.sources.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, SharedSource>> {
        self.sources.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns the cached source for `url`, creating and loading it first if
    /// needed.
    ///
    /// # Errors
    /// The initial load's error. Nothing is cached in that case.
    pub fn get(&self, url: &str, ctx: &LoadContext) -> Result<SharedSource, SourceError> {
        self.get_with(url, ctx, SourceOptions::default())
    }

    /// Like [`get`](Self::get), with options applied when the source is
    /// created. Options are ignored for an already cached source.
    ///
    /// # Errors
    /// The initial load's error. Nothing is cached in that case.
    pub fn get_with(
        &self,
        url: &str,
        ctx: &LoadContext,
        options: SourceOptions,
    ) -> Result<SharedSource, SourceError> {
        if let Some(source) = self.just_get(url) {
            return Ok(source);
        }

        let source = Arc::new(Source::new(url, options)?);
        source.reload(ctx)?;
        info!(url, "Registered configuration source");

        let mut sources = self.write();
        let entry = sources.entry(url.to_string()).or_insert(source);
        Ok(entry.clone())
    }

    /// Returns the cached source without any I/O.
    pub fn just_get(&self, url: &str) -> Option<SharedSource> {
        self.read().get(url).cloned()
    }

    /// Drops the cached source for `url`.
    pub fn remove(&self, url: &str) -> Option<SharedSource> {
        let removed = self.write().remove(url);
        if removed.is_some() {
            debug!(url, "Removed configuration source");
        }
        removed
    }

    /// Forces every cached source to fetch unconditionally next time.
    pub fn mark_all_needs_reload(&self) {
        for source in self.read().values() {
            source.set_needs_reload();
        }
    }

    /// Cached URLs, sorted.
    pub fn urls(&self) -> Vec<String> {
        let mut urls: Vec<String> = self.read().keys().cloned().collect();
        urls.sort();
        urls
    }

    /// Cached sources.
    pub fn sources(&self) -> Vec<SharedSource> {
        self.read().values().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use std::fs;

    use super::*;

    #[test]
    fn caches_after_successful_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.txt");
        fs::write(&path, "a=1\n").unwrap();
        let url = path.to_str().unwrap();

        let registry = SourceRegistry::new();
        let ctx = LoadContext::default();

        let first = registry.get(url, &ctx).unwrap();
        let second = registry.get(url, &ctx).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(registry.urls(), vec![url.to_string()]);

        registry.mark_all_needs_reload();
        assert!(first.needs_reload());

        assert!(registry.remove(url).is_some());
        assert!(registry.just_get(url).is_none());
    }

    #[test]
    fn failed_initial_load_is_not_cached() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("later.txt");
        let url = path.to_str().unwrap();
        let registry = SourceRegistry::new();
        let ctx = LoadContext::default();

        assert!(registry.get(url, &ctx).unwrap_err().is_not_found());
        assert!(registry.just_get(url).is_none());

        fs::write(&path, "a=1\n").unwrap();
        assert!(registry.get(url, &ctx).is_ok());
    }
}
