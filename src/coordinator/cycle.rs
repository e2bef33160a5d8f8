//! One reload cycle: bootstrap, resolve, detect, merge, install, notify.

use std::{collections::BTreeMap, sync::Arc};

use tracing::{debug, info, instrument, warn};

use super::{
    CycleState, Coordinator, Differences, Snapshot, cache_config,
    params::{
        DEFAULT_RELOAD_INTERVAL, PARAM_CONNECT_TIMEOUT, PARAM_DATA_TIMEOUT, PARAM_RELOAD_INTERVAL,
    },
    platform,
};
use crate::{
    core::{FleetError, Result},
    source::{
        DEFAULT_CONNECT_TIMEOUT, DEFAULT_DATA_TIMEOUT, Generation, LoadContext, OPTIONAL_SUFFIX,
        SourceError, SourceOptions, parse::Conditionals,
    },
    tdb::Tdb,
    tree::ValueTree,
};

/// Generations gathered by one cycle, in precedence order.
struct Resolved {
    generations: Vec<Generation>,
    has_local_overrides: bool,
}

impl Resolved {
    fn table(&self) -> BTreeMap<String, u64> {
        self.generations
            .iter()
            .map(|g| (g.url.clone(), g.number))
            .collect()
    }
}

/// New snapshot, old snapshot and their differences.
type Installed = (Arc<Snapshot>, Arc<Snapshot>, Differences);

/// True if a failure of this source must abort the cycle.
fn is_fatal(required: bool, url: &str, error: &SourceError) -> bool {
    required && !(url.ends_with(OPTIONAL_SUFFIX) && error.is_not_found())
}

impl Coordinator {
    /// Runs one reload cycle.
    ///
    /// Returns true when a new snapshot was installed. A required source
    /// failure leaves the installed snapshot untouched, is recorded on the
    /// status board and is returned.
    ///
    /// # Errors
    /// The first required source failure, or a tree/catalog error from the
    /// merge.
    #[instrument(skip(self))]
    pub fn update_config(&self) -> Result<bool> {
        self.inner.status.attempt();

        let result = {
            let mut state = self.cycle_state();
            self.run_cycle(&mut state)
        };

        match &result {
            Ok(installed) => {
                self.inner.status.succeeded();
                if let Some((new, old, diff)) = installed {
                    self.inner.callbacks.invoke_all(new, old, diff);
                    self.inner.subscribers.publish(new, diff);
                    self.inner.loaded.send_replace(true);
                }
            }
            Err(FleetError::Source(error)) => self.inner.status.failed(Some(error.url()), error),
            Err(error) => self.inner.status.failed(None, error),
        }

        result.map(|installed| installed.is_some())
    }

    /// Everything up to and including the install, under the cycle lock.
    /// Notification happens after the lock is released, and the loaded gate
    /// opens only once the first install has been published.
    fn run_cycle(&self, state: &mut CycleState) -> Result<Option<Installed>> {
        let platform = self.bootstrap_platform(state)?;

        let conditionals = state.conditionals.clone().unwrap_or_default();
        let ctx = self.load_context(conditionals);
        let resolved = self.resolve(&ctx, platform)?;
        let table = resolved.table();

        let loaded = self.is_loaded();
        if loaded && table == state.generations {
            debug!("No source changed");
            return Ok(None);
        }

        let old = self.current();
        let platform_tree = state.platform_tree.clone().unwrap_or_default();
        let new = merge(&resolved, &platform_tree, &old)?;
        let diff = Differences::compute(&new, loaded.then_some(old.as_ref()));

        if loaded && diff.is_empty() {
            debug!("Sources changed but merged configuration is identical");
            state.generations = table;
            return Ok(None);
        }

        let new = Arc::new(new);
        self.inner.current.store(new.clone());
        state.generations = table;

        let interval = new
            .tree()
            .get_time_interval_or(PARAM_RELOAD_INTERVAL, DEFAULT_RELOAD_INTERVAL);
        *self
            .inner
            .reload_interval
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner) = interval;

        info!(
            keys = new.tree().len(),
            aus = new.tdb().au_count(),
            changed_aus = diff.tdb.new_aus.len(),
            local_overrides = new.has_local_overrides(),
            "Installed new configuration"
        );

        Ok(Some((new, old, diff)))
    }

    /// Reloads the platform sources and, when their content moved, rebuilds
    /// the platform tree and conditionals.
    ///
    /// Until something is installed every platform source is fetched
    /// unconditionally. Returns the platform generations for the merge.
    fn bootstrap_platform(&self, state: &mut CycleState) -> Result<Vec<Generation>> {
        let force = state.platform_tree.is_none() || !self.is_loaded();
        let ctx = self.load_context(state.conditionals.clone().unwrap_or_default());
        let mut generations = Vec::new();

        for entry in self.settings().platform_sources() {
            let options = SourceOptions {
                platform: true,
                filter: None,
            };
            match self.load_generation(&entry.url, &ctx, options, force) {
                Ok(generation) => generations.push(generation),
                Err(error) if is_fatal(entry.required, &entry.url, &error) => {
                    return Err(error.into());
                }
                Err(error) => warn!(%error, "Skipping optional platform source"),
            }
        }

        let numbers: BTreeMap<String, u64> = generations
            .iter()
            .map(|g| (g.url.clone(), g.number))
            .collect();
        if !force && numbers == state.platform_generations {
            return Ok(generations);
        }

        let mut tree = ValueTree::new();
        for generation in &generations {
            tree.copy_from(&generation.tree)?;
        }

        let conditionals = platform::conditionals(&tree, self.settings().daemon_version.as_deref());
        if state
            .conditionals
            .as_ref()
            .is_some_and(|previous| *previous != conditionals)
        {
            info!(groups = ?conditionals.groups(), "Platform conditionals changed, reloading all sources");
            self.inner.registry.mark_all_needs_reload();
        }

        self.resolve_cache_config_dir(&tree);
        debug!(keys = tree.len(), "Platform bootstrap complete");

        state.platform_tree = Some(Arc::new(tree));
        state.conditionals = Some(conditionals);
        state.platform_generations = numbers;
        Ok(generations)
    }

    /// Resolves every configured source in precedence order.
    fn resolve(&self, ctx: &LoadContext, platform: Vec<Generation>) -> Result<Resolved> {
        let settings = self.settings();
        let mut generations = Vec::new();

        for url in &settings.bundled_catalogs {
            self.push_optional(&mut generations, url, ctx, SourceOptions::default());
        }

        generations.extend(platform);

        for entry in settings.admin_sources() {
            match self.load_generation(&entry.url, ctx, SourceOptions::default(), false) {
                Ok(generation) => generations.push(generation),
                Err(error) if is_fatal(entry.required, &entry.url, &error) => {
                    return Err(error.into());
                }
                Err(error) if error.is_not_found() => debug!(url = %entry.url, "Optional source absent"),
                Err(error) => warn!(%error, "Skipping optional source"),
            }
        }

        let before = generations.len();
        if let Some(dir) = self.cache_config_dir().map(ToOwned::to_owned) {
            for name in cache_config::CACHE_CONFIG_FILES {
                let path = dir.join(name);
                if !path.exists() {
                    continue;
                }
                let url = path.to_string_lossy();
                self.push_optional(&mut generations, &url, ctx, cache_config::options_for(name));
            }
        }
        let has_local_overrides = generations.len() > before;

        Ok(Resolved {
            generations,
            has_local_overrides,
        })
    }

    fn push_optional(
        &self,
        generations: &mut Vec<Generation>,
        url: &str,
        ctx: &LoadContext,
        options: SourceOptions,
    ) {
        match self.load_generation(url, ctx, options, false) {
            Ok(generation) => generations.push(generation),
            Err(error) if error.is_not_found() => debug!(url, "Optional source absent"),
            Err(error) => warn!(%error, "Skipping optional source"),
        }
    }

    /// Current generation of `url`, loading it first if needed.
    ///
    /// A source created by this call has just been loaded by the registry,
    /// so no second fetch is made.
    fn load_generation(
        &self,
        url: &str,
        ctx: &LoadContext,
        options: SourceOptions,
        force: bool,
    ) -> std::result::Result<Generation, SourceError> {
        let registry = &self.inner.registry;

        if let Some(source) = registry.just_get(url) {
            if force {
                source.set_needs_reload();
            }
            return source.generation(ctx);
        }

        registry
            .get_with(url, ctx, options)?
            .current_generation()
            .ok_or_else(|| SourceError::transient(url, "no content loaded"))
    }

    /// Load settings for this cycle, taken from the installed snapshot.
    fn load_context(&self, conditionals: Conditionals) -> LoadContext {
        let current = self.current();
        let tree = current.tree();

        LoadContext {
            connect_timeout: tree.get_time_interval_or(PARAM_CONNECT_TIMEOUT, DEFAULT_CONNECT_TIMEOUT),
            data_timeout: tree.get_time_interval_or(PARAM_DATA_TIMEOUT, DEFAULT_DATA_TIMEOUT),
            conditionals,
        }
    }
}

/// Merges the resolved generations into a new snapshot. Later generations
/// win for keys; for the catalog the first entry wins.
fn merge(resolved: &Resolved, platform_tree: &ValueTree, old: &Snapshot) -> Result<Snapshot> {
    let mut tree = ValueTree::new();
    let mut tdb = Tdb::new();
    let mut carried_catalog = false;

    for generation in &resolved.generations {
        tree.copy_from(&generation.tree)?;

        if let Some(catalog) = &generation.tdb {
            carried_catalog = true;
            let added = tdb.copy_from(catalog)?;
            debug!(url = %generation.url, added, "Merged catalog");
        }
    }

    platform::derive(&mut tree, &platform::groups(platform_tree))?;

    let tdb = if carried_catalog {
        tdb.seal();
        Arc::new(tdb)
    } else {
        old.tdb().clone()
    };

    Ok(Snapshot::new(tree, tdb, resolved.has_local_overrides))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn optional_suffix_tolerates_only_not_found() {
        let missing = SourceError::not_found("a.txt.opt");
        let broken = SourceError::malformed("a.txt.opt", "bad");

        assert!(!is_fatal(true, "a.txt.opt", &missing));
        assert!(is_fatal(true, "a.txt.opt", &broken));
        assert!(is_fatal(true, "a.txt", &missing));
        assert!(!is_fatal(false, "a.txt", &broken));
    }
}
