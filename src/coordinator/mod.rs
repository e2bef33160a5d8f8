//! The reload coordinator.
//!
//! A [`Coordinator`] owns the source registry and the installed
//! [`Snapshot`]. Each reload cycle resolves every configured source, merges
//! the generations in precedence order, runs the derivation pass and, when
//! something changed, swaps the new snapshot in and notifies callbacks and
//! subscriptions.
//!
//! Readers never block: [`Coordinator::current`] is a lock-free load of
//! the installed snapshot.

mod cache_config;
mod callbacks;
mod cycle;
mod file_watcher;
pub mod params;
mod platform;
mod scheduler;
mod snapshot;
mod status;

#[cfg(test)]
mod tests;

use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
    sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError},
    time::Duration,
};

use arc_swap::ArcSwap;
use tokio::sync::{Notify, watch};
use tokio_util::sync::CancellationToken;

pub use cache_config::{CACHE_CONFIG_FILES, EXPERT_CONFIG_FILE};
pub use callbacks::{CallbackId, ConfigCallback, ConfigChange, Subscription, SubscriptionStream};
pub use snapshot::{Differences, Snapshot};
pub use status::{SourceStatus, StatusReport};

use crate::{
    registry::SourceRegistry,
    settings::NodeSettings,
    source::parse::Conditionals,
    tdb::Tdb,
    tree::ValueTree,
};
use callbacks::{Callbacks, Subscribers};
use status::StatusBoard;

/// State owned by the reload worker between cycles.
#[derive(Debug, Default)]
struct CycleState {
    /// Generation number per URL, as of the last install
    generations: BTreeMap<String, u64>,
    /// Platform generation numbers the platform tree was built from
    platform_generations: BTreeMap<String, u64>,
    platform_tree: Option<Arc<ValueTree>>,
    conditionals: Option<Conditionals>,
}

struct Inner {
    settings: NodeSettings,
    registry: SourceRegistry,
    current: ArcSwap<Snapshot>,
    loaded: watch::Sender<bool>,
    cycle: Mutex<CycleState>,
    reload_interval: Mutex<Duration>,
    status: StatusBoard,
    callbacks: Callbacks,
    subscribers: Arc<Subscribers>,
    cache_dir: OnceLock<PathBuf>,
    cache_write: Mutex<()>,
    reload: Notify,
    cancel: CancellationToken,
}

/// Loads, merges and distributes the node's configuration.
///
/// Cheap to clone; clones share the same state. Tests build as many
/// independent instances as they like.
#[derive(Clone)]
pub struct Coordinator {
    inner: Arc<Inner>,
}

impl Coordinator {
    /// Creates a coordinator for `settings`. Nothing is loaded until the
    /// first [`update_config`](Self::update_config) or [`start`](Self::start).
    pub fn new(settings: NodeSettings) -> Self {
        let (loaded, _) = watch::channel(false);

        let cache_dir = OnceLock::new();
        if let Some(dir) = &settings.local_config_dir {
            let _ = cache_dir.set(dir.clone());
        }

        Self {
            inner: Arc::new(Inner {
                settings,
                registry: SourceRegistry::new(),
                current: ArcSwap::from_pointee(Snapshot::empty()),
                loaded,
                cycle: Mutex::new(CycleState::default()),
                reload_interval: Mutex::new(params::DEFAULT_RELOAD_INTERVAL),
                status: StatusBoard::default(),
                callbacks: Callbacks::default(),
                subscribers: Arc::new(Subscribers::default()),
                cache_dir,
                cache_write: Mutex::new(()),
                reload: Notify::new(),
                cancel: CancellationToken::new(),
            }),
        }
    }

    fn cycle_state(&self) -> MutexGuard<'_, CycleState> {
        self.inner.cycle.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Settings this coordinator was built from.
    pub fn settings(&self) -> &NodeSettings {
        &self.inner.settings
    }

    /// The source cache.
    pub fn registry(&self) -> &SourceRegistry {
        &self.inner.registry
    }

    /// The installed snapshot, or an empty one before the first install.
    pub fn current(&self) -> Arc<Snapshot> {
        self.inner.current.load_full()
    }

    /// The installed catalog.
    pub fn tdb(&self) -> Arc<Tdb> {
        self.current().tdb().clone()
    }

    /// True once a configuration has been installed.
    pub fn is_loaded(&self) -> bool {
        *self.inner.loaded.borrow()
    }

    /// Waits until a configuration is installed or `timeout` elapses.
    /// Returns whether one was installed.
    pub async fn wait_for_config(&self, timeout: Duration) -> bool {
        let mut loaded = self.inner.loaded.subscribe();
        matches!(
            tokio::time::timeout(timeout, loaded.wait_for(|loaded| *loaded)).await,
            Ok(Ok(_))
        )
    }

    /// Registers a callback run after every install.
    ///
    /// If a configuration is already installed, the callback runs once
    /// right away with an empty old snapshot and every key marked changed.
    pub fn register_callback<F>(&self, callback: F) -> CallbackId
    where
        F: Fn(&Snapshot, &Snapshot, &Differences) + Send + Sync + 'static,
    {
        let callback: Arc<ConfigCallback> = Arc::new(callback);
        let id = self.inner.callbacks.register(callback.clone());

        if self.is_loaded() {
            let current = self.current();
            let diff = Differences::all(&current);
            callbacks::invoke(id, callback.as_ref(), &current, &Snapshot::empty(), &diff);
        }
        id
    }

    /// Removes a callback. Returns false if it was not registered.
    pub fn unregister_callback(&self, id: CallbackId) -> bool {
        self.inner.callbacks.unregister(id)
    }

    /// Subscribes to changes under `prefix`. A `*` segment matches any
    /// single key segment. Dropping the handle unsubscribes.
    pub fn subscribe(&self, prefix: &str) -> Subscription {
        self.inner.subscribers.subscribe(prefix)
    }

    /// Current load status.
    pub fn status(&self) -> StatusReport {
        self.inner.status.report(self.is_loaded(), &self.inner.registry)
    }

    /// Interval read from the most recently installed configuration.
    pub fn reload_interval(&self) -> Duration {
        *self
            .inner
            .reload_interval
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Wakes the scheduler for an immediate reload cycle.
    pub fn force_reload(&self) {
        self.inner.reload.notify_one();
    }

    /// Stops the scheduler after the cycle in progress, if any.
    pub fn stop(&self) {
        self.inner.cancel.cancel();
    }

    /// Directory holding cache-config files, once known.
    pub fn cache_config_dir(&self) -> Option<&Path> {
        self.inner.cache_dir.get().map(PathBuf::as_path)
    }
}
