use std::{
    collections::HashSet,
    path::PathBuf,
    time::Duration,
};

use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher, recommended_watcher};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use super::Coordinator;

const DEBOUNCE: Duration = Duration::from_millis(500);

/// Watches local source files and the cache-config directory, requesting a
/// reload cycle shortly after they change.
///
/// Bursts of events are debounced so one editor save triggers one cycle.
pub(super) struct FileWatcher {
    watcher: RecommendedWatcher,
    watched: HashSet<PathBuf>,
}

impl FileWatcher {
    /// Creates the watcher and spawns its debounce task. The task ends when
    /// the watcher is dropped.
    ///
    /// # Errors
    /// Returns error if the platform watcher cannot be initialized.
    pub(super) fn spawn(coordinator: Coordinator) -> notify::Result<Self> {
        let (event_tx, event_rx) = mpsc::unbounded_channel();

        let watcher = recommended_watcher(move |res: notify::Result<Event>| {
            let Ok(event) = res else {
                return;
            };

            if !matches!(
                event.kind,
                EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
            ) {
                return;
            }

            for path in event.paths {
                let _ = event_tx.send(path);
            }
        })?;

        tokio::spawn(debounce(event_rx, coordinator));

        Ok(Self {
            watcher,
            watched: HashSet::new(),
        })
    }

    /// Replaces the watch list. Paths that do not exist are skipped.
    ///
    /// A path the platform watcher rejects is logged and left out, so the
    /// next update tries it again.
    pub(super) fn update_watched_files(&mut self, files: Vec<PathBuf>) {
        let new_set: HashSet<PathBuf> = files
            .into_iter()
            .filter_map(|p| p.canonicalize().ok())
            .collect();

        for path in self.watched.difference(&new_set) {
            if let Err(error) = self.watcher.unwatch(path) {
                warn!(path = %path.display(), %error, "Failed to unwatch file");
            }
        }

        let mut watched = HashSet::with_capacity(new_set.len());
        for path in new_set {
            if self.watched.contains(&path) {
                watched.insert(path);
                continue;
            }
            match self.watcher.watch(&path, RecursiveMode::NonRecursive) {
                Ok(()) => {
                    debug!(path = %path.display(), "Watching");
                    watched.insert(path);
                }
                Err(error) => warn!(path = %path.display(), %error, "Failed to watch file"),
            }
        }

        self.watched = watched;
    }
}

async fn debounce(mut event_rx: mpsc::UnboundedReceiver<PathBuf>, coordinator: Coordinator) {
    let mut pending: HashSet<PathBuf> = HashSet::new();
    let debounce_sleep = tokio::time::sleep(DEBOUNCE);
    tokio::pin!(debounce_sleep);

    loop {
        tokio::select! {
            Some(path) = event_rx.recv() => {
                pending.insert(path);
                debounce_sleep.as_mut().reset(tokio::time::Instant::now() + DEBOUNCE);
            }

            () = &mut debounce_sleep, if !pending.is_empty() => {
                debug!(files = pending.len(), "Local configuration files changed");
                pending.clear();
                coordinator.force_reload();
            }

            else => break,
        }
    }
}

impl Coordinator {
    /// Local files worth watching: file-backed sources that are re-read on
    /// every cycle, and the cache-config directory.
    pub(super) fn watched_paths(&self) -> Vec<PathBuf> {
        let mut paths: Vec<PathBuf> = self
            .registry()
            .sources()
            .iter()
            .filter(|source| !source.check_once())
            .filter_map(|source| source.local_path())
            .collect();

        if let Some(dir) = self.cache_config_dir() {
            paths.push(dir.to_path_buf());
        }
        paths
    }

    pub(super) fn start_file_watcher(&self) -> Option<FileWatcher> {
        match FileWatcher::spawn(self.clone()) {
            Ok(watcher) => Some(watcher),
            Err(error) => {
                warn!(%error, "Failed to create file watcher");
                None
            }
        }
    }
}
