use std::time::Duration;

use rand::Rng;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use super::{
    Coordinator,
    file_watcher::FileWatcher,
    params::{DEFAULT_WATCHDOG, PARAM_WATCHDOG},
    status,
};
use crate::core::{FleetError, Result};

const JITTER: f64 = 0.25;

/// Spreads reloads across a fleet: a uniformly random duration within
/// ±25% of `interval`.
pub(super) fn jittered(interval: Duration) -> Duration {
    let base = interval.as_secs_f64();
    let spread = base * JITTER;
    let offset = rand::thread_rng().gen_range(-spread..=spread);
    Duration::from_secs_f64((base + offset).max(0.0))
}

impl Coordinator {
    /// Runs reload cycles until [`stop`](Self::stop) is called.
    ///
    /// Each cycle runs on the blocking pool. Between cycles the loop sleeps
    /// for the jittered reload interval, waking early on
    /// [`force_reload`](Self::force_reload).
    ///
    /// # Errors
    /// Returns `FleetError::Wedged` if a cycle outlives the watchdog.
    #[instrument(skip(self))]
    pub async fn start(&self) -> Result<()> {
        let cancel = self.inner.cancel.clone();
        let mut fallback = self.start_fallback_status().await;
        let mut watcher: Option<FileWatcher> = None;

        info!("Configuration scheduler started");

        let result = loop {
            if cancel.is_cancelled() {
                break Ok(());
            }

            let watchdog = self
                .current()
                .tree()
                .get_time_interval_or(PARAM_WATCHDOG, DEFAULT_WATCHDOG);
            let coordinator = self.clone();
            let cycle = tokio::task::spawn_blocking(move || coordinator.update_config());

            match tokio::time::timeout(watchdog, cycle).await {
                Err(_) => {
                    error!(?watchdog, "Reload cycle wedged");
                    break Err(FleetError::Wedged(watchdog));
                }
                Ok(Err(join)) => error!(error = %join, "Reload task failed"),
                Ok(Ok(Err(error))) => warn!(%error, "Reload cycle failed"),
                Ok(Ok(Ok(installed))) => debug!(installed, "Reload cycle finished"),
            }

            if self.is_loaded() {
                if let Some(token) = fallback.take() {
                    token.cancel();
                }
            }

            if self.settings().watch_local_files {
                if watcher.is_none() {
                    watcher = self.start_file_watcher();
                }
                if let Some(watcher) = watcher.as_mut() {
                    watcher.update_watched_files(self.watched_paths());
                }
            }

            let delay = jittered(self.reload_interval());
            debug!(?delay, "Next reload");

            tokio::select! {
                () = cancel.cancelled() => break Ok(()),
                () = self.inner.reload.notified() => debug!("Reload requested"),
                () = tokio::time::sleep(delay) => {}
            }
        };

        if let Some(token) = fallback {
            token.cancel();
        }
        info!("Configuration scheduler stopped");
        result
    }

    /// Starts the fallback status listener if one is configured.
    async fn start_fallback_status(&self) -> Option<CancellationToken> {
        let addr = self.settings().status_listen.clone()?;
        let token = self.inner.cancel.child_token();
        let coordinator = self.clone();

        match status::serve_fallback(&addr, move || coordinator.status(), token.clone()).await {
            Ok(_) => Some(token),
            Err(error) => {
                warn!(%error, %addr, "Failed to start fallback status listener");
                None
            }
        }
    }
}
