//! Load status for operators, and the listener that reports it while the
//! node has no configuration.

use std::{
    fmt,
    net::SocketAddr,
    sync::{Mutex, MutexGuard, PoisonError},
};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::{TcpListener, TcpStream},
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::registry::SourceRegistry;

#[derive(Debug, Default, Clone)]
struct Board {
    last_error: Option<String>,
    last_error_url: Option<String>,
    last_attempt: Option<DateTime<Utc>>,
    last_success: Option<DateTime<Utc>>,
    cycles: u64,
}

/// Outcome of the most recent reload cycles.
#[derive(Debug, Default)]
pub(crate) struct StatusBoard {
    board: Mutex<Board>,
}

impl StatusBoard {
    fn board(&self) -> MutexGuard<'_, Board> {
        self.board.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn attempt(&self) {
        let mut board = self.board();
        board.last_attempt = Some(Utc::now());
        board.cycles += 1;
    }

    pub(crate) fn failed(&self, url: Option<&str>, error: &impl fmt::Display) {
        let mut board = self.board();
        board.last_error = Some(error.to_string());
        board.last_error_url = url.map(str::to_string);
    }

    pub(crate) fn succeeded(&self) {
        let mut board = self.board();
        board.last_error = None;
        board.last_error_url = None;
        board.last_success = Some(Utc::now());
    }

    pub(crate) fn report(&self, loaded: bool, registry: &SourceRegistry) -> StatusReport {
        let board = self.board().clone();

        let mut sources: Vec<SourceStatus> = registry
            .sources()
            .iter()
            .map(|source| SourceStatus {
                url: source.url().to_string(),
                platform: source.is_platform(),
                generation: source.current_generation().map(|g| g.number),
                last_modified: source.last_modified(),
                last_attempt: source.last_attempt(),
                last_error: source.last_error().map(|e| e.to_string()),
            })
            .collect();
        sources.sort_by(|a, b| a.url.cmp(&b.url));

        StatusReport {
            loaded,
            cycles: board.cycles,
            last_attempt: board.last_attempt,
            last_success: board.last_success,
            last_error: board.last_error,
            last_error_url: board.last_error_url,
            sources,
        }
    }
}

/// Per-source line of a [`StatusReport`].
#[derive(Debug, Clone, Serialize)]
pub struct SourceStatus {
    /// Source URL
    pub url: String,
    /// Feeds the platform bootstrap
    pub platform: bool,
    /// Installed generation number, if loaded
    pub generation: Option<u64>,
    /// Current change token
    pub last_modified: Option<String>,
    /// Most recent load attempt
    pub last_attempt: Option<DateTime<Utc>>,
    /// Error from the most recent attempt
    pub last_error: Option<String>,
}

/// Snapshot of the coordinator's load status.
#[derive(Debug, Clone, Serialize)]
pub struct StatusReport {
    /// A configuration has been installed
    pub loaded: bool,
    /// Reload cycles attempted
    pub cycles: u64,
    /// Start of the most recent cycle
    pub last_attempt: Option<DateTime<Utc>>,
    /// End of the most recent successful cycle
    pub last_success: Option<DateTime<Utc>>,
    /// Latest required-source error, cleared on success
    pub last_error: Option<String>,
    /// URL the latest error came from
    pub last_error_url: Option<String>,
    /// Cached sources, sorted by URL
    pub sources: Vec<SourceStatus>,
}

impl fmt::Display for StatusReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = if self.loaded { "loaded" } else { "not loaded" };
        writeln!(f, "Configuration: {state}")?;
        writeln!(f, "Reload cycles: {}", self.cycles)?;

        if let Some(at) = self.last_attempt {
            writeln!(f, "Last attempt: {}", at.to_rfc3339())?;
        }
        if let Some(at) = self.last_success {
            writeln!(f, "Last success: {}", at.to_rfc3339())?;
        }
        if let Some(error) = &self.last_error {
            match &self.last_error_url {
                Some(url) => writeln!(f, "Last error: {error} ({url})")?,
                None => writeln!(f, "Last error: {error}")?,
            }
        }

        for source in &self.sources {
            let generation = source
                .generation
                .map_or_else(|| "-".to_string(), |n| n.to_string());
            write!(f, "  [{generation}] {}", source.url)?;
            if source.platform {
                write!(f, " (platform)")?;
            }
            if let Some(error) = &source.last_error {
                write!(f, ": {error}")?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

/// Serves the status report over bare HTTP until `cancel` fires.
///
/// Every request gets a `503` with the plain-text report, or JSON when the
/// request path ends in `.json`.
///
/// # Errors
/// Returns the bind error.
pub(crate) async fn serve_fallback<F>(
    addr: &str,
    report: F,
    cancel: CancellationToken,
) -> std::io::Result<SocketAddr>
where
    F: Fn() -> StatusReport + Send + Sync + 'static,
{
    let listener = TcpListener::bind(addr).await?;
    let local = listener.local_addr()?;
    info!(addr = %local, "Fallback status listener started");

    tokio::spawn(async move {
        loop {
            tokio::select! {
                () = cancel.cancelled() => break,
                accepted = listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        debug!(%peer, "Status request");
                        if let Err(error) = respond(stream, &report()).await {
                            debug!(%error, "Status reply failed");
                        }
                    }
                    Err(error) => warn!(%error, "Status listener accept failed"),
                },
            }
        }
        info!("Fallback status listener stopped");
    });

    Ok(local)
}

async fn respond(mut stream: TcpStream, report: &StatusReport) -> std::io::Result<()> {
    let mut buf = [0u8; 1024];
    let read = stream.read(&mut buf).await?;
    let request = String::from_utf8_lossy(&buf[..read]);
    let wants_json = request
        .lines()
        .next()
        .and_then(|line| line.split_whitespace().nth(1))
        .is_some_and(|path| path.ends_with(".json"));

    let (content_type, body) = if wants_json {
        let body = serde_json::to_string_pretty(report).map_err(std::io::Error::other)?;
        ("application/json", body)
    } else {
        ("text/plain; charset=utf-8", report.to_string())
    };

    let response = format!(
        "HTTP/1.1 503 Service Unavailable\r\nContent-Type: {content_type}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    );
    stream.write_all(response.as_bytes()).await?;
    stream.shutdown().await
}
