use std::{fmt, path::PathBuf, time::Duration};

use super::{ContentKind, SourceError, parse::Conditionals};

/// Default HTTP connect timeout.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(60);
/// Default HTTP data timeout.
pub const DEFAULT_DATA_TIMEOUT: Duration = Duration::from_secs(10 * 60);

/// Per-cycle settings handed to every load.
///
/// Built by the coordinator from the currently installed snapshot, so a
/// new timeout takes effect on the cycle after it was installed.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadContext {
    /// TCP connect timeout for network origins
    pub connect_timeout: Duration,
    /// Read timeout for network origins
    pub data_timeout: Duration,
    /// Facts used to evaluate XML conditionals
    pub conditionals: Conditionals,
}

impl Default for LoadContext {
    fn default() -> Self {
        Self {
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            data_timeout: DEFAULT_DATA_TIMEOUT,
            conditionals: Conditionals::default(),
        }
    }
}

impl LoadContext {
    /// Context with default timeouts and the given conditionals.
    pub fn with_conditionals(conditionals: Conditionals) -> Self {
        Self {
            conditionals,
            ..Self::default()
        }
    }
}

/// Result of asking an origin for its bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fetch {
    /// Content is unchanged since the token that was passed in.
    NotModified,
    /// Fresh content and the token identifying it.
    Content {
        /// Raw bytes, already decompressed
        bytes: Vec<u8>,
        /// Change token to pass back on the next fetch
        last_modified: Option<String>,
    },
}

/// Where a source's bytes come from.
///
/// An origin only opens a byte stream and reports whether it changed;
/// parsing, filtering and generation bookkeeping live in
/// [`Source`](super::Source).
pub trait Origin: Send + fmt::Debug {
    /// URL actually fetched. May differ from the source's identity URL
    /// after a sibling probe.
    fn url(&self) -> &str;

    /// Content kind of the bytes this origin returns.
    fn kind(&self) -> ContentKind;

    /// Fetches the content unless it is unchanged since `last_modified`.
    ///
    /// # Errors
    /// `NotFound` when the content does not exist, `TransientIo` for any
    /// other I/O failure.
    fn fetch(&mut self, last_modified: Option<&str>, ctx: &LoadContext) -> Result<Fetch, SourceError>;

    /// True if the content never changes once loaded.
    fn check_once(&self) -> bool {
        false
    }

    /// Local file backing this origin, for change watching.
    fn local_path(&self) -> Option<PathBuf> {
        None
    }
}
