use thiserror::Error;

/// Failures produced while loading a configuration source.
///
/// The coordinator turns each of these into a "was this source required"
/// decision; only `NotFound` is tolerated for sources following the
/// optional-file naming convention.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SourceError {
    /// The source does not exist (missing file, HTTP 404, absent entry).
    #[error("{url}: not found")]
    NotFound {
        /// Source URL or path
        url: String,
    },

    /// Network or disk failure other than not-found; retried next cycle.
    #[error("{url}: {message}")]
    TransientIo {
        /// Source URL or path
        url: String,
        /// Failure description, e.g. `503: Service Unavailable`
        message: String,
    },

    /// The bytes could not be parsed; the parser message is kept verbatim.
    #[error("{message}")]
    Malformed {
        /// Source URL or path
        url: String,
        /// Parser message
        message: String,
    },

    /// A key failed the source's key filter under the strict policy.
    #[error("{url}: illegal key '{key}'")]
    PolicyRejected {
        /// Source URL or path
        url: String,
        /// Offending key
        key: String,
    },
}

impl SourceError {
    /// URL of the source that failed.
    pub fn url(&self) -> &str {
        match self {
            SourceError::NotFound { url }
            | SourceError::TransientIo { url, .. }
            | SourceError::Malformed { url, .. }
            | SourceError::PolicyRejected { url, .. } => url,
        }
    }

    /// True for [`SourceError::NotFound`].
    pub fn is_not_found(&self) -> bool {
        matches!(self, SourceError::NotFound { .. })
    }

    pub(crate) fn transient(url: &str, message: impl Into<String>) -> Self {
        SourceError::TransientIo {
            url: url.to_string(),
            message: message.into(),
        }
    }

    pub(crate) fn malformed(url: &str, message: impl Into<String>) -> Self {
        SourceError::Malformed {
            url: url.to_string(),
            message: message.into(),
        }
    }

    pub(crate) fn not_found(url: &str) -> Self {
        SourceError::NotFound {
            url: url.to_string(),
        }
    }

    pub(crate) fn from_io(url: &str, error: &std::io::Error) -> Self {
        if error.kind() == std::io::ErrorKind::NotFound {
            Self::not_found(url)
        } else {
            Self::transient(url, error.to_string())
        }
    }
}
