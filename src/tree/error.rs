use thiserror::Error;

/// Errors raised by [`ValueTree`](super::ValueTree) operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TreeError {
    /// A mutation was attempted on a sealed tree.
    #[error("attempt to modify sealed config tree (key '{key}')")]
    Sealed {
        /// Key the caller tried to modify
        key: String,
    },

    /// A value is present but cannot be parsed as the requested type.
    #[error("invalid value '{value}' for '{key}': {reason}")]
    InvalidParam {
        /// Key holding the value
        key: String,
        /// Raw string value
        value: String,
        /// Why parsing failed
        reason: String,
    },

    /// A strict getter was called for a key that is not present.
    #[error("required parameter '{key}' is not set")]
    MissingParam {
        /// Key that was looked up
        key: String,
    },
}

impl TreeError {
    pub(crate) fn invalid(key: &str, value: &str, reason: impl Into<String>) -> Self {
        TreeError::InvalidParam {
            key: key.to_string(),
            value: value.to_string(),
            reason: reason.into(),
        }
    }
}
