//! Configuration error model.

use thiserror::Error;

/// Result type used when loading configuration.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Configuration-level error.
///
/// Raised while reading the environment; everything downstream works with a
/// fully resolved [`crate::ClientConfig`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A variable was present but could not be interpreted.
    #[error("invalid value for {key}: {value:?} ({reason})")]
    InvalidValue {
        key: &'static str,
        value: String,
        reason: String,
    },

    /// The API base URL is empty or not an http(s) URL.
    #[error("invalid API base URL: {0}")]
    InvalidApiUrl(String),

    /// No data directory was configured and the platform has none.
    #[error("no data directory available for token storage")]
    NoDataDir,
}

impl ConfigError {
    pub fn invalid_value(key: &'static str, value: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            key,
            value: value.into(),
            reason: reason.into(),
        }
    }
}
