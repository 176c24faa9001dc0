//! Error types for log acquisition
//!
//! Provides error handling for:
//! - Blob retrieval (network, HTTP status, non-text bodies)
//! - Stream connections (connect, transport, error events)
//! - Configuration loading
//!
//! None of these reach the renderer: the orchestrator turns every fetch
//! error into a section reset.

use std::path::PathBuf;

/// Errors while retrieving section data
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// Request could not be completed
    #[error("network error: {0}")]
    Network(String),

    /// Server answered with a failure status
    #[error("http status {status}")]
    Http {
        /// Status code
        status: u16,
    },

    /// Body was not text
    #[error("response body is not text")]
    NonText,

    /// Work was cancelled by teardown
    #[error("operation cancelled")]
    Cancelled,

    /// Push connection could not be opened
    #[error("stream connect failed: {0}")]
    Connect(String),

    /// Push connection reported an error
    #[error("stream error: {0}")]
    Stream(String),

    /// Endpoint URL could not be built
    #[error("invalid endpoint: {0}")]
    InvalidEndpoint(String),
}

impl FetchError {
    /// Whether the section can be retried by reopening it
    #[inline]
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, Self::Cancelled | Self::InvalidEndpoint(_))
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) => Self::Http {
                status: status.as_u16(),
            },
            None => Self::Network(err.to_string()),
        }
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for FetchError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        Self::Stream(err.to_string())
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Config file could not be read
    #[error("io error reading {path}: {source}")]
    Io {
        /// File path
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Config file is not valid TOML for [`LogViewConfig`](crate::config::LogViewConfig)
    #[error("invalid config: {0}")]
    Toml(#[from] toml::de::Error),

    /// Config values are out of range
    #[error("invalid config value: {0}")]
    Invalid(String),
}
