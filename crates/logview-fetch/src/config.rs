//! Log view configuration

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Acquisition pipeline configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogViewConfig {
    /// Maximum blob fetches in flight
    pub max_concurrent_fetches: usize,
    /// Delay between token polls in milliseconds
    pub token_retry_delay_ms: u64,
    /// Minimum interval between stream publishes in milliseconds
    pub stream_throttle_ms: u64,
    /// Maximum cached blobs
    pub cache_capacity: u64,
    /// Account passed to the retrieval endpoints
    pub account_id: String,
    /// Blob retrieval URL
    pub blob_endpoint: String,
    /// Push stream URL
    pub stream_endpoint: String,
}

impl LogViewConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With max concurrent fetches
    #[inline]
    #[must_use]
    pub fn with_max_concurrent_fetches(mut self, max: usize) -> Self {
        self.max_concurrent_fetches = max;
        self
    }

    /// With token retry delay
    #[inline]
    #[must_use]
    pub fn with_token_retry_delay(mut self, delay: Duration) -> Self {
        self.token_retry_delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// With stream throttle interval
    #[inline]
    #[must_use]
    pub fn with_stream_throttle(mut self, interval: Duration) -> Self {
        self.stream_throttle_ms = u64::try_from(interval.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// With account id
    #[inline]
    #[must_use]
    pub fn with_account_id(mut self, account_id: impl Into<String>) -> Self {
        self.account_id = account_id.into();
        self
    }

    /// Token retry delay
    #[inline]
    #[must_use]
    pub fn token_retry_delay(&self) -> Duration {
        Duration::from_millis(self.token_retry_delay_ms)
    }

    /// Stream throttle interval
    #[inline]
    #[must_use]
    pub fn stream_throttle(&self) -> Duration {
        Duration::from_millis(self.stream_throttle_ms)
    }

    /// Reject values the pipeline cannot run with
    ///
    /// # Errors
    /// Returns [`ConfigError::Invalid`] for zero concurrency or zero intervals.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_concurrent_fetches == 0 {
            return Err(ConfigError::Invalid(
                "max_concurrent_fetches must be at least 1".into(),
            ));
        }
        if self.stream_throttle_ms == 0 {
            return Err(ConfigError::Invalid(
                "stream_throttle_ms must be positive".into(),
            ));
        }
        if self.token_retry_delay_ms == 0 {
            return Err(ConfigError::Invalid(
                "token_retry_delay_ms must be positive".into(),
            ));
        }
        Ok(())
    }

    /// Parse and validate TOML
    ///
    /// # Errors
    /// Returns [`ConfigError`] on malformed TOML or invalid values.
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML file
    ///
    /// # Errors
    /// Returns [`ConfigError`] when the file cannot be read or is invalid.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&raw)
    }
}

impl Default for LogViewConfig {
    fn default() -> Self {
        Self {
            max_concurrent_fetches: 4,
            token_retry_delay_ms: 300,
            stream_throttle_ms: 2_000,
            cache_capacity: 1_000,
            account_id: String::new(),
            blob_endpoint: "http://localhost:8079/blob".to_string(),
            stream_endpoint: "ws://localhost:8079/stream".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults() {
        let config = LogViewConfig::default();
        assert_eq!(config.token_retry_delay(), Duration::from_millis(300));
        assert_eq!(config.stream_throttle(), Duration::from_secs(2));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config = LogViewConfig::from_toml_str("account_id = \"acc\"\nmax_concurrent_fetches = 2").unwrap();
        assert_eq!(config.account_id, "acc");
        assert_eq!(config.max_concurrent_fetches, 2);
        assert_eq!(config.stream_throttle_ms, 2_000);
    }

    #[test]
    fn rejects_zero_concurrency() {
        let err = LogViewConfig::from_toml_str("max_concurrent_fetches = 0").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn rejects_bad_toml() {
        assert!(matches!(
            LogViewConfig::from_toml_str("account_id = ["),
            Err(ConfigError::Toml(_))
        ));
    }

    #[test]
    fn load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "stream_throttle_ms = 500").unwrap();
        let config = LogViewConfig::load(file.path()).unwrap();
        assert_eq!(config.stream_throttle(), Duration::from_millis(500));
    }

    #[test]
    fn missing_file() {
        assert!(matches!(
            LogViewConfig::load("/nonexistent/logview.toml"),
            Err(ConfigError::Io { .. })
        ));
    }

    #[test]
    fn builders() {
        let config = LogViewConfig::new()
            .with_max_concurrent_fetches(8)
            .with_token_retry_delay(Duration::from_millis(50))
            .with_stream_throttle(Duration::from_millis(100))
            .with_account_id("a");
        assert_eq!(config.max_concurrent_fetches, 8);
        assert_eq!(config.token_retry_delay_ms, 50);
        assert_eq!(config.stream_throttle_ms, 100);
        assert_eq!(config.account_id, "a");
    }
}
