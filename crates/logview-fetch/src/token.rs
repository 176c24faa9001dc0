//! Token gate
//!
//! Both fetchers need a bearer token that an external collaborator
//! resolves eventually. The gate polls the provider's cached value on a
//! fixed delay until it appears or the caller is cancelled; a missing
//! token is never reported as an error.

use crate::error::FetchError;
use async_trait::async_trait;
use parking_lot::RwLock;
use std::fmt::Debug;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Source of the authorization token
#[async_trait]
pub trait TokenProvider: Send + Sync + Debug {
    /// Token if already resolved
    fn cached_token(&self) -> Option<String>;

    /// Ask the provider to resolve a token; completion does not imply
    /// success
    async fn refresh(&self) {}
}

/// Token held in memory, set by whoever acquires it
#[derive(Debug, Default)]
pub struct SharedToken {
    inner: RwLock<Option<String>>,
}

impl SharedToken {
    /// Create with an optional initial token
    #[must_use]
    pub fn new(token: Option<String>) -> Self {
        Self {
            inner: RwLock::new(token),
        }
    }

    /// Publish a token
    pub fn set(&self, token: impl Into<String>) {
        *self.inner.write() = Some(token.into());
    }

    /// Forget the token
    pub fn clear(&self) {
        *self.inner.write() = None;
    }
}

#[async_trait]
impl TokenProvider for SharedToken {
    fn cached_token(&self) -> Option<String> {
        self.inner.read().clone().filter(|t| !t.is_empty())
    }
}

/// Waits for a token on behalf of the fetchers
#[derive(Debug, Clone)]
pub struct TokenGate {
    provider: Arc<dyn TokenProvider>,
    retry_delay: Duration,
}

impl TokenGate {
    /// Create gate over a provider
    #[must_use]
    pub fn new(provider: Arc<dyn TokenProvider>, retry_delay: Duration) -> Self {
        Self {
            provider,
            retry_delay,
        }
    }

    /// Token if available right now
    #[inline]
    #[must_use]
    pub fn try_token(&self) -> Option<String> {
        self.provider.cached_token()
    }

    /// Wait until a token is available.
    ///
    /// The first miss asks the provider to refresh; every miss sleeps for
    /// the retry delay before polling again.
    ///
    /// # Errors
    /// Returns [`FetchError::Cancelled`] once `cancel` fires.
    pub async fn wait_for_token(&self, cancel: &CancellationToken) -> Result<String, FetchError> {
        let mut attempts = 0u32;
        loop {
            if cancel.is_cancelled() {
                return Err(FetchError::Cancelled);
            }
            if let Some(token) = self.provider.cached_token() {
                if attempts > 0 {
                    tracing::debug!(attempts, "token became available");
                }
                return Ok(token);
            }

            if attempts == 0 {
                tokio::select! {
                    () = cancel.cancelled() => return Err(FetchError::Cancelled),
                    () = self.provider.refresh() => {}
                }
                if let Some(token) = self.provider.cached_token() {
                    return Ok(token);
                }
            }

            attempts = attempts.saturating_add(1);
            tracing::debug!(attempts, delay_ms = self.retry_delay.as_millis(), "token not ready, retrying");
            tokio::select! {
                () = cancel.cancelled() => return Err(FetchError::Cancelled),
                () = tokio::time::sleep(self.retry_delay) => {}
            }
        }
    }
}
