//! Blob fetcher
//!
//! Loads a terminated section once: cache first, then the retrieval
//! service once a token is available. Failures reset the section so the
//! user can retry by reopening it.

use crate::cache::BlobCache;
use crate::error::FetchError;
use crate::store::Store;
use crate::token::TokenGate;
use async_trait::async_trait;
use logview_core::{Action, UnitKey, UpdateSectionData};
use std::fmt::Debug;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Body returned by the blob service
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlobBody {
    /// Log text
    Text(String),
    /// Anything that is not text
    Other {
        /// Reported content type, if any
        content_type: Option<String>,
    },
}

/// One-shot retrieval of archived section text
#[async_trait]
pub trait BlobService: Send + Sync + Debug {
    /// Fetch the blob for a retrieval key.
    ///
    /// Implementations should return promptly once `cancel` fires.
    async fn fetch(
        &self,
        log_key: &str,
        token: &str,
        cancel: &CancellationToken,
    ) -> Result<BlobBody, FetchError>;
}

/// Outcome of one load, for logging and tests
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlobOutcome {
    /// Served from cache
    CacheHit,
    /// Fetched and stored
    Fetched,
    /// Failed; section reset
    Failed,
    /// Cancelled before completion
    Cancelled,
}

/// Loads blob sections into the store
#[derive(Debug, Clone)]
pub struct BlobFetcher {
    store: Store,
    cache: BlobCache,
    gate: TokenGate,
    service: Arc<dyn BlobService>,
}

impl BlobFetcher {
    /// Create fetcher
    #[must_use]
    pub fn new(
        store: Store,
        cache: BlobCache,
        gate: TokenGate,
        service: Arc<dyn BlobService>,
    ) -> Self {
        Self {
            store,
            cache,
            gate,
            service,
        }
    }

    /// Load one section.
    pub async fn load(
        &self,
        unit: &UnitKey,
        log_key: &str,
        cancel: &CancellationToken,
    ) -> BlobOutcome {
        if let Some(text) = self.cache.get(log_key).await {
            if cancel.is_cancelled() {
                return BlobOutcome::Cancelled;
            }
            tracing::debug!(unit = %unit, log_key, "blob cache hit");
            self.store.dispatch(Action::UpdateSectionData(UpdateSectionData::replace(
                unit.clone(),
                text.to_string(),
            )));
            return BlobOutcome::CacheHit;
        }

        let Ok(token) = self.gate.wait_for_token(cancel).await else {
            return BlobOutcome::Cancelled;
        };

        self.store
            .dispatch(Action::FetchingSectionData(unit.clone()));

        let result = tokio::select! {
            () = cancel.cancelled() => return BlobOutcome::Cancelled,
            result = self.service.fetch(log_key, &token, cancel) => result,
        };

        if cancel.is_cancelled() {
            return BlobOutcome::Cancelled;
        }

        match result {
            Ok(BlobBody::Text(text)) => {
                self.cache.insert(log_key, &text).await;
                tracing::debug!(unit = %unit, log_key, bytes = text.len(), "blob fetched");
                self.store
                    .dispatch(Action::UpdateSectionData(UpdateSectionData::replace(unit.clone(), text)));
                BlobOutcome::Fetched
            }
            Ok(BlobBody::Other { content_type }) => {
                tracing::warn!(unit = %unit, log_key, ?content_type, "blob is not text");
                self.store.dispatch(Action::ResetSection(unit.clone()));
                BlobOutcome::Failed
            }
            Err(FetchError::Cancelled) => BlobOutcome::Cancelled,
            Err(err) => {
                if err.is_recoverable() {
                    tracing::warn!(unit = %unit, log_key, error = %err, "blob fetch failed, reopen to retry");
                } else {
                    tracing::error!(unit = %unit, log_key, error = %err, "blob fetch failed");
                }
                self.store.dispatch(Action::ResetSection(unit.clone()));
                BlobOutcome::Failed
            }
        }
    }
}
