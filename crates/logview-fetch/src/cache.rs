//! Blob cache using moka
//!
//! Archived logs are immutable and retrieval keys are unique per
//! execution, so entries are written once and never invalidated by the
//! pipeline. Capacity eviction only bounds memory.

use moka::future::Cache;
use std::sync::Arc;

/// Statistics for cache monitoring
#[derive(Debug, Clone, Copy, Default)]
pub struct CacheStats {
    /// Number of entries in cache
    pub entry_count: u64,
}

/// Process-wide cache of raw blob text by retrieval key
///
/// Cloning shares the underlying cache.
#[derive(Debug, Clone)]
pub struct BlobCache {
    inner: Cache<String, Arc<str>>,
}

impl BlobCache {
    /// Create cache with max capacity
    #[inline]
    #[must_use]
    pub fn new(max_capacity: u64) -> Self {
        Self {
            inner: Cache::new(max_capacity),
        }
    }

    /// Insert blob text
    #[inline]
    pub async fn insert(&self, log_key: &str, text: &str) {
        self.inner.insert(log_key.to_string(), Arc::from(text)).await;
    }

    /// Get blob text
    #[inline]
    #[must_use]
    pub async fn get(&self, log_key: &str) -> Option<Arc<str>> {
        self.inner.get(log_key).await
    }

    /// Drop every entry
    #[inline]
    pub fn clear(&self) {
        self.inner.invalidate_all();
    }

    /// Get cache statistics
    #[inline]
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entry_count: self.inner.entry_count(),
        }
    }
}

impl Default for BlobCache {
    /// Create cache with default capacity (1,000 entries)
    fn default() -> Self {
        Self::new(1_000)
    }
}
