//! Logview Fetch - acquisition pipeline for log sections
//!
//! Async half of the log view. Every state change goes through one
//! [`Store`]; fetchers only ever dispatch actions.
//!
//! # Core Concepts
//!
//! - [`LogOrchestrator`]: Owns acquisition for one view and reconciles it with state
//! - [`BlobFetcher`]: Cache-first one-shot loads of terminated sections
//! - [`StreamFetcher`]: Throttled live text of running sections
//! - [`AcquisitionQueue`]: Bounded-concurrency, batch-cancellable work queue
//! - [`TokenGate`]: Waits for the bearer token instead of failing
//!
//! # Example
//!
//! ```rust,ignore
//! use logview_fetch::prelude::*;
//!
//! let config = LogViewConfig::default();
//! let orchestrator = LogOrchestrator::new(
//!     config.clone(),
//!     BlobCache::new(config.cache_capacity),
//!     Arc::new(SharedToken::new(Some(token))),
//!     Arc::new(HttpBlobService::new(&config)?),
//!     Arc::new(WsStreamService::new(&config)),
//! );
//! orchestrator.on_node_update(Some(node), "step-1");
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod blob;
pub mod cache;
pub mod config;
pub mod error;
pub mod http;
pub mod orchestrator;
pub mod queue;
pub mod store;
pub mod stream;
pub mod token;

// Re-exports
pub use blob::{BlobBody, BlobFetcher, BlobOutcome, BlobService};
pub use cache::{BlobCache, CacheStats};
pub use config::LogViewConfig;
pub use error::{ConfigError, FetchError};
pub use http::{HttpBlobService, WsStreamService};
pub use orchestrator::LogOrchestrator;
pub use queue::{AcquisitionQueue, QueueStats};
pub use store::Store;
pub use stream::{EventStream, StreamEvent, StreamFetcher, StreamHandle, StreamService, Throttle};
pub use token::{SharedToken, TokenGate, TokenProvider};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for driving a log view
    pub use crate::cache::BlobCache;
    pub use crate::config::LogViewConfig;
    pub use crate::http::{HttpBlobService, WsStreamService};
    pub use crate::orchestrator::LogOrchestrator;
    pub use crate::token::{SharedToken, TokenProvider};
    pub use logview_core::prelude::*;
    pub use std::sync::Arc;
}
