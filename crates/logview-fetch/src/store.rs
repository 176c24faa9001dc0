//! Single dispatch channel for the log view state
//!
//! Every async source (queue workers, streams, the orchestrator) mutates
//! state only through [`Store::dispatch`], which applies the reducer under
//! the watch channel's lock. Subscribers receive whole snapshots.

use logview_core::{reduce, Action, LogViewState};
use std::sync::Arc;
use tokio::sync::watch;

/// Shared state store
#[derive(Debug, Clone)]
pub struct Store {
    inner: Arc<watch::Sender<LogViewState>>,
}

impl Store {
    /// Create store with empty state
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::with_state(LogViewState::new())
    }

    /// Create store with initial state
    #[must_use]
    pub fn with_state(state: LogViewState) -> Self {
        let (tx, _rx) = watch::channel(state);
        Self {
            inner: Arc::new(tx),
        }
    }

    /// Apply an action
    pub fn dispatch(&self, action: Action) {
        tracing::trace!(
            action = action.name(),
            unit = action.target().map(ToString::to_string),
            "dispatch"
        );
        self.inner.send_modify(|state| {
            let next = reduce(state, &action);
            *state = next;
        });
    }

    /// Current snapshot
    #[must_use]
    pub fn snapshot(&self) -> LogViewState {
        self.inner.borrow().clone()
    }

    /// Receive every new snapshot
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<LogViewState> {
        self.inner.subscribe()
    }
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}
