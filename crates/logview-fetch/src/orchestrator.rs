//! Log orchestrator
//!
//! Owns the store, the blob cache handle, the acquisition queue and the
//! open streams for one log view. After every state-changing call it
//! reconciles: sections marked `Loading` get a blob load or a stream,
//! streams whose section went away or closed are shut.
//!
//! A step change tears everything down before the new sections are
//! built, so late results from the old step only ever reach keys the
//! reducer no longer knows.

use crate::blob::{BlobFetcher, BlobService};
use crate::cache::BlobCache;
use crate::config::LogViewConfig;
use crate::queue::{AcquisitionQueue, QueueStats};
use crate::store::Store;
use crate::stream::{StreamFetcher, StreamHandle, StreamService};
use crate::token::{TokenGate, TokenProvider};
use dashmap::{DashMap, DashSet};
use logview_core::{
    Action, CreateSectionsPayload, DataSource, ExecutionNode, LogViewState, SectionStatus, UnitKey,
};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

/// Acquisition work decided by one reconcile pass
enum Work {
    Blob(UnitKey, String),
    Stream(UnitKey, String),
}

/// Drives acquisition for one log view
#[derive(Debug)]
pub struct LogOrchestrator {
    config: LogViewConfig,
    store: Store,
    queue: AcquisitionQueue,
    blob: BlobFetcher,
    stream: StreamFetcher,
    /// Units with a blob load queued or running
    in_flight: Arc<DashSet<UnitKey>>,
    /// Open push connections
    streams: DashMap<UnitKey, StreamHandle>,
    /// Parent of every stream's token
    stream_cancel: Mutex<CancellationToken>,
}

impl LogOrchestrator {
    /// Create orchestrator
    #[must_use]
    pub fn new(
        config: LogViewConfig,
        cache: BlobCache,
        tokens: Arc<dyn TokenProvider>,
        blob_service: Arc<dyn BlobService>,
        stream_service: Arc<dyn StreamService>,
    ) -> Self {
        let store = Store::new();
        let gate = TokenGate::new(tokens, config.token_retry_delay());
        let blob = BlobFetcher::new(store.clone(), cache, gate.clone(), blob_service);
        let stream = StreamFetcher::new(
            store.clone(),
            gate,
            stream_service,
            config.account_id.clone(),
            config.stream_throttle(),
        );

        Self {
            queue: AcquisitionQueue::new(config.max_concurrent_fetches),
            config,
            store,
            blob,
            stream,
            in_flight: Arc::new(DashSet::new()),
            streams: DashMap::new(),
            stream_cancel: Mutex::new(CancellationToken::new()),
        }
    }

    /// Configuration in use
    #[inline]
    #[must_use]
    pub fn config(&self) -> &LogViewConfig {
        &self.config
    }

    /// Underlying store
    #[inline]
    #[must_use]
    pub fn store(&self) -> &Store {
        &self.store
    }

    /// Current state snapshot
    #[must_use]
    pub fn snapshot(&self) -> LogViewState {
        self.store.snapshot()
    }

    /// Receive every new snapshot
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<LogViewState> {
        self.store.subscribe()
    }

    /// Feed a new execution node for the selected step.
    ///
    /// A missing node changes nothing: the sections it would replace keep
    /// their loads and streams.
    ///
    /// Must be called within a tokio runtime.
    pub fn on_node_update(&self, node: Option<ExecutionNode>, step: impl Into<String>) {
        let step = step.into();
        let Some(node) = node else {
            tracing::debug!(step = %step, "no node for step, sections kept");
            return;
        };
        let previous = self.store.snapshot().selected_step;
        if previous.as_deref().is_some_and(|prev| prev != step) {
            tracing::info!(from = ?previous, to = %step, "step changed, tearing down");
            self.teardown();
        }

        self.store
            .dispatch(Action::CreateSections(CreateSectionsPayload::new(node, step)));
        self.reconcile();
    }

    /// Open or close a section on behalf of a human.
    ///
    /// Opening a blob section with nothing on the way loads it again, so
    /// text streamed before the unit finished is replaced by the archive.
    /// Repeat loads are served from the blob cache.
    pub fn toggle_section(&self, key: &UnitKey) {
        self.store.dispatch(Action::ToggleSection(key.clone()));

        let state = self.store.snapshot();
        if let Some(section) = state.section(key.as_str()) {
            let refetch = section.is_open
                && match section.data_source {
                    DataSource::Blob => {
                        !section.status.is_non_mutate() && !self.in_flight.contains(key)
                    }
                    DataSource::Stream => !self.has_live_stream(key),
                };
            if refetch {
                tracing::debug!(unit = %key, "reopened section refetches");
                self.store.dispatch(Action::FetchSectionData(key.clone()));
            }
        }
        self.reconcile();
    }

    /// Request a section's text.
    pub fn fetch_section(&self, key: &UnitKey) {
        self.store.dispatch(Action::FetchSectionData(key.clone()));
        self.reconcile();
    }

    /// Search open sections
    pub fn search(&self, query: impl Into<String>) {
        self.store.dispatch(Action::Search(query.into()));
    }

    /// Clear the search
    pub fn reset_search(&self) {
        self.store.dispatch(Action::ResetSearch);
    }

    /// Move to the next search result
    pub fn next_result(&self) {
        self.store.dispatch(Action::GoToNextSearchResult);
    }

    /// Move to the previous search result
    pub fn prev_result(&self) {
        self.store.dispatch(Action::GoToPrevSearchResult);
    }

    /// Start whatever the current state asks for and stop what it no
    /// longer needs.
    pub fn reconcile(&self) {
        let state = self.store.snapshot();
        self.close_stale_streams(&state);

        let work: Vec<Work> = state
            .sections()
            .filter(|(_, section)| section.status == SectionStatus::Loading)
            .filter_map(|(key, section)| match section.data_source {
                DataSource::Blob if !self.in_flight.contains(key) => {
                    Some(Work::Blob(key.clone(), section.log_key.clone()))
                }
                DataSource::Stream if !self.has_live_stream(key) => {
                    Some(Work::Stream(key.clone(), section.log_key.clone()))
                }
                _ => None,
            })
            .collect();

        for item in work {
            match item {
                Work::Blob(unit, log_key) => self.schedule_blob(unit, log_key),
                Work::Stream(unit, log_key) => self.open_stream(unit, log_key),
            }
        }
    }

    fn schedule_blob(&self, unit: UnitKey, log_key: String) {
        if !self.in_flight.insert(unit.clone()) {
            return;
        }
        tracing::debug!(unit = %unit, log_key = %log_key, "queueing blob load");

        let blob = self.blob.clone();
        let in_flight = Arc::clone(&self.in_flight);
        self.queue.push(move |cancel| async move {
            let outcome = blob.load(&unit, &log_key, &cancel).await;
            tracing::debug!(unit = %unit, ?outcome, "blob load finished");
            // Teardown already cleared the set; the key may belong to the next step now.
            if !cancel.is_cancelled() {
                in_flight.remove(&unit);
            }
        });
    }

    fn open_stream(&self, unit: UnitKey, log_key: String) {
        let parent = self.stream_cancel.lock().clone();
        let handle = self.stream.open(unit.clone(), log_key, &parent);
        if let Some(previous) = self.streams.insert(unit, handle) {
            previous.close();
        }
    }

    fn has_live_stream(&self, key: &UnitKey) -> bool {
        self.streams.get(key).is_some_and(|handle| !handle.is_closed())
    }

    fn close_stale_streams(&self, state: &LogViewState) {
        let mut closed_by_user = Vec::new();
        self.streams.retain(|key, handle| {
            let keep = match state.section(key.as_str()) {
                Some(section) => {
                    if section.data_source != DataSource::Stream {
                        false
                    } else if !section.is_open {
                        closed_by_user.push(key.clone());
                        false
                    } else {
                        !handle.is_closed()
                    }
                }
                None => false,
            };
            if !keep {
                handle.close();
            }
            keep
        });

        for key in closed_by_user {
            tracing::info!(unit = %key, "section closed, stream shut");
            let pending = self
                .store
                .snapshot()
                .section(key.as_str())
                .is_some_and(|section| section.status.is_non_mutate());
            if pending {
                self.store.dispatch(Action::ResetSection(key));
            }
        }
    }

    /// Nothing queued, loading or streaming
    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.in_flight.is_empty() && self.streams.iter().all(|entry| entry.value().is_closed())
    }

    /// Get queue statistics
    #[must_use]
    pub fn queue_stats(&self) -> QueueStats {
        self.queue.stats()
    }

    /// Number of open streams
    #[must_use]
    pub fn open_streams(&self) -> usize {
        self.streams.iter().filter(|entry| !entry.value().is_closed()).count()
    }

    /// Wait for every queued blob load to finish.
    pub async fn drain(&self) {
        self.queue.join_all().await;
    }

    /// Cancel all acquisition and close every stream. The orchestrator
    /// stays usable.
    pub fn teardown(&self) {
        self.queue.cancel_all();
        self.in_flight.clear();

        let previous = std::mem::replace(&mut *self.stream_cancel.lock(), CancellationToken::new());
        previous.cancel();
        for entry in self.streams.iter() {
            entry.value().close();
        }
        self.streams.clear();
        tracing::debug!("acquisition torn down");
    }

    /// Tear down and wait for cancelled blob loads to unwind.
    pub async fn shutdown(&self) {
        self.teardown();
        self.queue.join_all().await;
        tracing::info!("log orchestrator shut down");
    }
}

impl Drop for LogOrchestrator {
    fn drop(&mut self) {
        self.stream_cancel.get_mut().cancel();
    }
}
