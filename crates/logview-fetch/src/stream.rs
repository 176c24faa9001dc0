//! Stream fetcher
//!
//! Follows a running section over a push connection. Incoming chunks are
//! appended to a buffer that is never trimmed; the whole buffer is
//! published as a replace update at most once per throttle interval.
//! Closing cancels the pending publish, so nothing fires after teardown.

use crate::error::FetchError;
use crate::store::Store;
use crate::token::TokenGate;
use async_trait::async_trait;
use futures::stream::BoxStream;
use futures::StreamExt;
use logview_core::{Action, UnitKey, UpdateSectionData};
use std::fmt::Debug;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Event delivered by a push connection
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    /// Line-delimited log text
    Message(String),
    /// Server-side error; the connection is closed on receipt
    Error(String),
}

/// Events of one connection; the stream ends when the server closes
pub type EventStream = BoxStream<'static, Result<StreamEvent, FetchError>>;

/// Live push retrieval of running section text
#[async_trait]
pub trait StreamService: Send + Sync + Debug {
    /// Open a connection for a retrieval key.
    async fn connect(
        &self,
        account_id: &str,
        log_key: &str,
        token: &str,
    ) -> Result<EventStream, FetchError>;
}

/// Leading and trailing publish throttle
#[derive(Debug, Clone)]
pub struct Throttle {
    interval: Duration,
    last_publish: Option<Instant>,
    pending: bool,
}

impl Throttle {
    /// Create throttle
    #[must_use]
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_publish: None,
            pending: false,
        }
    }

    /// Record new data. Returns true when it may be published now.
    pub fn offer(&mut self, now: Instant) -> bool {
        self.pending = true;
        self.last_publish
            .map_or(true, |last| now.duration_since(last) >= self.interval)
    }

    /// When the pending data is due, if any is pending
    #[must_use]
    pub fn deadline(&self) -> Option<Instant> {
        if !self.pending {
            return None;
        }
        Some(self.last_publish.map_or_else(Instant::now, |last| last + self.interval))
    }

    /// Unpublished data exists
    #[inline]
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.pending
    }

    /// Record a publish
    pub fn published(&mut self, now: Instant) {
        self.last_publish = Some(now);
        self.pending = false;
    }

    /// Drop the pending publish
    pub fn cancel(&mut self) {
        self.pending = false;
    }
}

/// Handle to an open stream
#[derive(Debug)]
pub struct StreamHandle {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl StreamHandle {
    /// Close the connection; safe to call any number of times
    pub fn close(&self) {
        self.cancel.cancel();
    }

    /// Connection closed, by teardown, error or server
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.cancel.is_cancelled() || self.task.is_finished()
    }

    /// Wait for the connection task to end
    pub async fn join(mut self) {
        if let Err(err) = (&mut self.task).await {
            if err.is_panic() {
                tracing::error!(error = %err, "stream task panicked");
            }
        }
    }
}

impl Drop for StreamHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Opens push connections and feeds their text into the store
#[derive(Debug, Clone)]
pub struct StreamFetcher {
    store: Store,
    gate: TokenGate,
    service: Arc<dyn StreamService>,
    account_id: String,
    throttle: Duration,
}

impl StreamFetcher {
    /// Create fetcher
    #[must_use]
    pub fn new(
        store: Store,
        gate: TokenGate,
        service: Arc<dyn StreamService>,
        account_id: impl Into<String>,
        throttle: Duration,
    ) -> Self {
        Self {
            store,
            gate,
            service,
            account_id: account_id.into(),
            throttle,
        }
    }

    /// Start following a section. Must be called within a tokio runtime.
    #[must_use]
    pub fn open(&self, unit: UnitKey, log_key: String, parent: &CancellationToken) -> StreamHandle {
        let cancel = parent.child_token();
        let fetcher = self.clone();
        let task_cancel = cancel.clone();
        let task = tokio::spawn(async move {
            fetcher.run(&unit, &log_key, &task_cancel).await;
            task_cancel.cancel();
        });
        StreamHandle { cancel, task }
    }

    async fn run(&self, unit: &UnitKey, log_key: &str, cancel: &CancellationToken) {
        let Ok(token) = self.gate.wait_for_token(cancel).await else {
            return;
        };

        self.store
            .dispatch(Action::FetchingSectionData(unit.clone()));

        let connected = tokio::select! {
            () = cancel.cancelled() => return,
            connected = self.service.connect(&self.account_id, log_key, &token) => connected,
        };
        let mut events = match connected {
            Ok(events) => events,
            Err(err) => {
                if !cancel.is_cancelled() {
                    tracing::warn!(unit = %unit, log_key, error = %err, "stream connect failed");
                    self.store.dispatch(Action::ResetSection(unit.clone()));
                }
                return;
            }
        };
        tracing::info!(unit = %unit, log_key, "stream opened");

        let mut buffer = String::new();
        let mut throttle = Throttle::new(self.throttle);

        loop {
            let deadline = throttle.deadline();
            tokio::select! {
                biased;
                () = cancel.cancelled() => {
                    throttle.cancel();
                    tracing::info!(unit = %unit, log_key, "stream closed");
                    return;
                }
                () = tokio::time::sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                    self.publish(unit, &buffer, &mut throttle);
                }
                event = events.next() => match event {
                    Some(Ok(StreamEvent::Message(chunk))) => {
                        if !buffer.is_empty() {
                            buffer.push('\n');
                        }
                        buffer.push_str(&chunk);
                        if throttle.offer(Instant::now()) {
                            self.publish(unit, &buffer, &mut throttle);
                        }
                    }
                    Some(Ok(StreamEvent::Error(message))) => {
                        self.fail(unit, log_key, &buffer, &FetchError::Stream(message), &mut throttle);
                        return;
                    }
                    Some(Err(err)) => {
                        self.fail(unit, log_key, &buffer, &err, &mut throttle);
                        return;
                    }
                    None => {
                        if throttle.is_pending() {
                            self.publish(unit, &buffer, &mut throttle);
                        }
                        tracing::info!(unit = %unit, log_key, "stream ended");
                        return;
                    }
                },
            }
        }
    }

    fn publish(&self, unit: &UnitKey, buffer: &str, throttle: &mut Throttle) {
        tracing::debug!(unit = %unit, bytes = buffer.len(), "publishing stream buffer");
        self.store
            .dispatch(Action::UpdateSectionData(UpdateSectionData::replace(unit.clone(), buffer)));
        throttle.published(Instant::now());
    }

    fn fail(
        &self,
        unit: &UnitKey,
        log_key: &str,
        buffer: &str,
        err: &FetchError,
        throttle: &mut Throttle,
    ) {
        if throttle.is_pending() {
            self.publish(unit, buffer, throttle);
        }
        if err.is_recoverable() {
            tracing::warn!(unit = %unit, log_key, error = %err, "stream failed, closing");
        } else {
            tracing::error!(unit = %unit, log_key, error = %err, "stream unusable, closing");
        }
        self.store.dispatch(Action::ResetSection(unit.clone()));
    }
}
