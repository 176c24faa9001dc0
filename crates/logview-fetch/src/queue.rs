//! Acquisition queue
//!
//! Bounded-concurrency task queue for blob fetches. Each work item gets a
//! child of the queue's cancellation token; [`AcquisitionQueue::cancel_all`]
//! cancels every queued and running item at once and leaves the queue
//! usable for the next step.

use parking_lot::Mutex;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

/// Queue statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueueStats {
    /// Items queued or running
    pub pending: usize,
    /// Free concurrency slots
    pub available_permits: usize,
}

/// Bounded-concurrency async work queue
#[derive(Debug)]
pub struct AcquisitionQueue {
    /// Concurrency limit; the semaphore hands out permits in FIFO order
    permits: Arc<Semaphore>,
    /// Parent token of every pushed item
    cancel: Mutex<CancellationToken>,
    /// Spawned items
    tasks: Mutex<JoinSet<()>>,
}

impl AcquisitionQueue {
    /// Create queue running at most `concurrency` items at once
    #[must_use]
    pub fn new(concurrency: usize) -> Self {
        Self {
            permits: Arc::new(Semaphore::new(concurrency.max(1))),
            cancel: Mutex::new(CancellationToken::new()),
            tasks: Mutex::new(JoinSet::new()),
        }
    }

    /// Queue a work item.
    ///
    /// The item starts once a slot is free and receives a token that fires
    /// on [`cancel_all`](Self::cancel_all). Items cancelled while waiting
    /// never start. Must be called within a tokio runtime.
    pub fn push<F, Fut>(&self, work: F)
    where
        F: FnOnce(CancellationToken) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let cancel = self.cancel.lock().child_token();
        let permits = Arc::clone(&self.permits);

        let mut tasks = self.tasks.lock();
        while tasks.try_join_next().is_some() {}

        tasks.spawn(async move {
            let _permit = tokio::select! {
                () = cancel.cancelled() => return,
                permit = permits.acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => return,
                },
            };
            if cancel.is_cancelled() {
                return;
            }
            work(cancel).await;
        });
    }

    /// Cancel every queued and running item.
    pub fn cancel_all(&self) {
        let previous = std::mem::replace(&mut *self.cancel.lock(), CancellationToken::new());
        previous.cancel();
        tracing::debug!(pending = self.tasks.lock().len(), "acquisition queue cancelled");
    }

    /// Wait for every item pushed so far to finish.
    pub async fn join_all(&self) {
        let mut tasks = std::mem::take(&mut *self.tasks.lock());
        while let Some(result) = tasks.join_next().await {
            if let Err(err) = result {
                if err.is_panic() {
                    tracing::error!(error = %err, "acquisition task panicked");
                }
            }
        }
    }

    /// Get queue statistics
    #[must_use]
    pub fn stats(&self) -> QueueStats {
        let mut tasks = self.tasks.lock();
        while tasks.try_join_next().is_some() {}
        QueueStats {
            pending: tasks.len(),
            available_permits: self.permits.available_permits(),
        }
    }
}

impl Default for AcquisitionQueue {
    fn default() -> Self {
        Self::new(4)
    }
}

impl Drop for AcquisitionQueue {
    fn drop(&mut self) {
        self.cancel.get_mut().cancel();
    }
}
