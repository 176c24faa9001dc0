//! Testing utilities for the logview workspace
//!
//! Shared fixtures: execution nodes, scripted retrieval services and a
//! ready-made orchestrator.

#![allow(missing_docs)]

use async_trait::async_trait;
use futures::channel::mpsc;
use futures::StreamExt;
use logview_core::{ExecutionNode, ExecutionStatus, TaskDescriptor, UnitProgress};
use logview_fetch::{
    BlobBody, BlobCache, BlobService, EventStream, FetchError, LogOrchestrator, LogViewConfig,
    SharedToken, StreamEvent, StreamService,
};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

pub const TOKEN: &str = "test-token";

/// One log line in the wire format
pub fn line(level: &str, time: &str, out: &str) -> String {
    format!(r#"{{"level":"{level}","time":"{time}","out":"{out}"}}"#)
}

/// Node whose task declares `(unit name, log key, unit status)` triples
pub fn node_with_units(
    status: ExecutionStatus,
    units: &[(&str, &str, ExecutionStatus)],
) -> ExecutionNode {
    let task = TaskDescriptor::new(
        units.iter().map(|(name, _, _)| *name),
        units.iter().map(|(_, key, _)| *key),
    );
    units.iter().fold(
        ExecutionNode::new(status).with_task(task),
        |node, (name, _, unit_status)| node.with_progress(UnitProgress::new(*name, *unit_status)),
    )
}

/// Node with only log keys, as sent before units are known
pub fn node_without_units(status: ExecutionStatus, keys: &[&str]) -> ExecutionNode {
    ExecutionNode::new(status).with_task(TaskDescriptor::new(
        Vec::<String>::new(),
        keys.iter().copied(),
    ))
}

/// Scripted answer of [`ScriptedBlobService`]
#[derive(Debug, Clone)]
pub enum BlobReply {
    Text(String),
    Binary,
    Fail(u16),
    /// Endpoint rejected before any request
    BadEndpoint,
}

/// Recorded blob request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobCall {
    pub log_key: String,
    pub token: String,
}

/// Blob service answering from a script; unknown keys get a 404
#[derive(Debug, Default)]
pub struct ScriptedBlobService {
    replies: Mutex<HashMap<String, BlobReply>>,
    calls: Mutex<Vec<BlobCall>>,
    delay: Option<Duration>,
}

impl ScriptedBlobService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn reply(self, log_key: &str, reply: BlobReply) -> Self {
        self.set_reply(log_key, reply);
        self
    }

    /// Change the answer for later requests
    pub fn set_reply(&self, log_key: &str, reply: BlobReply) {
        self.replies.lock().insert(log_key.to_string(), reply);
    }

    pub fn with_text(self, log_key: &str, text: impl Into<String>) -> Self {
        self.reply(log_key, BlobReply::Text(text.into()))
    }

    pub fn calls(&self) -> Vec<BlobCall> {
        self.calls.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }
}

#[async_trait]
impl BlobService for ScriptedBlobService {
    async fn fetch(
        &self,
        log_key: &str,
        token: &str,
        cancel: &CancellationToken,
    ) -> Result<BlobBody, FetchError> {
        self.calls.lock().push(BlobCall {
            log_key: log_key.to_string(),
            token: token.to_string(),
        });

        if let Some(delay) = self.delay {
            tokio::select! {
                () = cancel.cancelled() => return Err(FetchError::Cancelled),
                () = tokio::time::sleep(delay) => {}
            }
        }

        let reply = self.replies.lock().get(log_key).cloned();
        match reply {
            Some(BlobReply::Text(text)) => Ok(BlobBody::Text(text)),
            Some(BlobReply::Binary) => Ok(BlobBody::Other {
                content_type: Some("application/zip".into()),
            }),
            Some(BlobReply::Fail(status)) => Err(FetchError::Http { status }),
            Some(BlobReply::BadEndpoint) => {
                Err(FetchError::InvalidEndpoint(format!("no route for {log_key}")))
            }
            None => Err(FetchError::Http { status: 404 }),
        }
    }
}

pub type StreamSender = mpsc::UnboundedSender<Result<StreamEvent, FetchError>>;

/// Recorded stream connect
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamConnect {
    pub account_id: String,
    pub log_key: String,
    pub token: String,
}

/// Stream service fed by test-held channels
#[derive(Debug, Default)]
pub struct ChannelStreamService {
    pending: Mutex<HashMap<String, mpsc::UnboundedReceiver<Result<StreamEvent, FetchError>>>>,
    connects: Mutex<Vec<StreamConnect>>,
}

impl ChannelStreamService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Prepare the next connection for a key and return its feed.
    /// Connecting to a key without a prepared feed fails.
    pub fn channel(&self, log_key: &str) -> StreamSender {
        let (tx, rx) = mpsc::unbounded();
        self.pending.lock().insert(log_key.to_string(), rx);
        tx
    }

    pub fn connects(&self) -> Vec<StreamConnect> {
        self.connects.lock().clone()
    }
}

#[async_trait]
impl StreamService for ChannelStreamService {
    async fn connect(
        &self,
        account_id: &str,
        log_key: &str,
        token: &str,
    ) -> Result<EventStream, FetchError> {
        self.connects.lock().push(StreamConnect {
            account_id: account_id.to_string(),
            log_key: log_key.to_string(),
            token: token.to_string(),
        });
        self.pending
            .lock()
            .remove(log_key)
            .map(|feed| feed.boxed())
            .ok_or_else(|| FetchError::Connect(format!("no feed for {log_key}")))
    }
}

/// Orchestrator wired to scripted services
pub struct Harness {
    pub orchestrator: LogOrchestrator,
    pub tokens: Arc<SharedToken>,
    pub blobs: Arc<ScriptedBlobService>,
    pub streams: Arc<ChannelStreamService>,
    pub cache: BlobCache,
}

impl Harness {
    pub fn new(config: LogViewConfig, blobs: ScriptedBlobService) -> Self {
        Self::with_token(config, blobs, Some(TOKEN))
    }

    pub fn with_token(
        config: LogViewConfig,
        blobs: ScriptedBlobService,
        token: Option<&str>,
    ) -> Self {
        let tokens = Arc::new(SharedToken::new(token.map(str::to_string)));
        let blobs = Arc::new(blobs);
        let streams = Arc::new(ChannelStreamService::new());
        let cache = BlobCache::new(config.cache_capacity);
        let orchestrator = LogOrchestrator::new(
            config,
            cache.clone(),
            tokens.clone(),
            blobs.clone(),
            streams.clone(),
        );
        Self {
            orchestrator,
            tokens,
            blobs,
            streams,
            cache,
        }
    }
}

/// Let spawned tasks run until they block.
pub async fn settle() {
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }
}
