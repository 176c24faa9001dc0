//! Execution node descriptor consumed by the section builder
//!
//! Only the fields the log view reads are modelled; everything else the
//! backend sends is ignored during deserialization.

use crate::status::ExecutionStatus;
use serde::{Deserialize, Serialize};

/// One execution node (a pipeline step)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionNode {
    /// Overall node status
    #[serde(default)]
    pub status: ExecutionStatus,
    /// Executable responses; only the first one is used
    #[serde(default)]
    pub executable_responses: Vec<ExecutableResponse>,
    /// Per-unit progress records
    #[serde(default)]
    pub unit_progresses: Vec<UnitProgress>,
}

impl ExecutionNode {
    /// Create node with status only
    #[inline]
    #[must_use]
    pub fn new(status: ExecutionStatus) -> Self {
        Self {
            status,
            ..Self::default()
        }
    }

    /// With a single task descriptor
    #[must_use]
    pub fn with_task(mut self, task: TaskDescriptor) -> Self {
        self.executable_responses.push(ExecutableResponse {
            task: Some(task),
            task_chain: None,
        });
        self
    }

    /// With a task chain descriptor
    #[must_use]
    pub fn with_task_chain(mut self, chain: TaskDescriptor) -> Self {
        self.executable_responses.push(ExecutableResponse {
            task: None,
            task_chain: Some(chain),
        });
        self
    }

    /// With a unit progress record
    #[must_use]
    pub fn with_progress(mut self, progress: UnitProgress) -> Self {
        self.unit_progresses.push(progress);
        self
    }

    /// Descriptor of the first executable response, task before task chain
    #[must_use]
    pub fn descriptor(&self) -> Option<&TaskDescriptor> {
        self.executable_responses
            .first()
            .and_then(|r| r.task.as_ref().or(r.task_chain.as_ref()))
    }
}

/// Executable response carrying either a task or a task chain
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutableResponse {
    /// Single task
    #[serde(default)]
    pub task: Option<TaskDescriptor>,
    /// Task chain
    #[serde(default)]
    pub task_chain: Option<TaskDescriptor>,
}

/// Unit names and retrieval keys, index aligned
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskDescriptor {
    /// Unit display names
    #[serde(default)]
    pub units: Vec<String>,
    /// Retrieval keys
    #[serde(default)]
    pub log_keys: Vec<String>,
}

impl TaskDescriptor {
    /// Descriptor from parallel unit/key lists
    #[must_use]
    pub fn new<U, K>(units: U, log_keys: K) -> Self
    where
        U: IntoIterator,
        U::Item: Into<String>,
        K: IntoIterator,
        K::Item: Into<String>,
    {
        Self {
            units: units.into_iter().map(Into::into).collect(),
            log_keys: log_keys.into_iter().map(Into::into).collect(),
        }
    }
}

/// Progress of one named unit
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnitProgress {
    /// Unit name, matches an entry of [`TaskDescriptor::units`]
    pub unit_name: String,
    /// Unit execution status
    #[serde(default)]
    pub status: ExecutionStatus,
    /// Start time, epoch millis
    #[serde(default)]
    pub start_time: Option<i64>,
    /// End time, epoch millis
    #[serde(default)]
    pub end_time: Option<i64>,
}

impl UnitProgress {
    /// Progress record without timestamps
    #[must_use]
    pub fn new(unit_name: impl Into<String>, status: ExecutionStatus) -> Self {
        Self {
            unit_name: unit_name.into(),
            status,
            start_time: None,
            end_time: None,
        }
    }

    /// With start/end timestamps
    #[must_use]
    pub fn with_times(mut self, start_time: Option<i64>, end_time: Option<i64>) -> Self {
        self.start_time = start_time;
        self.end_time = end_time;
        self
    }
}
