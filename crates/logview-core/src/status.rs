//! Execution status vocabulary and classifier predicates
//!
//! Every other module asks these predicates instead of comparing status
//! strings directly, so the backend vocabulary can grow in one place.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Execution status reported by the backend for a node or a unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExecutionStatus {
    /// Not started yet
    #[default]
    NotStarted,
    /// Waiting in the backend queue
    Queued,
    /// Actively running
    Running,
    /// Waiting on an async callback
    AsyncWaiting,
    /// Waiting on a delegated task
    TaskWaiting,
    /// Waiting on a timer
    TimedWaiting,
    /// Paused by a user
    Paused,
    /// Generic wait
    Waiting,
    /// Waiting on manual intervention
    InterventionWaiting,
    /// Waiting on an approval
    ApprovalWaiting,
    /// Waiting on a resource constraint
    ResourceWaiting,
    /// Completed successfully
    Success,
    /// Failed but configured to be ignored
    IgnoreFailed,
    /// Failed
    Failed,
    /// Errored
    Errored,
    /// Aborted by a user
    Aborted,
    /// Expired before completing
    Expired,
    /// Approval rejected
    ApprovalRejected,
    /// Skipped
    Skipped,
    /// Suspended
    Suspended,
}

impl ExecutionStatus {
    /// Parse a backend status string, case and separator insensitive.
    ///
    /// Unknown values map to [`ExecutionStatus::NotStarted`].
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        let normalized: String = raw
            .chars()
            .filter(|c| *c != '_' && *c != '-' && !c.is_whitespace())
            .flat_map(char::to_lowercase)
            .collect();

        match normalized.as_str() {
            "queued" => Self::Queued,
            "running" => Self::Running,
            "asyncwaiting" => Self::AsyncWaiting,
            "taskwaiting" => Self::TaskWaiting,
            "timedwaiting" => Self::TimedWaiting,
            "paused" => Self::Paused,
            "waiting" => Self::Waiting,
            "interventionwaiting" => Self::InterventionWaiting,
            "approvalwaiting" => Self::ApprovalWaiting,
            "resourcewaiting" => Self::ResourceWaiting,
            "success" | "succeeded" => Self::Success,
            "ignorefailed" => Self::IgnoreFailed,
            "failed" | "failure" => Self::Failed,
            "errored" | "error" => Self::Errored,
            "aborted" => Self::Aborted,
            "expired" => Self::Expired,
            "approvalrejected" => Self::ApprovalRejected,
            "skipped" => Self::Skipped,
            "suspended" => Self::Suspended,
            _ => Self::NotStarted,
        }
    }
}

impl<'de> Deserialize<'de> for ExecutionStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::parse(&raw))
    }
}

impl fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

/// Still active: running or any of the waiting states
#[inline]
#[must_use]
pub fn is_running_like(status: ExecutionStatus) -> bool {
    matches!(
        status,
        ExecutionStatus::Running
            | ExecutionStatus::AsyncWaiting
            | ExecutionStatus::TaskWaiting
            | ExecutionStatus::TimedWaiting
            | ExecutionStatus::Paused
            | ExecutionStatus::Waiting
            | ExecutionStatus::InterventionWaiting
            | ExecutionStatus::ApprovalWaiting
            | ExecutionStatus::ResourceWaiting
    )
}

/// Reached a terminal state
#[inline]
#[must_use]
pub fn is_complete(status: ExecutionStatus) -> bool {
    matches!(
        status,
        ExecutionStatus::Success
            | ExecutionStatus::IgnoreFailed
            | ExecutionStatus::Failed
            | ExecutionStatus::Errored
            | ExecutionStatus::Aborted
            | ExecutionStatus::Expired
            | ExecutionStatus::ApprovalRejected
            | ExecutionStatus::Skipped
            | ExecutionStatus::Suspended
    )
}

/// Completed successfully
#[inline]
#[must_use]
pub fn is_success(status: ExecutionStatus) -> bool {
    matches!(status, ExecutionStatus::Success | ExecutionStatus::IgnoreFailed)
}

/// Completed unsuccessfully
#[inline]
#[must_use]
pub fn is_failed(status: ExecutionStatus) -> bool {
    matches!(
        status,
        ExecutionStatus::Failed
            | ExecutionStatus::Errored
            | ExecutionStatus::Aborted
            | ExecutionStatus::Expired
            | ExecutionStatus::ApprovalRejected
    )
}

/// Expired before completing
#[inline]
#[must_use]
pub fn is_expired(status: ExecutionStatus) -> bool {
    status == ExecutionStatus::Expired
}

/// Lifecycle status of one log section as shown to the renderer
///
/// `Queued` and `Loading` are local fetch states; the rest mirror the
/// unit's execution status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SectionStatus {
    /// Unit has not started
    #[default]
    NotStarted,
    /// Fetch accepted by the queue, request about to be issued
    Queued,
    /// Fetch requested
    Loading,
    /// Unit is running
    Running,
    /// Unit succeeded
    Success,
    /// Unit failed
    Failure,
    /// Unit expired
    Expired,
}

impl SectionStatus {
    /// Fetch in flight; rebuilds and toggles must not overwrite it
    #[inline]
    #[must_use]
    pub fn is_non_mutate(self) -> bool {
        matches!(self, Self::Loading | Self::Queued)
    }
}

impl From<ExecutionStatus> for SectionStatus {
    fn from(status: ExecutionStatus) -> Self {
        if is_expired(status) {
            Self::Expired
        } else if is_running_like(status) {
            Self::Running
        } else if is_success(status) {
            Self::Success
        } else if is_failed(status) {
            Self::Failure
        } else {
            Self::NotStarted
        }
    }
}
