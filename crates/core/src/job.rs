//! Job record and its lifecycle states.
//!
//! A [`Job`] tracks one asynchronous execution of a toolchain operation.
//! Status moves strictly forward: `pending -> running -> completed | failed`.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::types::{JobId, Timestamp};

/// Progress reported once a job has been handed to the executor.
pub const INITIAL_RUNNING_PROGRESS: u8 = 10;

/// Progress reported on successful completion.
pub const COMPLETE_PROGRESS: u8 = 100;

/// Lifecycle state of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl JobStatus {
    /// Wire name of the status.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    /// `completed` and `failed` have no outgoing transitions.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Whether `self -> next` is an edge of the state machine.
    pub fn can_transition_to(self, next: JobStatus) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Running)
                | (Self::Running, Self::Completed)
                | (Self::Running, Self::Failed)
        )
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A tracked asynchronous execution of one operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub id: JobId,
    pub operation_name: String,
    /// Passed through unexamined to the executor.
    pub parameters: Value,
    pub status: JobStatus,
    /// Advisory only; meaningful while `running`.
    pub progress: u8,
    pub start_time: Timestamp,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time: Option<Timestamp>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Job {
    /// Build a fresh `pending` job.
    pub fn new(id: JobId, operation_name: impl Into<String>, parameters: Value) -> Self {
        Self {
            id,
            operation_name: operation_name.into(),
            parameters,
            status: JobStatus::Pending,
            progress: 0,
            start_time: chrono::Utc::now(),
            end_time: None,
            result: None,
            error: None,
        }
    }

    pub fn is_active(&self) -> bool {
        !self.status.is_terminal()
    }
}

/// Generate a job id of the form `job_<unix-millis>_<8 hex chars>`.
pub fn generate_job_id() -> JobId {
    let millis = chrono::Utc::now().timestamp_millis();
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    format!("job_{millis}_{}", &suffix[..8])
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
