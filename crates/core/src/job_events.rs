//! Job lifecycle events pushed to live subscribers.
//!
//! The [`JobRunner`](crate::runner::JobRunner) emits one [`JobEvent`] per
//! state transition through a [`JobNotifier`]. The WebSocket layer in the
//! API crate is the production notifier.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

use crate::job::{Job, JobStatus};
use crate::types::{JobId, Timestamp};

/// Job state changed (pending, running, completed or failed).
pub const MSG_TYPE_JOB_UPDATE: &str = "job_update";

/// Acknowledgement sent once to a freshly connected subscriber.
pub const MSG_TYPE_CONNECTION: &str = "connection";

/// Snapshot of a job at the moment of a transition.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobEvent {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub job_id: JobId,
    pub status: JobStatus,
    pub progress: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub timestamp: Timestamp,
}

impl JobEvent {
    pub fn from_job(job: &Job) -> Self {
        Self {
            kind: MSG_TYPE_JOB_UPDATE,
            job_id: job.id.clone(),
            status: job.status,
            progress: job.progress,
            result: job.result.clone(),
            error: job.error.clone(),
            timestamp: chrono::Utc::now(),
        }
    }
}

/// Fan-out target for job events.
///
/// Implementations must be best-effort: a failing subscriber must never
/// surface as an error to the runner.
#[async_trait]
pub trait JobNotifier: Send + Sync {
    async fn notify(&self, event: JobEvent);
}

/// Notifier that drops every event. Useful when no subscribers exist.
pub struct NoopNotifier;

#[async_trait]
impl JobNotifier for NoopNotifier {
    async fn notify(&self, _event: JobEvent) {}
}
