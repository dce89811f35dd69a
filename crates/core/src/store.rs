//! In-memory job table.
//!
//! [`JobStore`] is the only owner of job records. Every read hands out a
//! cloned snapshot, so callers can never observe a record mid-update. The
//! lifecycle mutators enforce the state machine in [`JobStatus`].

use std::collections::HashMap;

use serde_json::Value;
use tokio::sync::RwLock;

use crate::error::CoreError;
use crate::job::{Job, JobStatus, COMPLETE_PROGRESS};
use crate::types::JobId;

/// Thread-safe job table guarded by a single coarse lock.
///
/// Designed to be wrapped in `Arc` and shared between request handlers and
/// the [`JobRunner`](crate::runner::JobRunner).
pub struct JobStore {
    jobs: RwLock<HashMap<JobId, Job>>,
}

impl JobStore {
    pub fn new() -> Self {
        Self {
            jobs: RwLock::new(HashMap::new()),
        }
    }

    /// Insert a new `pending` job.
    ///
    /// Fails with [`CoreError::DuplicateId`] while a job with the same id is
    /// still stored, whatever its status.
    pub async fn create(
        &self,
        id: JobId,
        operation_name: &str,
        parameters: Value,
    ) -> Result<Job, CoreError> {
        let mut jobs = self.jobs.write().await;
        if jobs.contains_key(&id) {
            return Err(CoreError::DuplicateId(id));
        }
        let job = Job::new(id.clone(), operation_name, parameters);
        jobs.insert(id, job.clone());
        Ok(job)
    }

    pub async fn get(&self, id: &str) -> Result<Job, CoreError> {
        self.jobs
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| CoreError::NotFound {
                entity: "Job",
                id: id.to_string(),
            })
    }

    /// All jobs, oldest first.
    pub async fn list_all(&self) -> Vec<Job> {
        let mut jobs: Vec<Job> = self.jobs.read().await.values().cloned().collect();
        sort_by_start(&mut jobs);
        jobs
    }

    /// Jobs that are `pending` or `running`, oldest first.
    pub async fn list_active(&self) -> Vec<Job> {
        let mut jobs: Vec<Job> = self
            .jobs
            .read()
            .await
            .values()
            .filter(|job| job.is_active())
            .cloned()
            .collect();
        sort_by_start(&mut jobs);
        jobs
    }

    pub async fn count(&self) -> usize {
        self.jobs.read().await.len()
    }

    pub async fn count_active(&self) -> usize {
        self.jobs
            .read()
            .await
            .values()
            .filter(|job| job.is_active())
            .count()
    }

    /// Remove every `completed` or `failed` job. Returns how many were removed.
    pub async fn purge_terminal(&self) -> usize {
        let mut jobs = self.jobs.write().await;
        let before = jobs.len();
        jobs.retain(|_, job| job.is_active());
        before - jobs.len()
    }

    /// `pending -> running`, recording the initial liveness progress.
    pub async fn mark_running(&self, id: &str, progress: u8) -> Result<Job, CoreError> {
        self.transition(id, JobStatus::Running, |job| {
            job.progress = job.progress.max(progress.min(COMPLETE_PROGRESS));
        })
        .await
    }

    /// `running -> completed` with the given result payload.
    pub async fn complete(&self, id: &str, result: Value) -> Result<Job, CoreError> {
        self.transition(id, JobStatus::Completed, |job| {
            job.progress = COMPLETE_PROGRESS;
            job.result = Some(result);
            job.end_time = Some(chrono::Utc::now());
        })
        .await
    }

    /// `running -> failed` with the given error message.
    pub async fn fail(&self, id: &str, error: String) -> Result<Job, CoreError> {
        self.transition(id, JobStatus::Failed, |job| {
            job.error = Some(error);
            job.end_time = Some(chrono::Utc::now());
        })
        .await
    }

    async fn transition(
        &self,
        id: &str,
        next: JobStatus,
        apply: impl FnOnce(&mut Job),
    ) -> Result<Job, CoreError> {
        let mut jobs = self.jobs.write().await;
        let job = jobs.get_mut(id).ok_or_else(|| CoreError::NotFound {
            entity: "Job",
            id: id.to_string(),
        })?;

        if !job.status.can_transition_to(next) {
            return Err(CoreError::InvalidTransition {
                id: id.to_string(),
                from: job.status,
                to: next,
            });
        }

        job.status = next;
        apply(job);
        Ok(job.clone())
    }
}

impl Default for JobStore {
    fn default() -> Self {
        Self::new()
    }
}

fn sort_by_start(jobs: &mut [Job]) {
    jobs.sort_by(|a, b| a.start_time.cmp(&b.start_time).then_with(|| a.id.cmp(&b.id)));
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
