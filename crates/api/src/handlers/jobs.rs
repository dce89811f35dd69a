//! Handlers for the `/jobs` resource.

use axum::extract::{Path, State};
use axum::Json;
use serde::Serialize;
use zkpret_core::job::Job;

use crate::error::AppResult;
use crate::response::DataResponse;
use crate::state::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobList {
    pub jobs: Vec<Job>,
    pub total: usize,
    pub active: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PurgeResult {
    pub removed: usize,
}

/// GET /api/v1/jobs
///
/// Every stored job, oldest first, plus the number still active.
pub async fn list_jobs(State(state): State<AppState>) -> Json<DataResponse<JobList>> {
    let jobs = state.store.list_all().await;
    let active = jobs.iter().filter(|job| job.is_active()).count();
    Json(DataResponse {
        data: JobList {
            total: jobs.len(),
            active,
            jobs,
        },
    })
}

/// GET /api/v1/jobs/{id}
pub async fn get_job(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> AppResult<Json<DataResponse<Job>>> {
    let job = state.store.get(&job_id).await?;
    Ok(Json(DataResponse { data: job }))
}

/// DELETE /api/v1/jobs/completed
///
/// Removes completed and failed jobs. Safe to repeat.
pub async fn purge_completed(State(state): State<AppState>) -> Json<DataResponse<PurgeResult>> {
    let removed = state.store.purge_terminal().await;
    tracing::info!(removed, "Purged finished jobs");
    Json(DataResponse {
        data: PurgeResult { removed },
    })
}
