//! Route definitions for the `/jobs` resource.

use axum::routing::{delete, get, post};
use axum::Router;

use crate::handlers::{jobs, tools};
use crate::state::AppState;

/// Routes mounted at `/jobs`.
///
/// ```text
/// GET    /                -> list_jobs
/// POST   /start           -> execute_async (alias of /tools/execute-async)
/// DELETE /completed       -> purge_completed
/// GET    /{id}            -> get_job
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(jobs::list_jobs))
        .route("/start", post(tools::execute_async))
        .route("/completed", delete(jobs::purge_completed))
        .route("/{id}", get(jobs::get_job))
}
