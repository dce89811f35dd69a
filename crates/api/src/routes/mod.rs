pub mod health;
pub mod jobs;
pub mod tools;

use axum::routing::get;
use axum::Router;

use crate::handlers;
use crate::state::AppState;
use crate::ws;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /ws                          WebSocket job updates
/// /health                      health probe
/// /status                      server status and feature flags
///
/// /tools                       supported operations
/// /tools/execute               synchronous execution (POST)
/// /tools/execute-async         asynchronous submission (POST)
///
/// /jobs                        list
/// /jobs/start                  asynchronous submission (POST)
/// /jobs/completed              purge finished jobs (DELETE)
/// /jobs/{id}                   get
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/ws", get(ws::ws_handler))
        .route("/health", get(handlers::health::health_check))
        .route("/status", get(handlers::health::server_status))
        .nest("/tools", tools::router())
        .nest("/jobs", jobs::router())
}
