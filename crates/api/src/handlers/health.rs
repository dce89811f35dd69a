use axum::extract::State;
use axum::Json;
use serde::Serialize;
use zkpret_core::tools::ExecutorHealth;

use crate::response::DataResponse;
use crate::state::AppState;

/// Health check response payload.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    /// `ok` when the toolchain is reachable, `degraded` otherwise.
    pub status: &'static str,
    /// Crate version from Cargo.toml.
    pub version: &'static str,
    pub executor_connected: bool,
    pub active_jobs: usize,
    pub subscribers: usize,
    pub async_jobs_enabled: bool,
    pub timestamp: String,
}

/// GET /health and GET /api/v1/health
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let executor = state.executor.health_check().await;
    let status = if executor.connected { "ok" } else { "degraded" };

    Json(HealthResponse {
        status,
        version: env!("CARGO_PKG_VERSION"),
        executor_connected: executor.connected,
        active_jobs: state.store.count_active().await,
        subscribers: state.ws_manager.connection_count().await,
        async_jobs_enabled: state.runner.is_enabled(),
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Features {
    pub async_jobs: bool,
    pub websocket: bool,
    pub sync_execution: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobTotals {
    pub total: usize,
    pub active: usize,
    pub in_flight: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerStatus {
    pub server: &'static str,
    pub version: &'static str,
    pub features: Features,
    pub executor: ExecutorHealth,
    pub operations: usize,
    pub jobs: JobTotals,
    pub subscribers: usize,
    pub timestamp: String,
}

/// GET /api/v1/status
pub async fn server_status(State(state): State<AppState>) -> Json<DataResponse<ServerStatus>> {
    let executor = state.executor.health_check().await;

    Json(DataResponse {
        data: ServerStatus {
            server: env!("CARGO_PKG_NAME"),
            version: env!("CARGO_PKG_VERSION"),
            features: Features {
                async_jobs: state.runner.is_enabled(),
                websocket: true,
                sync_execution: true,
            },
            executor,
            operations: state.executor.operations().len(),
            jobs: JobTotals {
                total: state.store.count().await,
                active: state.store.count_active().await,
                in_flight: state.runner.in_flight(),
            },
            subscribers: state.ws_manager.connection_count().await,
            timestamp: chrono::Utc::now().to_rfc3339(),
        },
    })
}
