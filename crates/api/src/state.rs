use std::sync::Arc;

use zkpret_core::job_events::JobNotifier;
use zkpret_core::runner::JobRunner;
use zkpret_core::store::JobStore;
use zkpret_core::tools::ToolExecutor;

use crate::config::ServerConfig;
use crate::ws::WsManager;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc` or is already `Clone`).
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
    /// Job table, shared with the runner.
    pub store: Arc<JobStore>,
    /// Background job execution.
    pub runner: JobRunner,
    /// Toolchain adapter used by the synchronous path and health probes.
    pub executor: Arc<dyn ToolExecutor>,
    /// WebSocket subscriber registry; also the runner's notifier.
    pub ws_manager: Arc<WsManager>,
}

impl AppState {
    /// Wire the store, runner and WebSocket manager around `executor`.
    pub fn new(config: ServerConfig, executor: Arc<dyn ToolExecutor>) -> Self {
        let store = Arc::new(JobStore::new());
        let ws_manager = Arc::new(WsManager::new());
        let notifier: Arc<dyn JobNotifier> = ws_manager.clone();
        let runner = JobRunner::new(Arc::clone(&store), Arc::clone(&executor), notifier)
            .with_async_enabled(config.async_jobs_enabled);

        Self {
            config: Arc::new(config),
            store,
            runner,
            executor,
            ws_manager,
        }
    }
}
