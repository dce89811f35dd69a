#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Method, Request, Response, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;
use zkpret_core::tools::{ExecutorConfig, ExecutorError, ExecutorHealth, ToolExecution, ToolExecutor};

use zkpret_api::config::ServerConfig;
use zkpret_api::router::build_app_router;
use zkpret_api::state::AppState;

/// Succeeds after [`STUB_DELAY`] with `{"verdict": "VALID"}`.
pub const OP_OK: &str = "verify-ok";
/// Exits non-zero after [`STUB_DELAY`].
pub const OP_FAIL: &str = "verify-fail";
/// Never returns; only the timeout ends it.
pub const OP_HANG: &str = "verify-hang";
/// Panics inside the executor.
pub const OP_PANIC: &str = "verify-panic";

pub const STUB_DELAY: Duration = Duration::from_millis(50);
pub const STUB_TIMEOUT: Duration = Duration::from_millis(300);

/// In-process stand-in for the proof toolchain.
#[derive(Default)]
pub struct StubExecutor {
    pub calls: AtomicUsize,
}

impl StubExecutor {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ToolExecutor for StubExecutor {
    fn operations(&self) -> Vec<String> {
        [OP_OK, OP_FAIL, OP_HANG, OP_PANIC]
            .into_iter()
            .map(String::from)
            .collect()
    }

    fn timeout(&self) -> Duration {
        STUB_TIMEOUT
    }

    async fn execute(
        &self,
        operation: &str,
        parameters: &Value,
    ) -> Result<ToolExecution, ExecutorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match operation {
            OP_OK => {
                tokio::time::sleep(STUB_DELAY).await;
                Ok(ToolExecution {
                    result: json!({"verdict": "VALID", "parameters": parameters}),
                    elapsed: STUB_DELAY,
                })
            }
            OP_FAIL => {
                tokio::time::sleep(STUB_DELAY).await;
                Err(ExecutorError::ExternalProcessFailure {
                    exit_code: 1,
                    detail: "circuit constraint violated".into(),
                })
            }
            OP_HANG => {
                std::future::pending::<()>().await;
                unreachable!()
            }
            _ => panic!("stub executor exploded"),
        }
    }

    async fn health_check(&self) -> ExecutorHealth {
        ExecutorHealth::connected(json!({"stub": true}))
    }
}

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:3000".to_string()],
        request_timeout_secs: 30,
        shutdown_timeout_secs: 5,
        async_jobs_enabled: true,
        executor: ExecutorConfig::default(),
    }
}

/// Application state around a fresh [`StubExecutor`].
pub fn test_state(config: ServerConfig) -> (AppState, Arc<StubExecutor>) {
    let executor = Arc::new(StubExecutor::default());
    let state = AppState::new(config, Arc::clone(&executor) as Arc<dyn ToolExecutor>);
    (state, executor)
}

/// Build the full application router with all middleware layers.
///
/// Uses the same [`build_app_router`] as `main.rs` so integration tests
/// exercise the production middleware stack.
pub fn build_test_app() -> Router {
    let (state, _) = test_state(test_config());
    build_app_router(state, &test_config())
}

/// Router plus a handle on its state, for tests that inspect the store.
pub fn build_test_app_with_state() -> (Router, AppState, Arc<StubExecutor>) {
    let config = test_config();
    let (state, executor) = test_state(config.clone());
    (build_app_router(state.clone(), &config), state, executor)
}

// ---------------------------------------------------------------------------
// Request helpers
// ---------------------------------------------------------------------------

pub async fn send(app: Router, method: Method, uri: &str, body: Option<Value>) -> Response<Body> {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json.to_string())),
        None => builder.body(Body::empty()),
    }
    .expect("build request");

    app.oneshot(request).await.expect("router is infallible")
}

pub async fn get(app: Router, uri: &str) -> Response<Body> {
    send(app, Method::GET, uri, None).await
}

pub async fn post_json(app: Router, uri: &str, body: Value) -> Response<Body> {
    send(app, Method::POST, uri, Some(body)).await
}

pub async fn delete(app: Router, uri: &str) -> Response<Body> {
    send(app, Method::DELETE, uri, None).await
}

/// Collect a response body and parse it as JSON.
pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("read body")
        .to_bytes();
    serde_json::from_slice(&bytes).expect("body is JSON")
}

/// Poll `GET /api/v1/jobs/{id}` until the job reaches `status`.
pub async fn wait_for_status(app: &Router, job_id: &str, status: &str) -> Value {
    let uri = format!("/api/v1/jobs/{job_id}");
    for _ in 0..200 {
        let response = get(app.clone(), &uri).await;
        assert_eq!(response.status(), StatusCode::OK);
        let job = body_json(response).await["data"].clone();
        if job["status"] == status {
            return job;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("job {job_id} never reached status {status}");
}
