use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use zkpret_core::error::CoreError;
use zkpret_core::tools::ExecutorError;

/// Application-level error type for HTTP handlers.
///
/// Wraps [`CoreError`] and [`ExecutorError`] for domain errors and adds
/// HTTP-specific variants. Implements [`IntoResponse`] to produce consistent
/// JSON error responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A domain-level error from `zkpret_core`.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// A failure of the synchronous execution path.
    #[error(transparent)]
    Executor(#[from] ExecutorError),

    /// A bad request with a human-readable message.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// An internal error with a human-readable message.
    #[error("Internal error: {0}")]
    InternalError(String),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            // --- CoreError variants ---
            AppError::Core(core) => match core {
                CoreError::NotFound { entity, id } => (
                    StatusCode::NOT_FOUND,
                    "NOT_FOUND",
                    format!("{entity} with id {id} not found"),
                ),
                CoreError::DuplicateId(_) => {
                    (StatusCode::CONFLICT, "DUPLICATE_ID", core.to_string())
                }
                CoreError::AsyncDisabled => (
                    StatusCode::BAD_REQUEST,
                    "ASYNC_DISABLED",
                    "Async jobs are disabled. Use the synchronous endpoint instead.".to_string(),
                ),
                CoreError::Executor(err) => classify_executor_error(err),
                CoreError::InvalidTransition { .. } | CoreError::Internal(_) => {
                    tracing::error!(error = %core, "Internal core error");
                    internal()
                }
            },

            AppError::Executor(err) => classify_executor_error(err),

            // --- HTTP-specific errors ---
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),
            AppError::InternalError(msg) => {
                tracing::error!(error = %msg, "Internal error");
                internal()
            }
        };

        let body = json!({
            "success": false,
            "error": message,
            "code": code,
        });

        (status, axum::Json(body)).into_response()
    }
}

/// Map an executor failure onto an HTTP status, error code, and message.
///
/// A process that could not be started counts as a failed process.
fn classify_executor_error(err: &ExecutorError) -> (StatusCode, &'static str, String) {
    match err {
        ExecutorError::UnknownOperation { .. } => {
            (StatusCode::BAD_REQUEST, "UNKNOWN_OPERATION", err.to_string())
        }
        ExecutorError::Timeout { .. } => (StatusCode::GATEWAY_TIMEOUT, "TIMEOUT", err.to_string()),
        ExecutorError::ExternalProcessFailure { .. }
        | ExecutorError::Spawn(_)
        | ExecutorError::ScriptNotFound(_) => (
            StatusCode::BAD_GATEWAY,
            "EXTERNAL_PROCESS_FAILURE",
            err.to_string(),
        ),
    }
}

fn internal() -> (StatusCode, &'static str, String) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "INTERNAL_ERROR",
        "An internal error occurred".to_string(),
    )
}
