//! Handlers for the `/tools` resource: the operation catalog and the
//! synchronous and asynchronous execution entry points.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use zkpret_core::job::JobStatus;
use zkpret_core::tools::execute_sync;
use zkpret_core::types::JobId;

use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Body of both execution endpoints.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecuteRequest {
    #[serde(alias = "toolName")]
    pub operation_name: String,
    /// Missing or `null` means no parameters.
    #[serde(default)]
    pub parameters: Option<Value>,
    /// Caller-chosen id; asynchronous submissions only.
    #[serde(default)]
    pub job_id: Option<JobId>,
}

impl ExecuteRequest {
    fn validate(self) -> AppResult<(String, Value, Option<JobId>)> {
        let operation = self.operation_name.trim().to_string();
        if operation.is_empty() {
            return Err(AppError::BadRequest("operationName is required".into()));
        }
        let parameters = match self.parameters {
            None | Some(Value::Null) => Value::Object(Default::default()),
            Some(params @ Value::Object(_)) => params,
            Some(_) => return Err(AppError::BadRequest("parameters must be an object".into())),
        };
        Ok((operation, parameters, self.job_id))
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolList {
    pub tools: Vec<String>,
    pub count: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecuteResponse {
    pub success: bool,
    pub result: Value,
    /// Adapter-reported duration, e.g. `"1534ms"`.
    pub elapsed_time: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitResponse {
    pub job_id: JobId,
    pub status: JobStatus,
    pub operation_name: String,
    pub message: &'static str,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// GET /api/v1/tools
pub async fn list_tools(State(state): State<AppState>) -> Json<DataResponse<ToolList>> {
    let tools = state.executor.operations();
    let count = tools.len();
    Json(DataResponse {
        data: ToolList { tools, count },
    })
}

/// POST /api/v1/tools/execute
///
/// Runs the operation to completion and answers with its result. Bounded by
/// the executor timeout; does not touch the job store.
pub async fn execute(
    State(state): State<AppState>,
    payload: Result<Json<ExecuteRequest>, JsonRejection>,
) -> AppResult<Json<DataResponse<ExecuteResponse>>> {
    let Json(request) = payload?;
    let (operation, parameters, _) = request.validate()?;

    let execution = execute_sync(state.executor.as_ref(), &operation, &parameters).await?;

    Ok(Json(DataResponse {
        data: ExecuteResponse {
            success: true,
            elapsed_time: execution.execution_time(),
            result: execution.result,
        },
    }))
}

/// POST /api/v1/tools/execute-async (also POST /api/v1/jobs/start)
///
/// Records a `pending` job and returns 202 immediately; progress is pushed
/// over the WebSocket and can be polled at `/api/v1/jobs/{id}`.
pub async fn execute_async(
    State(state): State<AppState>,
    payload: Result<Json<ExecuteRequest>, JsonRejection>,
) -> AppResult<impl IntoResponse> {
    let Json(request) = payload?;
    let (operation, parameters, job_id) = request.validate()?;

    let job = state.runner.submit(job_id, &operation, parameters).await?;

    Ok((
        StatusCode::ACCEPTED,
        Json(DataResponse {
            data: SubmitResponse {
                job_id: job.id,
                status: job.status,
                operation_name: job.operation_name,
                message: "Job started. Subscribe to /api/v1/ws for updates.",
            },
        }),
    ))
}
