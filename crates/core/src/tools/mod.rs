//! Executor adapter for the external proof toolchain.
//!
//! [`ToolExecutor`] is the seam between the job machinery and whatever
//! actually performs an operation. [`NodeToolExecutor`] is the production
//! implementation that runs compiled toolchain scripts with `node`; tests
//! substitute in-process stubs.
//!
//! All callers go through [`execute_sync`], which rejects unknown operations
//! before anything is spawned and applies the executor's timeout ceiling.

pub mod args;
pub mod catalog;
pub mod node;
pub mod outcome;
pub mod subprocess;

use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

pub use node::{ExecutorConfig, NodeToolExecutor};

/// Default ceiling for a single toolchain invocation (30 minutes).
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30 * 60);

/// System-level failures of an invocation.
///
/// A negative business verdict is *not* an error; it is carried inside a
/// successful [`ToolExecution`] result.
#[derive(Debug, thiserror::Error)]
pub enum ExecutorError {
    #[error("Unknown operation: {name}. Available operations: {}", .available.join(", "))]
    UnknownOperation { name: String, available: Vec<String> },

    #[error("Execution timed out after {elapsed_ms}ms")]
    Timeout { elapsed_ms: u64 },

    #[error("External process failed with exit code {exit_code}: {detail}")]
    ExternalProcessFailure { exit_code: i32, detail: String },

    #[error("Failed to run external process: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("Compiled script not found: {0}")]
    ScriptNotFound(String),
}

/// Outcome of a successful invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolExecution {
    /// Free-form payload; includes the business verdict.
    pub result: Value,
    pub elapsed: Duration,
}

impl ToolExecution {
    /// Elapsed time rendered as `"<n>ms"`.
    pub fn execution_time(&self) -> String {
        format!("{}ms", self.elapsed.as_millis())
    }
}

/// Reachability of the external dependency.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutorHealth {
    pub connected: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<Value>,
}

impl ExecutorHealth {
    pub fn connected(detail: Value) -> Self {
        Self {
            connected: true,
            detail: Some(detail),
        }
    }

    pub fn disconnected(detail: Value) -> Self {
        Self {
            connected: false,
            detail: Some(detail),
        }
    }
}

/// Something that can perform named toolchain operations.
#[async_trait]
pub trait ToolExecutor: Send + Sync {
    /// The fixed set of operation names this executor accepts.
    fn operations(&self) -> Vec<String>;

    /// Ceiling applied to every call to [`execute`](Self::execute).
    fn timeout(&self) -> Duration {
        DEFAULT_TIMEOUT
    }

    /// Run `operation`. Only called with names from [`operations`](Self::operations).
    async fn execute(
        &self,
        operation: &str,
        parameters: &Value,
    ) -> Result<ToolExecution, ExecutorError>;

    /// Cheap probe of the external dependency. Must not run an operation.
    async fn health_check(&self) -> ExecutorHealth;

    /// Reject names outside [`operations`](Self::operations).
    fn check_operation(&self, operation: &str) -> Result<(), ExecutorError> {
        let available = self.operations();
        if available.iter().any(|name| name == operation) {
            Ok(())
        } else {
            Err(ExecutorError::UnknownOperation {
                name: operation.to_string(),
                available,
            })
        }
    }
}

/// Run `operation` to completion, failure, or timeout.
///
/// This is the synchronous execution path; the job runner uses it too, from
/// its own task. Dropping the executor future on timeout drops any child
/// process it owns, and child processes are spawned with `kill_on_drop`.
pub async fn execute_sync(
    executor: &dyn ToolExecutor,
    operation: &str,
    parameters: &Value,
) -> Result<ToolExecution, ExecutorError> {
    executor.check_operation(operation)?;

    let ceiling = executor.timeout();
    let start = Instant::now();
    tracing::info!(operation, "Tool execution started");

    let outcome = match tokio::time::timeout(ceiling, executor.execute(operation, parameters)).await
    {
        Ok(outcome) => outcome,
        Err(_elapsed) => Err(ExecutorError::Timeout {
            elapsed_ms: start.elapsed().as_millis() as u64,
        }),
    };

    let elapsed_ms = start.elapsed().as_millis() as u64;
    match &outcome {
        Ok(_) => tracing::info!(operation, elapsed_ms, "Tool execution completed"),
        Err(e) => tracing::warn!(operation, elapsed_ms, error = %e, "Tool execution failed"),
    }

    outcome
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
