use crate::job::JobStatus;
use crate::tools::ExecutorError;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("Job id '{0}' is already in use by a live job")]
    DuplicateId(String),

    #[error("Async jobs are disabled")]
    AsyncDisabled,

    #[error("Job {id} cannot move from {from} to {to}")]
    InvalidTransition {
        id: String,
        from: JobStatus,
        to: JobStatus,
    },

    #[error(transparent)]
    Executor(#[from] ExecutorError),

    #[error("Internal error: {0}")]
    Internal(String),
}
