//! Route definitions for the `/tools` resource.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::tools;
use crate::state::AppState;

/// Routes mounted at `/tools`.
///
/// ```text
/// GET    /                -> list_tools
/// POST   /execute         -> execute
/// POST   /execute-async   -> execute_async
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(tools::list_tools))
        .route("/execute", post(tools::execute))
        .route("/execute-async", post(tools::execute_async))
}
