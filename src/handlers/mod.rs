pub mod actions;
pub mod execute;
pub mod health;
pub mod search;

pub use actions::{actions_handler, invoke_meta_tool_handler, meta_tools_handler};
pub use execute::execute_handler;
pub use health::{health_handler, ready_handler};
pub use search::search_handler;

use crate::state::AppState;
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

/// Every API route with state applied. `/metrics` and middleware are added
/// by the binary.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/search", post(search_handler))
        .route("/execute", post(execute_handler))
        .route("/actions", get(actions_handler))
        .route("/tools", get(meta_tools_handler))
        .route("/tools/:name", post(invoke_meta_tool_handler))
        .route("/health", get(health_handler))
        .route("/ready", get(ready_handler))
        .with_state(state)
}
