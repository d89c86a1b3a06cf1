use crate::discovery::{meta_tool_definitions, ToolDefinition};
use crate::error::{AppError, Result};
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    Json,
};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

#[derive(Debug, Serialize)]
pub struct ActionsResponse {
    pub total: usize,
    pub connectors: Vec<String>,
    pub actions: Vec<ToolDefinition>,
}

/// GET /actions - The current working set as agent tool definitions.
pub async fn actions_handler(State(state): State<Arc<AppState>>) -> Json<ActionsResponse> {
    let actions: Vec<ToolDefinition> = state
        .toolset
        .action_names()
        .iter()
        .filter_map(|name| state.toolset.get(name))
        .map(|action| ToolDefinition::from_action(&action))
        .collect();

    let mut connectors: Vec<String> = actions
        .iter()
        .map(|a| crate::catalog::connector_of(&a.name))
        .collect();
    connectors.sort();
    connectors.dedup();

    Json(ActionsResponse {
        total: actions.len(),
        connectors,
        actions,
    })
}

/// GET /tools - Definitions of the meta-tools (search, execute, feedback).
pub async fn meta_tools_handler() -> Json<Vec<ToolDefinition>> {
    Json(meta_tool_definitions())
}

/// POST /tools/:name - Invoke a meta-tool. `tool_execute` and feedback run as dry runs.
pub async fn invoke_meta_tool_handler(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
    Json(args): Json<Value>,
) -> Result<Json<Value>> {
    let toolset = Arc::clone(&state.toolset);
    let result = tokio::task::spawn_blocking(move || toolset.invoke_meta_tool(&name, &args, None))
        .await
        .map_err(|e| AppError::ResourceError(format!("Meta tool task join error: {}", e)))??;

    Ok(Json(result))
}
