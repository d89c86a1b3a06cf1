use crate::dispatch::ResolvedRequest;
use crate::error::Result;
use crate::state::AppState;
use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;

#[derive(Debug, Deserialize)]
pub struct ExecuteRequest {
    /// Exact action name
    pub name: String,
    #[serde(default)]
    pub arguments: Map<String, Value>,
    /// Overrides the linked accounts and `ACCOUNT_ID` for this call
    #[serde(default)]
    pub account_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ExecuteResponse {
    pub action: String,
    pub request: ResolvedRequest,
    pub url: String,
}

/// POST /execute - Resolve an action call into the concrete HTTP request.
///
/// Nothing is sent; the caller gets the method, URL, headers, query and body
/// that a transport would use.
pub async fn execute_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ExecuteRequest>,
) -> Result<Json<ExecuteResponse>> {
    let resolved = match request.account_id.as_deref() {
        Some(account) => {
            state
                .toolset
                .execute_for_account(&request.name, Some(account), &request.arguments)?
        }
        None => state
            .toolset
            .execute_by_name(&request.name, &request.arguments)?,
    };

    tracing::debug!(action = %request.name, "Execute resolved");

    Ok(Json(ExecuteResponse {
        url: resolved.full_url(),
        action: request.name,
        request: resolved,
    }))
}
