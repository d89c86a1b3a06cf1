//! Action discovery over the working set.
//!
//! Ranking is CPU-bound but cheap once the index exists, so it runs on the
//! blocking pool to keep a cold index build off the async workers.

use crate::discovery::DiscoverOptions;
use crate::error::{AppError, Result};
use crate::state::AppState;
use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Deserialize)]
pub struct SearchRequest {
    /// Natural-language description of what the agent wants to do
    pub query: String,
    /// Number of results (default: `DEFAULT_TOP_K`, capped at `MAX_TOP_K`)
    #[serde(default)]
    pub top_k: Option<usize>,
    #[serde(default)]
    pub min_score: Option<f64>,
    /// Only return actions of this connector
    #[serde(default)]
    pub connector: Option<String>,
    /// Only return actions reachable through these linked accounts
    #[serde(default)]
    pub account_ids: Option<Vec<String>>,
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub results: Vec<SearchResult>,
}

#[derive(Debug, Serialize)]
pub struct SearchResult {
    pub name: String,
    /// Relevance score in [0, 1], higher is better
    pub score: f64,
    pub description: String,
}

/// POST /search - Find actions relevant to a natural language query.
pub async fn search_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SearchRequest>,
) -> Result<Json<SearchResponse>> {
    let start_time = std::time::Instant::now();

    if request.query.trim().is_empty() {
        return Err(AppError::ValidationError(
            "Query cannot be empty".to_string(),
        ));
    }

    let top_k = request.top_k.unwrap_or(state.config.default_top_k);
    if top_k == 0 {
        return Err(AppError::ValidationError(
            "top_k must be at least 1".to_string(),
        ));
    }
    let top_k = top_k.min(state.config.max_top_k);

    let options = DiscoverOptions {
        limit: top_k,
        min_score: request.min_score.unwrap_or(state.config.min_score),
        connector: request.connector.clone(),
        account_ids: request.account_ids.clone(),
    };

    let toolset = Arc::clone(&state.toolset);
    let query = request.query.clone();
    let results = tokio::task::spawn_blocking(move || {
        toolset
            .discover_with(&query, &options)
            .into_iter()
            .map(|hit| SearchResult {
                description: toolset
                    .get(&hit.name)
                    .map(|a| a.description.clone())
                    .unwrap_or_default(),
                name: hit.name,
                score: hit.score,
            })
            .collect::<Vec<_>>()
    })
    .await
    .map_err(|e| AppError::ResourceError(format!("Search task join error: {}", e)))?;

    let total_time = start_time.elapsed();
    tracing::info!(
        query = %request.query,
        top_k,
        hits = results.len(),
        total_ms = total_time.as_millis() as u64,
        "Search completed"
    );

    metrics::counter!("search_requests_total").increment(1);
    metrics::histogram!("search_latency_ms").record(total_time.as_secs_f64() * 1000.0);

    Ok(Json(SearchResponse { results }))
}
