//! Integration tests for the actiondex HTTP surface.
//!
//! Every test builds its own state from the fixture catalog in
//! `tests/data/catalog.json`, so no environment setup is needed.

use actiondex::{handlers, load_catalog_file, AppState, Config, LinkedAccount};
use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use tower::ServiceExt;

fn fixture_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/data/catalog.json")
}

fn test_state(config: Config) -> Arc<AppState> {
    let catalog = load_catalog_file(&fixture_path()).expect("Failed to load fixture catalog");
    Arc::new(AppState::from_catalog(catalog, config).expect("Failed to create AppState"))
}

fn create_test_app(state: Arc<AppState>) -> Router {
    handlers::router(state)
}

fn default_app() -> Router {
    create_test_app(test_state(Config::default()))
}

/// Helper to make a JSON request to the router.
async fn json_request(
    app: Router,
    method: &str,
    uri: &str,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let req = match method {
        "GET" => Request::builder()
            .method("GET")
            .uri(uri)
            .body(Body::empty())
            .unwrap(),
        "POST" => Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.unwrap_or(json!({})).to_string()))
            .unwrap(),
        _ => panic!("Unsupported method"),
    };

    let response = app.oneshot(req).await.unwrap();
    let status = response.status();

    let body_bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body: Value = serde_json::from_slice(&body_bytes).unwrap_or(json!({}));

    (status, body)
}

fn result_names(body: &Value) -> Vec<String> {
    body["results"]
        .as_array()
        .expect("results should be an array")
        .iter()
        .map(|r| r["name"].as_str().unwrap().to_string())
        .collect()
}

// ============================================================================
// Health Endpoint Tests
// ============================================================================

#[tokio::test]
async fn test_health_endpoint_returns_200() {
    let (status, body) = json_request(default_app(), "GET", "/health", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["actions"], 6);
}

#[tokio::test]
async fn test_ready_after_warmup() {
    let (status, body) = json_request(default_app(), "GET", "/ready", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ready");
}

// ============================================================================
// Search Tests
// ============================================================================

#[tokio::test]
async fn test_search_empty_query_returns_400() {
    let (status, body) =
        json_request(default_app(), "POST", "/search", Some(json!({ "query": "" }))).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("empty"));
    assert_eq!(body["code"], 400);
}

#[tokio::test]
async fn test_search_zero_top_k_returns_400() {
    let (status, body) = json_request(
        default_app(),
        "POST",
        "/search",
        Some(json!({ "query": "employees", "top_k": 0 })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("top_k"));
}

#[tokio::test]
async fn test_search_intent_finds_terminate() {
    let (status, body) = json_request(
        default_app(),
        "POST",
        "/search",
        Some(json!({ "query": "fire someone", "top_k": 3 })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let names = result_names(&body);
    assert_eq!(names[0], "hris_terminate_employee");
    assert!(names.len() <= 3);
    assert!(body["results"][0]["description"]
        .as_str()
        .unwrap()
        .contains("Terminate"));
}

#[tokio::test]
async fn test_search_scores_are_descending() {
    let (status, body) = json_request(
        default_app(),
        "POST",
        "/search",
        Some(json!({ "query": "employee record", "top_k": 10 })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let scores: Vec<f64> = body["results"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["score"].as_f64().unwrap())
        .collect();
    assert!(!scores.is_empty());
    for pair in scores.windows(2) {
        assert!(pair[0] >= pair[1], "scores not sorted: {:?}", scores);
    }
}

#[tokio::test]
async fn test_search_connector_filter() {
    let (status, body) = json_request(
        default_app(),
        "POST",
        "/search",
        Some(json!({ "query": "list", "connector": "ATS" })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(result_names(&body), vec!["ats_list_jobs".to_string()]);
}

#[tokio::test]
async fn test_search_no_overlap_is_empty() {
    let (status, body) = json_request(
        default_app(),
        "POST",
        "/search",
        Some(json!({ "query": "quantum chromodynamics" })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert!(result_names(&body).is_empty());
}

#[tokio::test]
async fn test_search_top_k_capped_by_config() {
    let config = Config {
        max_top_k: 2,
        default_top_k: 2,
        ..Config::default()
    };
    let app = create_test_app(test_state(config));
    let (status, body) = json_request(
        app,
        "POST",
        "/search",
        Some(json!({ "query": "employee", "top_k": 10 })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(result_names(&body).len(), 2);
}

// ============================================================================
// Execute Tests
// ============================================================================

#[tokio::test]
async fn test_execute_resolves_request() {
    let (status, body) = json_request(
        default_app(),
        "POST",
        "/execute",
        Some(json!({
            "name": "hris_get_employee",
            "arguments": { "id": "42" },
            "account_id": "acct-1"
        })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["action"], "hris_get_employee");
    assert_eq!(body["request"]["method"], "GET");
    assert_eq!(
        body["request"]["url"],
        "https://api.example.com/unified/hris/employees/42"
    );
    assert_eq!(body["request"]["headers"]["x-account-id"], "acct-1");
    assert!(body["request"].get("body").is_none());
}

#[tokio::test]
async fn test_execute_uses_configured_account_and_defaults() {
    let config = Config {
        account_id: Some("acct-default".to_string()),
        ..Config::default()
    };
    let app = create_test_app(test_state(config));
    let (status, body) = json_request(
        app,
        "POST",
        "/execute",
        Some(json!({ "name": "hris_list_employees" })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["request"]["headers"]["x-account-id"], "acct-default");
    assert_eq!(body["request"]["query"]["page_size"], "25");
    assert_eq!(
        body["url"],
        "https://api.example.com/unified/hris/employees?page_size=25"
    );
}

#[tokio::test]
async fn test_execute_body_parameters() {
    let (status, body) = json_request(
        default_app(),
        "POST",
        "/execute",
        Some(json!({
            "name": "hris_terminate_employee",
            "arguments": { "id": "7", "reason": "restructuring" },
            "account_id": "acct-1"
        })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["request"]["method"], "POST");
    assert_eq!(body["request"]["body"], json!({ "reason": "restructuring" }));
    assert_eq!(body["request"]["body_type"], "json");
}

#[tokio::test]
async fn test_execute_missing_account_returns_400() {
    let (status, body) = json_request(
        default_app(),
        "POST",
        "/execute",
        Some(json!({ "name": "hris_get_employee", "arguments": { "id": "42" } })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("x-account-id"));
}

#[tokio::test]
async fn test_execute_missing_parameter_returns_400() {
    let (status, body) = json_request(
        default_app(),
        "POST",
        "/execute",
        Some(json!({ "name": "hris_delete_employee" })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("id"));
}

#[tokio::test]
async fn test_execute_unknown_parameter_returns_400() {
    let (status, body) = json_request(
        default_app(),
        "POST",
        "/execute",
        Some(json!({ "name": "ats_list_jobs", "arguments": { "colour": "blue" } })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("colour"));
}

#[tokio::test]
async fn test_execute_disallowed_enum_value_returns_400() {
    let (status, _) = json_request(
        default_app(),
        "POST",
        "/execute",
        Some(json!({ "name": "ats_list_jobs", "arguments": { "status": "archived" } })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_execute_unknown_action_returns_404() {
    let (status, body) = json_request(
        default_app(),
        "POST",
        "/execute",
        Some(json!({ "name": "hris_teleport_employee" })),
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], 404);
}

// ============================================================================
// Filtering Tests
// ============================================================================

#[tokio::test]
async fn test_action_filter_limits_working_set() {
    let config = Config {
        action_filter: vec!["hris_*".to_string(), "!hris_delete_*".to_string()],
        ..Config::default()
    };
    let state = test_state(config);

    let (status, body) =
        json_request(create_test_app(Arc::clone(&state)), "GET", "/actions", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 3);
    assert_eq!(body["connectors"], json!(["hris"]));

    let (status, _) = json_request(
        create_test_app(state),
        "POST",
        "/execute",
        Some(json!({ "name": "hris_delete_employee", "arguments": { "id": "1" } })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_actions_expose_input_schemas() {
    let (status, body) = json_request(default_app(), "GET", "/actions", None).await;

    assert_eq!(status, StatusCode::OK);
    let jobs = body["actions"]
        .as_array()
        .unwrap()
        .iter()
        .find(|a| a["name"] == "ats_list_jobs")
        .unwrap();
    assert_eq!(jobs["input_schema"]["type"], "object");
    assert_eq!(jobs["input_schema"]["required"], json!([]));
}

// ============================================================================
// Meta-tool Tests
// ============================================================================

#[tokio::test]
async fn test_meta_tool_definitions() {
    let (status, body) = json_request(default_app(), "GET", "/tools", None).await;

    assert_eq!(status, StatusCode::OK);
    let names: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["name"].as_str().unwrap())
        .collect();
    assert_eq!(
        names,
        vec!["tool_search", "tool_execute", "meta_collect_tool_feedback"]
    );
}

#[tokio::test]
async fn test_feedback_meta_tool_resolves_post() {
    let config = Config {
        feedback_url: "https://feedback.example.com/ai/tool-feedback".to_string(),
        ..Config::default()
    };
    let (status, body) = json_request(
        create_test_app(test_state(config)),
        "POST",
        "/tools/meta_collect_tool_feedback",
        Some(json!({
            "feedback": "Found the right tool first time",
            "account_id": "acct-1",
            "tool_names": ["hris_list_employees", "  "]
        })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["request"]["method"], "POST");
    assert_eq!(
        body["request"]["url"],
        "https://feedback.example.com/ai/tool-feedback"
    );
    assert_eq!(body["request"]["body"]["tool_names"], json!(["hris_list_employees"]));
}

#[tokio::test]
async fn test_feedback_meta_tool_rejects_blank_feedback() {
    let (status, body) = json_request(
        default_app(),
        "POST",
        "/tools/meta_collect_tool_feedback",
        Some(json!({ "feedback": " ", "account_id": "acct-1", "tool_names": ["x"] })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("non-empty"));
}

#[tokio::test]
async fn test_meta_tool_search_and_execute() {
    let state = test_state(Config::default());

    let (status, body) = json_request(
        create_test_app(Arc::clone(&state)),
        "POST",
        "/tools/tool_search",
        Some(json!({ "query": "open job postings", "limit": 1 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["tools"][0]["name"], "ats_list_jobs");

    let (status, body) = json_request(
        create_test_app(state),
        "POST",
        "/tools/tool_execute",
        Some(json!({ "toolName": "ats_list_jobs", "params": { "status": "closed" } })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["request"]["query"]["status"], "closed");
}

#[tokio::test]
async fn test_unknown_meta_tool_returns_400() {
    let (status, _) =
        json_request(default_app(), "POST", "/tools/tool_delete", Some(json!({}))).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

// ============================================================================
// Startup Tests
// ============================================================================

#[tokio::test]
async fn test_state_loads_catalog_from_config_path() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    let raw = std::fs::read_to_string(fixture_path()).unwrap();
    file.write_all(raw.as_bytes()).unwrap();

    let config = Config {
        catalog_path: file.path().to_path_buf(),
        action_filter: vec!["crm_*".to_string()],
        ..Config::default()
    };
    let state = AppState::new(config).unwrap();

    assert!(state.is_ready());
    assert_eq!(state.toolset.action_names(), vec!["crm_create_contact"]);
}

#[tokio::test]
async fn test_provider_filter_limits_working_set() {
    let config = Config {
        providers: vec!["ATS".to_string(), "crm".to_string()],
        ..Config::default()
    };
    let state = test_state(config);

    assert_eq!(
        state.toolset.action_names(),
        vec!["ats_list_jobs", "crm_create_contact"]
    );
}

#[tokio::test]
async fn test_linked_accounts_scope_search_and_execute() {
    let config = Config {
        linked_accounts: vec![
            LinkedAccount::new("acct-hris").with_connectors(["hris"]),
            LinkedAccount::new("acct-ats").with_connectors(["ats"]),
        ],
        ..Config::default()
    };
    let state = test_state(config);
    assert!(!state
        .toolset
        .action_names()
        .contains(&"crm_create_contact".to_string()));

    let (status, body) = json_request(
        create_test_app(Arc::clone(&state)),
        "POST",
        "/search",
        Some(json!({ "query": "list", "top_k": 10, "account_ids": ["acct-ats"] })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(result_names(&body), vec!["ats_list_jobs"]);

    let (status, body) = json_request(
        create_test_app(state),
        "POST",
        "/execute",
        Some(json!({ "name": "hris_list_employees" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["request"]["headers"]["x-account-id"], "acct-hris");
}

#[tokio::test]
async fn test_state_rejects_missing_catalog() {
    let dir = tempfile::tempdir().unwrap();
    let config = Config {
        catalog_path: dir.path().join("missing.json"),
        ..Config::default()
    };

    assert!(AppState::new(config).is_err());
}
