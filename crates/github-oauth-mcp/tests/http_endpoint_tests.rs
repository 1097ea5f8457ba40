//! Integration tests for the HTTP route layer: OAuth endpoints, RFC 8414
//! metadata, health/metrics/info, and the MCP JSON-RPC endpoint.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::json;
use tower::ServiceExt;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use github_oauth_mcp::client::GitHubClient;
use github_oauth_mcp::config::Config;
use github_oauth_mcp::metrics::Metrics;
use github_oauth_mcp::oauth::{OAuthHandler, SessionStore};
use github_oauth_mcp::server::transport::create_router;
use github_oauth_mcp::tools::{self, ToolContext};

const TOKEN_PATH: &str = "/login/oauth/access_token";
const PORT: u16 = 8080;

fn build_router(config: Config, sessions: SessionStore) -> axum::Router {
    let github = Arc::new(GitHubClient::new(&config).unwrap());
    let oauth = Arc::new(OAuthHandler::new(config.clone()).unwrap());
    let ctx = ToolContext::new(github, oauth, Arc::new(config), Arc::new(Metrics::new()));

    create_router(tools::register_all_tools(), ctx, sessions, PORT)
}

fn test_router() -> axum::Router {
    build_router(Config::for_testing("http://unused.localhost"), SessionStore::new())
}

async fn get(app: &axum::Router, uri: &str) -> (StatusCode, String) {
    let response =
        app.clone().oneshot(Request::get(uri).body(Body::empty()).unwrap()).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, String::from_utf8(body.to_vec()).unwrap())
}

async fn get_json(app: &axum::Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let (status, body) = get(app, uri).await;
    (status, serde_json::from_str(&body).unwrap())
}

async fn rpc(app: &axum::Router, request: serde_json::Value) -> serde_json::Value {
    let response = app
        .clone()
        .oneshot(
            Request::post("/mcp")
                .header("Content-Type", "application/json")
                .body(Body::from(request.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&body).unwrap()
}

// ─── RFC 8414 metadata ───────────────────────────────────────────────────────

#[tokio::test]
async fn test_authorization_server_metadata() {
    let mut config = Config::for_testing("http://unused.localhost");
    config.oauth_scopes = "read:user,repo".to_string();
    let app = build_router(config, SessionStore::new());

    let (status, json) = get_json(&app, "/.well-known/oauth-authorization-server").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["scopes_supported"], json!(["read:user", "repo"]));
    assert_eq!(json["code_challenge_methods_supported"], json!(["S256"]));
    assert_eq!(json["response_types_supported"], json!(["code"]));
    assert_eq!(json["grant_types_supported"], json!(["authorization_code", "refresh_token"]));
    assert!(json["authorization_endpoint"].as_str().unwrap().ends_with("/login/oauth/authorize"));
    assert!(json["token_endpoint"].as_str().unwrap().ends_with(TOKEN_PATH));
}

// ─── /oauth/authorize ────────────────────────────────────────────────────────

#[tokio::test]
async fn test_authorize_redirects_with_pkce_parameters() {
    let sessions = SessionStore::new();
    let app = build_router(Config::for_testing("http://unused.localhost"), sessions.clone());

    let response = app
        .clone()
        .oneshot(Request::get("/oauth/authorize").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FOUND);

    let location = response.headers().get("Location").unwrap().to_str().unwrap();
    assert!(location.starts_with("http://unused.localhost/login/oauth/authorize?"));

    let query: HashMap<String, String> =
        serde_urlencoded::from_str(location.split_once('?').unwrap().1).unwrap();
    assert_eq!(query["client_id"], "test_client_id");
    assert_eq!(query["response_type"], "code");
    assert_eq!(query["code_challenge_method"], "S256");
    assert!(!query["state"].is_empty());
    assert!(!query["code_challenge"].is_empty());

    // A pending session was recorded under the redirected state
    assert_eq!(sessions.len().await, 1);
    assert!(sessions.resolve_and_delete(&query["state"]).await.is_some());
}

#[tokio::test]
async fn test_authorize_requires_configuration() {
    let app = build_router(Config::default(), SessionStore::new());

    let (status, body) = get(&app, "/oauth/authorize").await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert!(body.contains("OAuth is not configured"));
}

// ─── /oauth/callback ─────────────────────────────────────────────────────────

#[tokio::test]
async fn test_callback_with_upstream_error_skips_token_endpoint() {
    let server = MockServer::start().await;

    // The token endpoint must never be contacted on an upstream error.
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let app = build_router(Config::for_testing(&server.uri()), SessionStore::new());

    let (status, body) = get(&app, "/oauth/callback?error=access_denied").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("access_denied"));
    // Distinct wording from the session/state failure
    assert!(!body.contains("expired"));
}

#[tokio::test]
async fn test_callback_with_missing_parameters() {
    let app = test_router();

    let (status, body) = get(&app, "/oauth/callback?code=abc").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("Missing authorization code or state"));
}

#[tokio::test]
async fn test_callback_with_unknown_state() {
    let app = test_router();

    let (status, body) = get(&app, "/oauth/callback?code=abc&state=nope").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("Invalid or expired OAuth session"));
}

#[tokio::test]
async fn test_callback_success_masks_token() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "gho_secretsecret12345678",
            "refresh_token": "ghr_refresh",
            "token_type": "bearer",
            "scope": "read:user"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let sessions = SessionStore::new();
    sessions.create("state_1", "verifier_1", Duration::from_secs(600)).await;

    let app = build_router(Config::for_testing(&server.uri()), sessions.clone());

    let (status, body) = get(&app, "/oauth/callback?code=abc&state=state_1").await;

    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("***12345678"));
    assert!(!body.contains("gho_secretsecret12345678"));
    assert!(!body.contains("ghr_refresh"));
    assert!(body.contains("read:user"));

    // The session was consumed; a replayed callback fails
    let (status, body) = get(&app, "/oauth/callback?code=abc&state=state_1").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("Invalid or expired OAuth session"));
}

#[tokio::test]
async fn test_callback_surfaces_exchange_rejection() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "error": "bad_verification_code",
            "error_description": "The code passed is incorrect or expired."
        })))
        .mount(&server)
        .await;

    let sessions = SessionStore::new();
    sessions.create("state_1", "verifier_1", Duration::from_secs(600)).await;

    let app = build_router(Config::for_testing(&server.uri()), sessions);

    let (status, body) = get(&app, "/oauth/callback?code=stale&state=state_1").await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body.contains("bad_verification_code"));
}

// ─── Health / metrics / info ─────────────────────────────────────────────────

#[tokio::test]
async fn test_health_endpoint() {
    let app = test_router();

    let (status, json) = get_json(&app, "/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["server"], "github-oauth-mcp");
    assert!(json["uptime_seconds"].as_f64().unwrap() >= 0.0);
    assert!(json["timestamp"].as_str().unwrap().ends_with('Z'));
}

#[tokio::test]
async fn test_metrics_endpoint_counts_tool_calls() {
    let app = test_router();

    let (_, json) = get_json(&app, "/metrics").await;
    assert_eq!(json["tool_calls"]["total"], 0);
    assert_eq!(json["tool_calls"]["by_tool"], serde_json::json!({}));

    // An unauthenticated tool call still counts as a call
    rpc(
        &app,
        json!({"jsonrpc": "2.0", "method": "tools/call", "id": 1,
               "params": {"name": "get_github_user_info", "arguments": {}}}),
    )
    .await;

    let (_, json) = get_json(&app, "/metrics").await;
    assert_eq!(json["tool_calls"]["total"], 1);
    assert_eq!(json["tool_calls"]["by_tool"]["get_github_user_info"], 1);
}

#[tokio::test]
async fn test_info_endpoint() {
    let app = test_router();

    let (status, json) = get_json(&app, "/info").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["server"]["name"], "github-oauth-mcp");
    assert_eq!(json["server"]["environment"], "test");
    assert_eq!(json["oauth"]["configured"], true);
    assert_eq!(json["oauth"]["provider"], "GitHub");
    assert_eq!(json["oauth"]["scopes"], json!(["read:user"]));
    assert_eq!(json["http"]["port"], PORT);
    assert!(json["api"].get("base_url").is_some());
}

// ─── MCP JSON-RPC ────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_mcp_initialize() {
    let app = test_router();

    let response =
        rpc(&app, json!({"jsonrpc": "2.0", "method": "initialize", "id": 1, "params": {}})).await;

    assert_eq!(response["result"]["serverInfo"]["name"], "github-oauth-mcp");
    assert!(response["result"]["capabilities"]["tools"].is_object());
}

#[tokio::test]
async fn test_mcp_tools_list() {
    let app = test_router();

    let response =
        rpc(&app, json!({"jsonrpc": "2.0", "method": "tools/list", "id": 2, "params": {}})).await;

    let names: Vec<&str> = response["result"]["tools"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["name"].as_str().unwrap())
        .collect();

    assert!(names.contains(&"get_github_user_info"));
    assert!(names.contains(&"analyze_repository"));
    assert!(names.contains(&"analyze_code"));
}

#[tokio::test]
async fn test_unauthenticated_tool_call_returns_bootstrap_metadata() {
    let app = test_router();

    let response = rpc(
        &app,
        json!({"jsonrpc": "2.0", "method": "tools/call", "id": 3,
               "params": {"name": "get_github_user_info", "arguments": {}}}),
    )
    .await;

    let error = &response["error"];
    assert_eq!(error["code"], -32001);
    assert_eq!(error["message"], "Authentication required");

    // Everything an automated client needs to self-initiate the flow
    let data = &error["data"];
    assert_eq!(data["type"], "oauth2");
    assert_eq!(data["grant_type"], "authorization_code");
    assert_eq!(data["code_challenge_method"], "S256");
    assert!(data["authorization_url"].as_str().unwrap().contains("/login/oauth/authorize"));
    assert!(data["token_url"].as_str().unwrap().contains(TOKEN_PATH));
    assert!(data["scopes"].is_array());
    assert!(data["resource"].as_str().is_some());
}

#[tokio::test]
async fn test_sampling_tool_refused_without_capability() {
    let app = test_router();

    rpc(&app, json!({"jsonrpc": "2.0", "method": "initialize", "id": 1, "params": {}})).await;

    let response = rpc(
        &app,
        json!({"jsonrpc": "2.0", "method": "tools/call", "id": 4,
               "params": {"name": "analyze_code", "arguments": {"code": "fn main() {}"}}}),
    )
    .await;

    assert!(response["error"]["message"].as_str().unwrap().contains("sampling"));
}

#[tokio::test]
async fn test_sampling_tool_runs_with_capability() {
    let app = test_router();

    rpc(
        &app,
        json!({"jsonrpc": "2.0", "method": "initialize", "id": 1,
               "params": {"capabilities": {"sampling": {}}}}),
    )
    .await;

    let response = rpc(
        &app,
        json!({"jsonrpc": "2.0", "method": "tools/call", "id": 5,
               "params": {"name": "analyze_code", "arguments": {"code": "fn main() {}"}}}),
    )
    .await;

    let text = response["result"]["content"][0]["text"].as_str().unwrap();
    let payload: serde_json::Value = serde_json::from_str(text).unwrap();
    assert_eq!(payload["analysis_type"], "explain");
    assert!(payload["prompt"].as_str().unwrap().contains("fn main()"));
}

#[tokio::test]
async fn test_tool_input_validation() {
    let app = test_router();

    let response = rpc(
        &app,
        json!({"jsonrpc": "2.0", "method": "tools/call", "id": 6,
               "params": {"name": "get_github_user_info", "arguments": {"repo_limit": 500}}}),
    )
    .await;

    assert_eq!(response["error"]["code"], -32602);
    assert!(response["error"]["message"].as_str().unwrap().contains("repo_limit"));
}

#[tokio::test]
async fn test_unknown_method() {
    let app = test_router();

    let response =
        rpc(&app, json!({"jsonrpc": "2.0", "method": "bogus/method", "id": 7, "params": {}})).await;

    assert_eq!(response["error"]["code"], -32601);
}

#[tokio::test]
async fn test_prompts_list_and_get() {
    let app = test_router();

    let response =
        rpc(&app, json!({"jsonrpc": "2.0", "method": "prompts/list", "id": 8, "params": {}})).await;
    assert_eq!(response["result"]["prompts"][0]["name"], "github_user_summary");

    let response = rpc(
        &app,
        json!({"jsonrpc": "2.0", "method": "prompts/get", "id": 9,
               "params": {"name": "github_user_summary", "arguments": {"username": "octocat"}}}),
    )
    .await;

    let text = response["result"]["messages"][0]["content"]["text"].as_str().unwrap();
    assert!(text.contains("octocat"));
    assert!(text.contains("get_github_user_info"));
}
