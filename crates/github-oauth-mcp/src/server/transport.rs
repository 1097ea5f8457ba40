//! HTTP transport for the MCP server.
//!
//! Hosts the JSON-RPC endpoint, the OAuth flow routes, and the
//! health/metrics/info endpoints on one axum router.

use std::borrow::Cow;
use std::sync::Arc;

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use super::routes;
use crate::error::ToolError;
use crate::metrics::utc_timestamp;
use crate::oauth::SessionStore;
use crate::tools::{ClientCapabilities, McpTool, ToolContext};

/// JSON-RPC 2.0 request.
#[derive(Debug, Clone, Deserialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
    #[serde(default)]
    pub id: Option<serde_json::Value>,
}

/// JSON-RPC 2.0 response.
#[derive(Debug, Clone, Serialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: Cow<'static, str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<serde_json::Value>,
}

/// JSON-RPC 2.0 error.
#[derive(Debug, Clone, Serialize)]
pub struct JsonRpcError {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl JsonRpcResponse {
    /// JSON-RPC version constant.
    const VERSION: &'static str = "2.0";

    #[must_use]
    pub fn success(id: Option<serde_json::Value>, result: serde_json::Value) -> Self {
        Self { jsonrpc: Cow::Borrowed(Self::VERSION), result: Some(result), error: None, id }
    }

    #[must_use]
    pub fn error(id: Option<serde_json::Value>, code: i32, message: impl Into<String>) -> Self {
        Self::error_with_data(id, code, message, None)
    }

    #[must_use]
    pub fn error_with_data(
        id: Option<serde_json::Value>,
        code: i32,
        message: impl Into<String>,
        data: Option<serde_json::Value>,
    ) -> Self {
        Self {
            jsonrpc: Cow::Borrowed(Self::VERSION),
            result: None,
            error: Some(JsonRpcError { code, message: message.into(), data }),
            id,
        }
    }
}

/// MCP tool info for tools/list response.
#[derive(Debug, Serialize)]
pub struct McpToolInfo {
    pub name: String,
    pub description: String,
    #[serde(rename = "inputSchema")]
    pub input_schema: serde_json::Value,
}

/// Shared state for HTTP handlers.
pub struct HttpState {
    pub tools: Vec<Box<dyn McpTool>>,
    pub ctx: ToolContext,
    pub sessions: SessionStore,
    /// Port the server is bound to, reported on `/info`.
    pub port: u16,
}

/// Create the HTTP router.
pub fn create_router(
    tools: Vec<Box<dyn McpTool>>,
    ctx: ToolContext,
    sessions: SessionStore,
    port: u16,
) -> Router {
    let state = Arc::new(HttpState { tools, ctx, sessions, port });

    Router::new()
        .route("/", get(health_check))
        .route("/health", get(health_check))
        .route("/metrics", get(metrics_endpoint))
        .route("/info", get(info_endpoint))
        .route("/mcp", post(handle_mcp_post))
        .route("/oauth/authorize", get(routes::handle_authorize))
        .route("/oauth/callback", get(routes::handle_callback))
        .route("/.well-known/oauth-authorization-server", get(routes::handle_oauth_metadata))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health_check(State(state): State<Arc<HttpState>>) -> impl IntoResponse {
    let uptime = state.ctx.metrics.uptime_seconds();
    Json(serde_json::json!({
        "status": "healthy",
        "server": state.ctx.config.server_name,
        "version": state.ctx.config.server_version,
        "uptime_seconds": (uptime * 100.0).round() / 100.0,
        "timestamp": utc_timestamp(),
    }))
}

async fn metrics_endpoint(State(state): State<Arc<HttpState>>) -> impl IntoResponse {
    let uptime = state.ctx.metrics.uptime_seconds();
    let snapshot = state.ctx.metrics.snapshot().await;
    Json(serde_json::json!({
        "server": state.ctx.config.server_name,
        "version": state.ctx.config.server_version,
        "uptime_seconds": (uptime * 100.0).round() / 100.0,
        "tool_calls": {
            "total": snapshot.total,
            "by_tool": snapshot.by_tool,
        },
        "timestamp": utc_timestamp(),
    }))
}

async fn info_endpoint(State(state): State<Arc<HttpState>>) -> impl IntoResponse {
    let config = &state.ctx.config;
    Json(serde_json::json!({
        "server": {
            "name": config.server_name,
            "version": config.server_version,
            "environment": config.environment,
            "debug": config.debug,
        },
        "oauth": {
            "configured": config.is_oauth_configured(),
            "provider": "GitHub",
            "scopes": config.scopes_list(),
            "resource_indicator": config.resource_indicator,
        },
        "http": {
            "host": "0.0.0.0",
            "port": state.port,
            "path": "/mcp",
        },
        "api": {
            "base_url": config.api_base_url,
            "timeout": config.api_timeout.as_secs(),
        },
        "timestamp": utc_timestamp(),
    }))
}

/// Handle POST requests to /mcp.
async fn handle_mcp_post(
    State(state): State<Arc<HttpState>>,
    Json(req): Json<JsonRpcRequest>,
) -> Response {
    tracing::debug!(method = %req.method, "Handling MCP request");

    let is_notification = req.id.is_none();

    let response = match req.method.as_str() {
        "initialize" => handle_initialize(req.id, &req.params, &state.ctx).await,
        "notifications/initialized" | "initialized" => {
            if is_notification {
                return StatusCode::ACCEPTED.into_response();
            }
            JsonRpcResponse::success(req.id, serde_json::json!({}))
        }
        "tools/list" => handle_tools_list(req.id, &state.tools),
        "tools/call" => handle_tools_call(req.id, &req.params, &state.tools, &state.ctx).await,
        "prompts/list" => handle_prompts_list(req.id),
        "prompts/get" => handle_prompts_get(req.id, &req.params),
        "ping" => JsonRpcResponse::success(req.id, serde_json::json!({})),
        "notifications/cancelled" => {
            if is_notification {
                return StatusCode::ACCEPTED.into_response();
            }
            JsonRpcResponse::success(req.id, serde_json::json!({}))
        }
        _ => {
            if is_notification {
                return StatusCode::ACCEPTED.into_response();
            }
            JsonRpcResponse::error(req.id, -32601, format!("Method not found: {}", req.method))
        }
    };

    Json(response).into_response()
}

/// Handle the `initialize` request.
///
/// Records the client's capability set; sampling-dependent tools check
/// it instead of probing the client at call time.
pub(super) async fn handle_initialize(
    id: Option<serde_json::Value>,
    params: &serde_json::Value,
    ctx: &ToolContext,
) -> JsonRpcResponse {
    let protocol_version =
        params.get("protocolVersion").and_then(|v| v.as_str()).unwrap_or("2024-11-05");

    let sampling = params
        .get("capabilities")
        .and_then(|c| c.get("sampling"))
        .is_some_and(|s| !s.is_null());

    ctx.set_capabilities(ClientCapabilities { sampling }).await;

    tracing::info!(protocol_version, sampling, "MCP initialize");

    JsonRpcResponse::success(
        id,
        serde_json::json!({
            "protocolVersion": protocol_version,
            "capabilities": {
                "tools": {
                    "listChanged": false
                },
                "prompts": {}
            },
            "serverInfo": {
                "name": ctx.config.server_name,
                "version": ctx.config.server_version
            }
        }),
    )
}

pub(super) fn handle_tools_list(
    id: Option<serde_json::Value>,
    tools: &[Box<dyn McpTool>],
) -> JsonRpcResponse {
    let tool_list: Vec<McpToolInfo> = tools
        .iter()
        .map(|t| McpToolInfo {
            name: t.name().to_string(),
            description: t.description().to_string(),
            input_schema: t.input_schema(),
        })
        .collect();

    JsonRpcResponse::success(
        id,
        serde_json::json!({
            "tools": tool_list
        }),
    )
}

pub(super) async fn handle_tools_call(
    id: Option<serde_json::Value>,
    params: &serde_json::Value,
    tools: &[Box<dyn McpTool>],
    ctx: &ToolContext,
) -> JsonRpcResponse {
    let Some(tool_name) = params.get("name").and_then(|v| v.as_str()) else {
        return JsonRpcResponse::error(id, -32602, "Missing 'name' parameter");
    };

    let arguments = params.get("arguments").cloned().unwrap_or(serde_json::json!({}));

    let Some(tool) = tools.iter().find(|t| t.name() == tool_name) else {
        return JsonRpcResponse::error(id, -32602, format!("Tool not found: {tool_name}"));
    };

    ctx.metrics.record(tool_name).await;

    tracing::info!(tool = %tool_name, "Executing tool");

    match tool.execute(ctx, arguments).await {
        Ok(result) => JsonRpcResponse::success(
            id,
            serde_json::json!({
                "content": [{
                    "type": "text",
                    "text": result
                }]
            }),
        ),
        Err(e) => {
            tracing::error!(tool = %tool_name, error = %e, "Tool execution failed");
            tool_error_response(id, &e)
        }
    }
}

/// Map a tool error onto the JSON-RPC error space.
///
/// Authorization failures carry the OAuth bootstrap metadata in `data`
/// so automated clients can start the flow without hardcoded endpoints.
fn tool_error_response(id: Option<serde_json::Value>, error: &ToolError) -> JsonRpcResponse {
    match error {
        ToolError::AuthorizationRequired { metadata } => JsonRpcResponse::error_with_data(
            id,
            metadata.get("code").and_then(serde_json::Value::as_i64).unwrap_or(-32001) as i32,
            metadata
                .get("message")
                .and_then(|m| m.as_str())
                .unwrap_or("Authentication required"),
            metadata.get("data").cloned(),
        ),
        ToolError::Validation { .. } => {
            JsonRpcResponse::error(id, -32602, error.to_user_message())
        }
        _ => JsonRpcResponse::error(id, -32000, error.to_user_message()),
    }
}

// ─── Prompts ─────────────────────────────────────────────────────────────────

const USER_SUMMARY_PROMPT: &str = "github_user_summary";

fn user_summary_text(username: &str) -> String {
    format!(
        "You are analyzing GitHub data for: {username}\n\n\
         Please use the 'get_github_user_info' tool to fetch user information and \
         repository data.\n\n\
         Based on the retrieved data, provide:\n\
         1. A brief summary of the user's profile\n\
         2. Top 5 most recently updated repositories\n\
         3. Programming languages most commonly used\n\
         4. Notable achievements or statistics\n\n\
         Format your response in a clear, readable markdown format."
    )
}

pub(super) fn handle_prompts_list(id: Option<serde_json::Value>) -> JsonRpcResponse {
    JsonRpcResponse::success(
        id,
        serde_json::json!({
            "prompts": [{
                "name": USER_SUMMARY_PROMPT,
                "description": "Generate a summary of a GitHub user's profile and repositories",
                "arguments": [{
                    "name": "username",
                    "description": "GitHub username to summarize (defaults to the authenticated user)",
                    "required": false
                }]
            }]
        }),
    )
}

pub(super) fn handle_prompts_get(
    id: Option<serde_json::Value>,
    params: &serde_json::Value,
) -> JsonRpcResponse {
    let name = params.get("name").and_then(|v| v.as_str()).unwrap_or_default();
    if name != USER_SUMMARY_PROMPT {
        return JsonRpcResponse::error(id, -32602, format!("Prompt not found: {name}"));
    }

    let username = params
        .get("arguments")
        .and_then(|a| a.get("username"))
        .and_then(|u| u.as_str())
        .unwrap_or("authenticated user");

    JsonRpcResponse::success(
        id,
        serde_json::json!({
            "description": "Generate a summary of a GitHub user's profile and repositories",
            "messages": [{
                "role": "user",
                "content": {
                    "type": "text",
                    "text": user_summary_text(username)
                }
            }]
        }),
    )
}
