//! Stdio transport for the MCP protocol.
//!
//! Handles JSON-RPC 2.0 over stdin/stdout. The OAuth callback still
//! requires the HTTP listener; stdio clients receive the structured
//! authorization error and complete the flow out of band.

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use crate::tools::{McpTool, ToolContext};

use super::transport::{
    JsonRpcRequest, JsonRpcResponse, handle_initialize, handle_prompts_get, handle_prompts_list,
    handle_tools_call, handle_tools_list,
};

/// Handle MCP protocol over stdio.
pub async fn run_stdio(tools: Vec<Box<dyn McpTool>>, ctx: ToolContext) -> anyhow::Result<()> {
    let stdin = tokio::io::stdin();
    let mut stdout = tokio::io::stdout();
    let mut reader = BufReader::new(stdin);
    let mut line = String::new();

    tracing::info!("MCP stdio server ready, waiting for requests...");

    loop {
        line.clear();
        let bytes_read = reader.read_line(&mut line).await?;

        if bytes_read == 0 {
            // EOF
            tracing::info!("Stdin closed, shutting down");
            break;
        }

        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        // Parse JSON-RPC request
        let request: JsonRpcRequest = match serde_json::from_str(trimmed) {
            Ok(req) => req,
            Err(e) => {
                let error_response =
                    JsonRpcResponse::error(None, -32700, format!("Parse error: {e}"));
                let response_json = serde_json::to_string(&error_response)?;
                stdout.write_all(response_json.as_bytes()).await?;
                stdout.write_all(b"\n").await?;
                stdout.flush().await?;
                continue;
            }
        };

        tracing::debug!(method = %request.method, "Received request");

        // Handle request
        let response = handle_request(&request, &tools, &ctx).await;

        // Write response
        let response_json = serde_json::to_string(&response)?;
        stdout.write_all(response_json.as_bytes()).await?;
        stdout.write_all(b"\n").await?;
        stdout.flush().await?;
    }

    Ok(())
}

async fn handle_request(
    req: &JsonRpcRequest,
    tools: &[Box<dyn McpTool>],
    ctx: &ToolContext,
) -> JsonRpcResponse {
    match req.method.as_str() {
        "initialize" => handle_initialize(req.id.clone(), &req.params, ctx).await,
        "notifications/initialized" | "initialized" => {
            JsonRpcResponse::success(req.id.clone(), serde_json::json!({}))
        }
        "tools/list" => handle_tools_list(req.id.clone(), tools),
        "tools/call" => handle_tools_call(req.id.clone(), &req.params, tools, ctx).await,
        "prompts/list" => handle_prompts_list(req.id.clone()),
        "prompts/get" => handle_prompts_get(req.id.clone(), &req.params),
        "ping" => JsonRpcResponse::success(req.id.clone(), serde_json::json!({})),
        _ => JsonRpcResponse::error(
            req.id.clone(),
            -32601,
            format!("Method not found: {}", req.method),
        ),
    }
}
