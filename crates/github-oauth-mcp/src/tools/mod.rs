//! MCP tool implementations.
//!
//! Each tool:
//! 1. Checks authentication state with the OAuth handler
//! 2. Parses and validates input parameters
//! 3. Calls the GitHub API client
//! 4. Formats results as JSON

mod analysis;
mod github;

pub use analysis::*;
pub use github::*;

use std::sync::Arc;

use tokio::sync::RwLock;

use crate::client::GitHubClient;
use crate::config::Config;
use crate::error::ToolResult;
use crate::metrics::Metrics;
use crate::oauth::OAuthHandler;

/// Capabilities negotiated with the client at `initialize` time.
///
/// An explicit set, not runtime introspection: a tool that needs a
/// capability checks here and refuses when it was never negotiated.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClientCapabilities {
    /// Client can service LLM sampling requests.
    pub sampling: bool,
}

/// Tool execution context.
pub struct ToolContext {
    /// GitHub API client.
    pub github: Arc<GitHubClient>,

    /// OAuth flow handler.
    pub oauth: Arc<OAuthHandler>,

    /// Server configuration.
    pub config: Arc<Config>,

    /// Tool-call counters.
    pub metrics: Arc<Metrics>,

    capabilities: Arc<RwLock<ClientCapabilities>>,
}

impl ToolContext {
    /// Create a new tool context.
    #[must_use]
    pub fn new(
        github: Arc<GitHubClient>,
        oauth: Arc<OAuthHandler>,
        config: Arc<Config>,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            github,
            oauth,
            config,
            metrics,
            capabilities: Arc::new(RwLock::new(ClientCapabilities::default())),
        }
    }

    /// Record the capability set from the client's `initialize` request.
    pub async fn set_capabilities(&self, capabilities: ClientCapabilities) {
        *self.capabilities.write().await = capabilities;
    }

    /// The negotiated capability set.
    pub async fn capabilities(&self) -> ClientCapabilities {
        *self.capabilities.read().await
    }
}

impl std::fmt::Debug for ToolContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolContext").finish()
    }
}

/// Trait for MCP tools.
#[async_trait::async_trait]
pub trait McpTool: Send + Sync {
    /// Tool name (e.g., "get_github_user_info").
    fn name(&self) -> &'static str;

    /// Tool description for the LLM.
    fn description(&self) -> &'static str;

    /// JSON Schema for input parameters.
    fn input_schema(&self) -> serde_json::Value;

    /// Execute the tool with given input.
    async fn execute(&self, ctx: &ToolContext, input: serde_json::Value) -> ToolResult<String>;
}

/// Register all tools.
#[must_use]
pub fn register_all_tools() -> Vec<Box<dyn McpTool>> {
    vec![
        Box::new(github::UserInfoTool),
        Box::new(analysis::RepositoryAnalysisTool),
        Box::new(analysis::CodeAnalysisTool),
    ]
}
