//! LLM-analysis tools built on the client's sampling capability.
//!
//! The server cannot run a model itself; these tools gather context and
//! return a composed sampling request for the client LLM to execute.
//! Both refuse to run unless the `sampling` capability was negotiated
//! at initialize time.

use serde::Deserialize;
use serde_json::json;

use super::github::{readme_or_empty, require_bearer_token};
use super::{McpTool, ToolContext};
use crate::error::{ToolError, ToolResult};

/// Longest README excerpt included in an analysis context.
const README_EXCERPT_LIMIT: usize = 4000;

const REPO_ANALYSIS_TYPES: &[&str] = &["overview", "tech_stack", "architecture", "security"];

const CODE_ANALYSIS_TYPES: &[&str] =
    &["explain", "review", "suggest_improvements", "find_bugs", "security_review"];

async fn require_sampling(ctx: &ToolContext) -> ToolResult<()> {
    if ctx.capabilities().await.sampling { Ok(()) } else { Err(ToolError::capability("sampling")) }
}

fn repo_analysis_prompt(analysis_type: &str) -> &'static str {
    match analysis_type {
        "tech_stack" => {
            "Identify the technology stack of this repository: languages, frameworks, \
             and notable dependencies."
        }
        "architecture" => {
            "Describe the architecture of this repository: main components, how they \
             interact, and any notable design patterns."
        }
        "security" => {
            "Review this repository's description, README, and language profile for \
             potential security concerns."
        }
        _ => "Provide a concise overview of this repository: purpose, maturity, and activity.",
    }
}

fn code_analysis_prompt(analysis_type: &str) -> &'static str {
    match analysis_type {
        "review" => "Please review this code and provide constructive feedback:",
        "suggest_improvements" => "Please suggest improvements for this code:",
        "find_bugs" => "Please analyze this code for potential bugs or issues:",
        "security_review" => "Please review this code for security vulnerabilities:",
        _ => "Please explain what this code does in clear, simple terms:",
    }
}

fn default_repo_analysis_type() -> String {
    "overview".to_string()
}

#[derive(Debug, Deserialize)]
struct RepositoryAnalysisInput {
    repo_owner: String,
    repo_name: String,
    #[serde(default = "default_repo_analysis_type")]
    analysis_type: String,
}

/// Repository analysis via client-side sampling.
pub struct RepositoryAnalysisTool;

#[async_trait::async_trait]
impl McpTool for RepositoryAnalysisTool {
    fn name(&self) -> &'static str {
        "analyze_repository"
    }

    fn description(&self) -> &'static str {
        "Gather a repository's metadata, README, and language profile, and compose \
         an analysis request for the client LLM. Requires OAuth authentication and \
         the 'sampling' client capability."
    }

    fn input_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "repo_owner": {
                    "type": "string",
                    "description": "Repository owner (user or organization)"
                },
                "repo_name": {
                    "type": "string",
                    "description": "Repository name"
                },
                "analysis_type": {
                    "type": "string",
                    "enum": REPO_ANALYSIS_TYPES,
                    "default": "overview"
                }
            },
            "required": ["repo_owner", "repo_name"]
        })
    }

    async fn execute(&self, ctx: &ToolContext, input: serde_json::Value) -> ToolResult<String> {
        let params: RepositoryAnalysisInput = serde_json::from_value(input)?;

        if !REPO_ANALYSIS_TYPES.contains(&params.analysis_type.as_str()) {
            return Err(ToolError::validation(
                "analysis_type",
                format!("must be one of: {}", REPO_ANALYSIS_TYPES.join(", ")),
            ));
        }
        if params.repo_owner.is_empty() || params.repo_name.is_empty() {
            return Err(ToolError::validation("repo_owner", "owner and name are required"));
        }

        require_sampling(ctx).await?;
        let token = require_bearer_token(ctx).await?;

        let repo =
            ctx.github.get_repository(&token, &params.repo_owner, &params.repo_name).await?;
        let readme = readme_or_empty(ctx, &token, &params.repo_owner, &params.repo_name).await?;
        let languages = ctx
            .github
            .get_repository_languages(&token, &params.repo_owner, &params.repo_name)
            .await?;

        let full_name = repo
            .full_name
            .clone()
            .unwrap_or_else(|| format!("{}/{}", params.repo_owner, params.repo_name));

        let readme_excerpt: String = readme.chars().take(README_EXCERPT_LIMIT).collect();

        tracing::info!(repository = %full_name, analysis_type = %params.analysis_type,
            "Composed repository analysis request");

        let prompt = repo_analysis_prompt(&params.analysis_type);
        let result = json!({
            "repository": full_name,
            "analysis_type": params.analysis_type,
            "context": {
                "description": repo.description,
                "language": repo.language,
                "stars": repo.stargazers_count.unwrap_or(0),
                "forks": repo.forks_count.unwrap_or(0),
                "topics": repo.topics,
                "languages": languages,
                "readme": readme_excerpt,
            },
            "prompt": prompt,
            "data_sources": ["GitHub API"],
        });

        Ok(serde_json::to_string_pretty(&result)?)
    }
}

fn default_code_analysis_type() -> String {
    "explain".to_string()
}

fn default_max_tokens() -> i64 {
    500
}

#[derive(Debug, Deserialize)]
struct CodeAnalysisInput {
    code: String,
    #[serde(default = "default_code_analysis_type")]
    analysis_type: String,
    #[serde(default = "default_max_tokens")]
    max_tokens: i64,
}

/// Code-snippet analysis via client-side sampling.
pub struct CodeAnalysisTool;

#[async_trait::async_trait]
impl McpTool for CodeAnalysisTool {
    fn name(&self) -> &'static str {
        "analyze_code"
    }

    fn description(&self) -> &'static str {
        "Compose an analysis request for a code snippet, to be executed by the \
         client LLM. Requires the 'sampling' client capability."
    }

    fn input_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "code": {
                    "type": "string",
                    "description": "Code snippet to analyze"
                },
                "analysis_type": {
                    "type": "string",
                    "enum": CODE_ANALYSIS_TYPES,
                    "default": "explain"
                },
                "max_tokens": {
                    "type": "integer",
                    "default": 500,
                    "minimum": 100,
                    "maximum": 2000,
                    "description": "Maximum tokens for the LLM response"
                }
            },
            "required": ["code"]
        })
    }

    async fn execute(&self, ctx: &ToolContext, input: serde_json::Value) -> ToolResult<String> {
        let params: CodeAnalysisInput = serde_json::from_value(input)?;

        if params.code.is_empty() {
            return Err(ToolError::validation("code", "cannot be empty"));
        }
        if !CODE_ANALYSIS_TYPES.contains(&params.analysis_type.as_str()) {
            return Err(ToolError::validation(
                "analysis_type",
                format!("must be one of: {}", CODE_ANALYSIS_TYPES.join(", ")),
            ));
        }
        if !(100..=2000).contains(&params.max_tokens) {
            return Err(ToolError::validation("max_tokens", "must be between 100 and 2000"));
        }

        require_sampling(ctx).await?;

        let prompt =
            format!("{}\n\n```\n{}\n```", code_analysis_prompt(&params.analysis_type), params.code);

        let result = json!({
            "analysis_type": params.analysis_type,
            "max_tokens": params.max_tokens,
            "prompt": prompt,
        });

        Ok(serde_json::to_string_pretty(&result)?)
    }
}
