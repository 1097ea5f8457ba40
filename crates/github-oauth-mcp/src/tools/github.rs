//! GitHub data tools: get_github_user_info.

use serde::Deserialize;
use serde_json::json;

use super::{McpTool, ToolContext};
use crate::error::{ClientError, OAuthError, ToolError, ToolResult};

fn default_include_repos() -> bool {
    true
}

fn default_repo_limit() -> i64 {
    10
}

#[derive(Debug, Deserialize)]
struct UserInfoInput {
    #[serde(default = "default_include_repos")]
    include_repos: bool,
    #[serde(default = "default_repo_limit")]
    repo_limit: i64,
}

/// Require OAuth configuration and a held access token.
///
/// Unauthenticated calls get the structured bootstrap payload so
/// automated clients can self-initiate the flow.
pub(super) async fn require_bearer_token(ctx: &ToolContext) -> ToolResult<String> {
    if !ctx.config.is_oauth_configured() {
        return Err(ToolError::Auth(OAuthError::NotConfigured));
    }

    if !ctx.oauth.is_authenticated().await {
        tracing::warn!("Tool called without authentication, returning OAuth bootstrap payload");
        return Err(ToolError::AuthorizationRequired {
            metadata: ctx.oauth.authorization_error_response(),
        });
    }

    Ok(ctx.oauth.bearer_token().await.map_err(ToolError::Auth)?)
}

/// Authenticated user profile and repository listing.
pub struct UserInfoTool;

#[async_trait::async_trait]
impl McpTool for UserInfoTool {
    fn name(&self) -> &'static str {
        "get_github_user_info"
    }

    fn description(&self) -> &'static str {
        "Fetch the authenticated GitHub user's profile and recent repositories. \
         Requires OAuth authentication; unauthenticated calls return the OAuth \
         metadata needed to start the flow."
    }

    fn input_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "include_repos": {
                    "type": "boolean",
                    "default": true,
                    "description": "Whether to include repository information"
                },
                "repo_limit": {
                    "type": "integer",
                    "default": 10,
                    "minimum": 1,
                    "maximum": 100,
                    "description": "Maximum number of repositories to fetch"
                }
            }
        })
    }

    async fn execute(&self, ctx: &ToolContext, input: serde_json::Value) -> ToolResult<String> {
        let params: UserInfoInput = serde_json::from_value(input)?;

        if !(1..=100).contains(&params.repo_limit) {
            return Err(ToolError::validation("repo_limit", "must be between 1 and 100"));
        }

        let token = require_bearer_token(ctx).await?;

        let user = ctx.github.get_user(&token).await?;

        tracing::info!(login = %user.login, "Fetched GitHub user info");

        let mut result = json!({
            "login": user.login,
            "name": user.name,
            "bio": user.bio,
            "public_repos": user.public_repos,
            "followers": user.followers,
            "following": user.following,
            "created_at": user.created_at,
            "updated_at": user.updated_at,
        });

        if params.include_repos {
            #[allow(clippy::cast_sign_loss, clippy::cast_possible_truncation)]
            let repos = ctx.github.get_user_repos(&token, params.repo_limit as u32).await?;

            result["repositories"] = repos
                .iter()
                .map(|repo| {
                    json!({
                        "name": &repo.name,
                        "description": &repo.description,
                        "language": &repo.language,
                        "stars": repo.stars(),
                        "forks": repo.forks(),
                        "updated_at": &repo.updated_at,
                        "url": &repo.html_url,
                    })
                })
                .collect();
        }

        Ok(serde_json::to_string_pretty(&result)?)
    }
}

/// Fetch a README, treating a missing one as empty rather than an error.
pub(super) async fn readme_or_empty(
    ctx: &ToolContext,
    token: &str,
    owner: &str,
    repo: &str,
) -> ToolResult<String> {
    match ctx.github.get_readme(token, owner, repo).await {
        Ok(text) => Ok(text),
        Err(ClientError::NotFound { .. }) => Ok(String::new()),
        Err(e) => Err(e.into()),
    }
}
