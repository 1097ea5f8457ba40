//! Error types for the GitHub OAuth MCP server.
//!
//! Uses `thiserror` for structured error handling with automatic `From` implementations.

use std::time::Duration;

/// Errors from the OAuth flow.
#[derive(thiserror::Error, Debug)]
pub enum OAuthError {
    /// OAuth credentials are missing from the configuration.
    #[error(
        "OAuth is not configured. Set OAUTH_CLIENT_ID and OAUTH_CLIENT_SECRET \
         environment variables."
    )]
    NotConfigured,

    /// The callback presented a state with no live session.
    #[error("Invalid or expired OAuth session. Please start the authorization flow again.")]
    SessionNotFound,

    /// The authorization server rejected the request.
    #[error("Authorization server rejected the request: {error}")]
    Upstream {
        /// Error code reported by the upstream server.
        error: String,
        /// Human-readable description, if the upstream provided one.
        description: Option<String>,
    },

    /// Refresh was requested but no refresh token is held.
    #[error("No refresh token available")]
    NoRefreshToken,

    /// A token-requiring operation ran before any token was obtained.
    #[error("No access token available. Please authenticate first.")]
    NotAuthenticated,

    /// A configured endpoint URL failed to parse.
    #[error("Invalid OAuth endpoint URL: {0}")]
    InvalidEndpoint(#[from] url::ParseError),

    /// Network or timeout failure talking to the upstream server.
    #[error("Network error during token request: {0}")]
    Network(#[from] reqwest::Error),

    /// The upstream returned a success status with an unparseable body.
    #[error("Failed to parse token response: {0}")]
    Parse(#[from] serde_json::Error),
}

impl OAuthError {
    /// Create an upstream rejection error.
    #[must_use]
    pub fn upstream(error: impl Into<String>, description: Option<String>) -> Self {
        Self::Upstream { error: error.into(), description }
    }

    /// True for precondition failures ("authenticate first"), as opposed to
    /// failed authentication attempts.
    #[must_use]
    pub const fn is_precondition(&self) -> bool {
        matches!(self, Self::NotAuthenticated | Self::NoRefreshToken | Self::NotConfigured)
    }

    /// True when the caller may reasonably retry the same request.
    ///
    /// Upstream rejections are never retryable: authorization codes are
    /// single-use and a rejected grant stays rejected.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Network(e) if e.is_timeout() || e.is_connect())
    }

    /// Message safe to show at the HTTP boundary.
    ///
    /// Upstream-reported error text passes through; network failures are
    /// rendered generically so internal error chains never reach callers.
    #[must_use]
    pub fn to_user_message(&self) -> String {
        match self {
            Self::Upstream { error, description } => match description {
                Some(desc) => format!("{error}: {desc}"),
                None => error.clone(),
            },
            Self::Network(_) => {
                "Network error contacting the authorization server. Please try again.".to_string()
            }
            Self::Parse(_) => "The authorization server returned an unexpected response.".to_string(),
            _ => self.to_string(),
        }
    }
}

/// Errors from the GitHub API client layer.
#[derive(thiserror::Error, Debug)]
pub enum ClientError {
    /// HTTP transport error (connection, DNS, TLS, etc.)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Middleware error
    #[error("Middleware error: {0}")]
    Middleware(#[from] reqwest_middleware::Error),

    /// Token rejected by the API (401 response)
    #[error("Unauthorized: {message}")]
    Unauthorized {
        /// Error message from the API
        message: String,
    },

    /// Rate limited by the GitHub API (429 response)
    #[error("Rate limited, retry after {retry_after:?}")]
    RateLimited {
        /// Suggested wait time before retry
        retry_after: Duration,
    },

    /// Resource not found (404 response)
    #[error("Resource not found: {resource}")]
    NotFound {
        /// Description of the missing resource
        resource: String,
    },

    /// Invalid request parameters (400/422 response)
    #[error("Bad request: {message}")]
    BadRequest {
        /// Error message from API
        message: String,
    },

    /// JSON parsing error
    #[error("Failed to parse response: {0}")]
    Parse(#[from] serde_json::Error),

    /// Server error (5xx response)
    #[error("Server error ({status}): {message}")]
    Server {
        /// HTTP status code
        status: u16,
        /// Error message
        message: String,
    },

    /// Unexpected HTTP status
    #[error("Unexpected status {status}: {message}")]
    UnexpectedStatus {
        /// HTTP status code
        status: u16,
        /// Response body or message
        message: String,
    },
}

impl ClientError {
    /// Create an unauthorized error.
    #[must_use]
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized { message: message.into() }
    }

    /// Create a rate limited error with retry-after duration.
    #[must_use]
    pub fn rate_limited(seconds: u64) -> Self {
        Self::RateLimited { retry_after: Duration::from_secs(seconds) }
    }

    /// Create a not found error.
    #[must_use]
    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::NotFound { resource: resource.into() }
    }

    /// Create a bad request error.
    #[must_use]
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest { message: message.into() }
    }

    /// Create a server error.
    #[must_use]
    pub fn server(status: u16, message: impl Into<String>) -> Self {
        Self::Server { status, message: message.into() }
    }

    /// Returns true if this error is retryable.
    ///
    /// A 401 must never be retried with the same token.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::RateLimited { .. } | Self::Server { .. })
    }

    /// Get the retry-after duration if this is a rate limit error.
    #[must_use]
    pub const fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::RateLimited { retry_after } => Some(*retry_after),
            _ => None,
        }
    }
}

/// Errors from MCP tool execution.
#[derive(thiserror::Error, Debug)]
pub enum ToolError {
    /// Error from the API client
    #[error("API error: {0}")]
    Client(#[from] ClientError),

    /// Error from the OAuth layer
    #[error("OAuth error: {0}")]
    Auth(#[from] OAuthError),

    /// The tool requires authentication and none is present.
    ///
    /// Carries the structured OAuth bootstrap metadata so automated
    /// clients can self-initiate the flow.
    #[error("Authentication required")]
    AuthorizationRequired {
        /// OAuth metadata payload (authorization/token URLs, scopes, PKCE method).
        metadata: serde_json::Value,
    },

    /// The tool requires a client capability that was not negotiated.
    #[error("Client does not support the '{capability}' capability")]
    CapabilityRequired {
        /// Name of the missing capability.
        capability: String,
    },

    /// Input validation failed
    #[error("Validation error: {message}")]
    Validation {
        /// Field that failed validation
        field: String,
        /// Validation error message
        message: String,
    },

    /// JSON serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Internal tool logic error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ToolError {
    /// Create a validation error.
    #[must_use]
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation { field: field.into(), message: message.into() }
    }

    /// Create a capability error.
    #[must_use]
    pub fn capability(capability: impl Into<String>) -> Self {
        Self::CapabilityRequired { capability: capability.into() }
    }

    /// Create an internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Convert to a user-friendly error message for the MCP response.
    #[must_use]
    pub fn to_user_message(&self) -> String {
        match self {
            Self::Client(ClientError::RateLimited { retry_after }) => {
                format!("Rate limited by the GitHub API. Please wait {retry_after:?} before retrying.")
            }
            Self::Client(ClientError::NotFound { resource }) => {
                format!("Not found: {resource}. Please check the owner and repository name.")
            }
            Self::Auth(e) => e.to_user_message(),
            Self::Validation { field, message } => {
                format!("Invalid input for '{field}': {message}")
            }
            _ => self.to_string(),
        }
    }
}

/// Result type alias for OAuth operations.
pub type OAuthResult<T> = Result<T, OAuthError>;

/// Result type alias for client operations.
pub type ClientResult<T> = Result<T, ClientError>;

/// Result type alias for tool operations.
pub type ToolResult<T> = Result<T, ToolError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_oauth_error_precondition_classes() {
        assert!(OAuthError::NotAuthenticated.is_precondition());
        assert!(OAuthError::NoRefreshToken.is_precondition());
        assert!(OAuthError::NotConfigured.is_precondition());
        assert!(!OAuthError::upstream("invalid_grant", None).is_precondition());
    }

    #[test]
    fn test_oauth_upstream_never_retryable() {
        assert!(!OAuthError::upstream("invalid_grant", None).is_retryable());
        assert!(!OAuthError::NotAuthenticated.is_retryable());
    }

    #[test]
    fn test_oauth_user_message_passes_upstream_text() {
        let err = OAuthError::upstream("access_denied", Some("user said no".to_string()));
        assert_eq!(err.to_user_message(), "access_denied: user said no");
    }

    #[test]
    fn test_client_error_retryable() {
        assert!(ClientError::rate_limited(60).is_retryable());
        assert!(ClientError::server(500, "Internal error").is_retryable());

        assert!(!ClientError::unauthorized("bad token").is_retryable());
        assert!(!ClientError::not_found("repo").is_retryable());
        assert!(!ClientError::bad_request("invalid query").is_retryable());
    }

    #[test]
    fn test_client_error_retry_after() {
        let err = ClientError::rate_limited(60);
        assert_eq!(err.retry_after(), Some(Duration::from_secs(60)));

        let err = ClientError::not_found("repo");
        assert_eq!(err.retry_after(), None);
    }

    #[test]
    fn test_tool_error_user_message() {
        let err = ToolError::validation("repo_limit", "must be between 1 and 100");
        assert!(err.to_user_message().contains("repo_limit"));
        assert!(err.to_user_message().contains("between 1 and 100"));
    }

    #[test]
    fn test_tool_error_no_refresh_token_is_specific() {
        let err = ToolError::Auth(OAuthError::NoRefreshToken);
        assert_eq!(err.to_user_message(), "No refresh token available");
    }
}
