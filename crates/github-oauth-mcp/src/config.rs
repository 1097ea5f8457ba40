//! Configuration for the GitHub OAuth MCP server.

use std::time::Duration;

use url::Url;

/// OAuth endpoint constants.
pub mod oauth {
    use std::time::Duration;

    /// GitHub authorization endpoint.
    pub const AUTHORIZATION_URL: &str = "https://github.com/login/oauth/authorize";

    /// GitHub token endpoint.
    pub const TOKEN_URL: &str = "https://github.com/login/oauth/access_token";

    /// Default OAuth scopes (comma-separated).
    pub const DEFAULT_SCOPES: &str = "read:user";

    /// Default redirect URI; must match the callback route byte-for-byte.
    pub const REDIRECT_URI: &str = "http://localhost:8080/oauth/callback";

    /// Lifetime of a pending authorization session.
    pub const SESSION_TTL: Duration = Duration::from_secs(600);

    /// Interval for the background session sweep.
    pub const SWEEP_INTERVAL: Duration = Duration::from_secs(300);
}

/// GitHub API constants.
pub mod api {
    use std::time::Duration;

    /// Base URL for the GitHub REST API.
    pub const BASE_URL: &str = "https://api.github.com";

    /// GitHub REST media type.
    pub const ACCEPT: &str = "application/vnd.github+json";

    /// Raw media type, used for README content.
    pub const ACCEPT_RAW: &str = "application/vnd.github.raw+json";

    /// REST API version header value.
    pub const API_VERSION: &str = "2022-11-28";

    /// Request timeout applied to every outbound call.
    pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

    /// Connection timeout.
    pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

    /// Cache TTL for GET responses (5 minutes).
    pub const CACHE_TTL: Duration = Duration::from_secs(300);

    /// Maximum cache size.
    pub const CACHE_MAX_SIZE: u64 = 1000;

    /// Maximum keepalive connections.
    pub const MAX_KEEPALIVE: usize = 10;

    /// Keepalive expiry.
    pub const KEEPALIVE_EXPIRY: Duration = Duration::from_secs(30);
}

/// Server configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// OAuth app client id.
    pub oauth_client_id: String,

    /// OAuth app client secret.
    pub oauth_client_secret: String,

    /// Upstream authorization endpoint.
    pub oauth_authorization_url: String,

    /// Upstream token endpoint.
    pub oauth_token_url: String,

    /// OAuth scopes, comma-separated.
    pub oauth_scopes: String,

    /// Redirect URI used at authorization and exchange time.
    pub oauth_redirect_uri: String,

    /// Send RFC 8707 `resource` parameters to the upstream server.
    ///
    /// Off by default; GitHub does not require resource indicators and
    /// upstream support is not guaranteed.
    pub resource_indicator: bool,

    /// GitHub API base URL (overridable for mock servers).
    pub api_base_url: String,

    /// Request timeout for outbound calls.
    pub api_timeout: Duration,

    /// Connection timeout.
    pub connect_timeout: Duration,

    /// Cache TTL for API GET responses.
    pub cache_ttl: Duration,

    /// Maximum cache size.
    pub cache_max_size: u64,

    /// Server name reported on health/info endpoints.
    pub server_name: String,

    /// Server version reported on health/info endpoints.
    pub server_version: String,

    /// Deployment environment label.
    pub environment: String,

    /// Debug flag reported on the info endpoint.
    pub debug: bool,
}

impl Config {
    /// Create a configuration with the given OAuth credentials and defaults
    /// for everything else.
    #[must_use]
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            oauth_client_id: client_id.into(),
            oauth_client_secret: client_secret.into(),
            oauth_authorization_url: oauth::AUTHORIZATION_URL.to_string(),
            oauth_token_url: oauth::TOKEN_URL.to_string(),
            oauth_scopes: oauth::DEFAULT_SCOPES.to_string(),
            oauth_redirect_uri: oauth::REDIRECT_URI.to_string(),
            resource_indicator: false,
            api_base_url: api::BASE_URL.to_string(),
            api_timeout: api::REQUEST_TIMEOUT,
            connect_timeout: api::CONNECT_TIMEOUT,
            cache_ttl: api::CACHE_TTL,
            cache_max_size: api::CACHE_MAX_SIZE,
            server_name: "github-oauth-mcp".to_string(),
            server_version: env!("CARGO_PKG_VERSION").to_string(),
            environment: "development".to_string(),
            debug: false,
        }
    }

    /// Create configuration from environment variables.
    ///
    /// Missing OAuth credentials are not an error here; flows fail later
    /// with an explicit not-configured message so the server can still
    /// serve health and metadata endpoints.
    ///
    /// # Errors
    ///
    /// Returns error if a numeric variable fails to parse.
    pub fn from_env() -> anyhow::Result<Self> {
        let mut config = Self::new(
            std::env::var("OAUTH_CLIENT_ID").unwrap_or_default(),
            std::env::var("OAUTH_CLIENT_SECRET").unwrap_or_default(),
        );

        if let Ok(v) = std::env::var("OAUTH_AUTHORIZATION_URL") {
            config.oauth_authorization_url = v;
        }
        if let Ok(v) = std::env::var("OAUTH_TOKEN_URL") {
            config.oauth_token_url = v;
        }
        if let Ok(v) = std::env::var("OAUTH_SCOPES") {
            config.oauth_scopes = v;
        }
        if let Ok(v) = std::env::var("OAUTH_REDIRECT_URI") {
            config.oauth_redirect_uri = v;
        }
        if let Ok(v) = std::env::var("OAUTH_RESOURCE_INDICATOR") {
            config.resource_indicator = matches!(v.as_str(), "1" | "true" | "yes");
        }
        if let Ok(v) = std::env::var("API_BASE_URL") {
            config.api_base_url = v;
        }
        if let Ok(v) = std::env::var("API_TIMEOUT") {
            config.api_timeout = Duration::from_secs(v.parse()?);
        }
        if let Ok(v) = std::env::var("ENVIRONMENT") {
            config.environment = v;
        }
        if let Ok(v) = std::env::var("DEBUG") {
            config.debug = matches!(v.as_str(), "1" | "true" | "yes");
        }

        Ok(config)
    }

    /// Create a test configuration with OAuth and API URLs pointed at a
    /// mock server.
    #[must_use]
    pub fn for_testing(base_url: &str) -> Self {
        let mut config = Self::new("test_client_id", "test_client_secret");
        config.oauth_authorization_url = format!("{base_url}/login/oauth/authorize");
        config.oauth_token_url = format!("{base_url}/login/oauth/access_token");
        config.api_base_url = base_url.to_string();
        config.api_timeout = Duration::from_secs(5);
        config.connect_timeout = Duration::from_secs(2);
        config.cache_ttl = Duration::from_secs(0); // No caching in tests
        config.cache_max_size = 0;
        config.environment = "test".to_string();
        config
    }

    /// Parse OAuth scopes from the comma-separated setting.
    #[must_use]
    pub fn scopes_list(&self) -> Vec<String> {
        self.oauth_scopes
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    }

    /// Check if OAuth credentials are configured.
    #[must_use]
    pub fn is_oauth_configured(&self) -> bool {
        !self.oauth_client_id.is_empty() && !self.oauth_client_secret.is_empty()
    }

    /// Issuer identifier derived from the authorization endpoint origin.
    #[must_use]
    pub fn issuer(&self) -> String {
        Url::parse(&self.oauth_authorization_url).map_or_else(
            |_| self.oauth_authorization_url.clone(),
            |url| {
                let mut issuer = format!("{}://{}", url.scheme(), url.host_str().unwrap_or(""));
                if let Some(port) = url.port() {
                    issuer.push_str(&format!(":{port}"));
                }
                issuer
            },
        )
    }

    /// RFC 8414 Authorization Server Metadata document.
    ///
    /// Pure function of the current settings, computed per request.
    #[must_use]
    pub fn authorization_server_metadata(&self) -> serde_json::Value {
        serde_json::json!({
            "issuer": self.issuer(),
            "authorization_endpoint": self.oauth_authorization_url,
            "token_endpoint": self.oauth_token_url,
            "scopes_supported": self.scopes_list(),
            "response_types_supported": ["code"],
            "grant_types_supported": ["authorization_code", "refresh_token"],
            "code_challenge_methods_supported": ["S256"],
            "token_endpoint_auth_methods_supported": ["client_secret_post"]
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new("", "")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default_not_configured() {
        let config = Config::default();
        assert!(!config.is_oauth_configured());
        assert_eq!(config.oauth_authorization_url, oauth::AUTHORIZATION_URL);
        assert_eq!(config.api_base_url, api::BASE_URL);
    }

    #[test]
    fn test_config_with_credentials() {
        let config = Config::new("id", "secret");
        assert!(config.is_oauth_configured());
    }

    #[test]
    fn test_scopes_list_parsing() {
        let mut config = Config::default();
        config.oauth_scopes = "read:user,repo,admin:org".to_string();
        assert_eq!(config.scopes_list(), vec!["read:user", "repo", "admin:org"]);
    }

    #[test]
    fn test_scopes_list_trims_whitespace() {
        let mut config = Config::default();
        config.oauth_scopes = " read:user , repo , ".to_string();
        assert_eq!(config.scopes_list(), vec!["read:user", "repo"]);
    }

    #[test]
    fn test_issuer_strips_path() {
        let config = Config::default();
        assert_eq!(config.issuer(), "https://github.com");
    }

    #[test]
    fn test_metadata_document() {
        let mut config = Config::new("id", "secret");
        config.oauth_scopes = "read:user,repo".to_string();

        let metadata = config.authorization_server_metadata();

        assert_eq!(metadata["issuer"], "https://github.com");
        assert_eq!(metadata["authorization_endpoint"], oauth::AUTHORIZATION_URL);
        assert_eq!(metadata["token_endpoint"], oauth::TOKEN_URL);
        assert_eq!(
            metadata["scopes_supported"],
            serde_json::json!(["read:user", "repo"])
        );
        assert_eq!(metadata["response_types_supported"], serde_json::json!(["code"]));
        assert_eq!(
            metadata["grant_types_supported"],
            serde_json::json!(["authorization_code", "refresh_token"])
        );
        assert_eq!(
            metadata["code_challenge_methods_supported"],
            serde_json::json!(["S256"])
        );
    }
}
