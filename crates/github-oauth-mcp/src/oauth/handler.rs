//! OAuth 2.1 flow against the upstream authorization server.
//!
//! The handler owns the central state machine: authorization-URL
//! construction with PKCE, code-for-token exchange, token refresh, and
//! authenticated-header production. State per attempt is implicit in
//! which data exists: a pending session means a code is out at the
//! upstream server, a held [`TokenSet`] means the exchange completed.

use reqwest::Client;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use serde::Deserialize;
use tokio::sync::Mutex;
use url::Url;

use super::pkce;
use crate::config::Config;
use crate::error::{OAuthError, OAuthResult};

/// Tokens issued by the upstream server.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenSet {
    /// Bearer token for API requests.
    pub access_token: String,

    /// Refresh token, if the upstream issued one.
    #[serde(default)]
    pub refresh_token: Option<String>,

    /// Token type, normally `bearer`.
    #[serde(default = "default_token_type")]
    pub token_type: String,

    /// Granted scopes as reported by the upstream.
    #[serde(default)]
    pub scope: String,

    /// Access token lifetime in seconds, if reported.
    #[serde(default)]
    pub expires_in: Option<u64>,
}

fn default_token_type() -> String {
    "bearer".to_string()
}

impl TokenSet {
    /// Short masked suffix for human display. The full token never
    /// appears in any response body.
    #[must_use]
    pub fn masked_access_token(&self) -> String {
        let chars: Vec<char> = self.access_token.chars().collect();
        let start = chars.len().saturating_sub(8);
        let suffix: String = chars[start..].iter().collect();
        format!("***{suffix}")
    }
}

/// A prepared authorization request.
#[derive(Debug, Clone)]
pub struct AuthorizationRequest {
    /// Full upstream authorization URL to redirect the user to.
    pub url: String,
    /// Anti-CSRF state token, key of the pending session.
    pub state: String,
    /// PKCE verifier to present at exchange time.
    pub code_verifier: String,
}

/// Error body shape used by OAuth token endpoints.
#[derive(Debug, Deserialize)]
struct UpstreamErrorBody {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

/// OAuth flow handler.
///
/// The held tokens live behind a single mutex; refresh holds the lock
/// across the upstream call, so concurrent refreshes serialize instead
/// of racing to invalidate each other's refresh token.
pub struct OAuthHandler {
    config: Config,
    resource_uri: Option<String>,
    http: Client,
    tokens: Mutex<Option<TokenSet>>,
}

impl OAuthHandler {
    /// Create a handler from configuration.
    ///
    /// # Errors
    ///
    /// Returns error if HTTP client initialization fails.
    pub fn new(config: Config) -> anyhow::Result<Self> {
        let http = Client::builder()
            .timeout(config.api_timeout)
            .connect_timeout(config.connect_timeout)
            .build()?;

        let resource_uri = config.resource_indicator.then(|| config.api_base_url.clone());

        Ok(Self { config, resource_uri, http, tokens: Mutex::new(None) })
    }

    /// The resource URI tokens are scoped to when RFC 8707 indicators
    /// are enabled.
    #[must_use]
    pub fn resource_uri(&self) -> Option<&str> {
        self.resource_uri.as_deref()
    }

    fn ensure_configured(&self) -> OAuthResult<()> {
        if self.config.is_oauth_configured() { Ok(()) } else { Err(OAuthError::NotConfigured) }
    }

    /// Build the upstream authorization URL with PKCE.
    ///
    /// Generates a fresh state token when none is supplied. The returned
    /// verifier must be stored against the state and presented at
    /// exchange time.
    pub fn build_authorization_url(
        &self,
        state: Option<String>,
    ) -> OAuthResult<AuthorizationRequest> {
        self.ensure_configured()?;

        let state = state.unwrap_or_else(pkce::generate_state);
        let pair = pkce::generate_pkce_pair();

        let mut url = Url::parse(&self.config.oauth_authorization_url)?;
        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("client_id", &self.config.oauth_client_id)
                .append_pair("response_type", "code")
                .append_pair("redirect_uri", &self.config.oauth_redirect_uri)
                .append_pair("scope", &self.config.scopes_list().join(" "))
                .append_pair("state", &state)
                .append_pair("code_challenge", &pair.challenge)
                .append_pair("code_challenge_method", "S256");
            if let Some(ref resource) = self.resource_uri {
                query.append_pair("resource", resource);
            }
        }

        Ok(AuthorizationRequest { url: url.into(), state, code_verifier: pair.verifier })
    }

    /// Exchange an authorization code for tokens.
    ///
    /// The verifier (not the challenge) is presented so the upstream can
    /// recompute S256 against the challenge it stored at authorize time.
    /// The redirect URI must be byte-identical to the one used there.
    /// Not retried on failure: authorization codes are single-use and
    /// short-lived.
    pub async fn exchange_code_for_token(
        &self,
        code: &str,
        code_verifier: &str,
        redirect_uri: &str,
    ) -> OAuthResult<TokenSet> {
        self.ensure_configured()?;

        let mut params = vec![
            ("grant_type", "authorization_code"),
            ("code", code),
            ("code_verifier", code_verifier),
            ("redirect_uri", redirect_uri),
            ("client_id", self.config.oauth_client_id.as_str()),
            ("client_secret", self.config.oauth_client_secret.as_str()),
        ];
        if let Some(ref resource) = self.resource_uri {
            params.push(("resource", resource.as_str()));
        }

        let token = self.request_token(&params).await?;

        tracing::info!(scope = %token.scope, "Exchanged authorization code for access token");

        *self.tokens.lock().await = Some(token.clone());
        Ok(token)
    }

    /// Refresh the access token using the held refresh token.
    ///
    /// Fails with [`OAuthError::NoRefreshToken`] when none is held. The
    /// token lock is held across the upstream call; a second concurrent
    /// refresh waits and then operates on the rotated token rather than
    /// replaying the stale one. If the response omits a refresh token,
    /// the prior one is retained (use does not invalidate it). A failed
    /// refresh is not retried; it means re-authorization is required.
    pub async fn refresh_access_token(&self) -> OAuthResult<TokenSet> {
        self.ensure_configured()?;

        let mut guard = self.tokens.lock().await;
        let refresh_token = guard
            .as_ref()
            .and_then(|t| t.refresh_token.clone())
            .ok_or(OAuthError::NoRefreshToken)?;

        let mut params = vec![
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token.as_str()),
            ("client_id", self.config.oauth_client_id.as_str()),
            ("client_secret", self.config.oauth_client_secret.as_str()),
        ];
        if let Some(ref resource) = self.resource_uri {
            params.push(("resource", resource.as_str()));
        }

        let mut token = self.request_token(&params).await?;
        if token.refresh_token.is_none() {
            token.refresh_token = Some(refresh_token);
        }

        tracing::info!("Refreshed access token");

        *guard = Some(token.clone());
        Ok(token)
    }

    async fn request_token(&self, params: &[(&str, &str)]) -> OAuthResult<TokenSet> {
        let response = self
            .http
            .post(&self.config.oauth_token_url)
            .header(reqwest::header::ACCEPT, "application/json")
            .form(params)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(match serde_json::from_str::<UpstreamErrorBody>(&body) {
                Ok(err) => OAuthError::Upstream {
                    error: err.error,
                    description: err.error_description,
                },
                Err(_) => OAuthError::upstream(format!("HTTP {}", status.as_u16()), None),
            });
        }

        // GitHub reports grant failures as 200 with an error body.
        let value: serde_json::Value = serde_json::from_str(&body)?;
        if let Some(error) = value.get("error").and_then(|e| e.as_str()) {
            let description = value
                .get("error_description")
                .and_then(|d| d.as_str())
                .map(str::to_string);
            return Err(OAuthError::upstream(error, description));
        }

        Ok(serde_json::from_value(value)?)
    }

    /// Check if an access token is held.
    pub async fn is_authenticated(&self) -> bool {
        self.tokens.lock().await.is_some()
    }

    /// The current bearer token, for the API client.
    pub async fn bearer_token(&self) -> OAuthResult<String> {
        self.tokens
            .lock()
            .await
            .as_ref()
            .map(|t| t.access_token.clone())
            .ok_or(OAuthError::NotAuthenticated)
    }

    /// Authorization headers for API requests.
    ///
    /// Precondition check only, no network call.
    pub async fn get_auth_headers(&self) -> OAuthResult<HeaderMap> {
        let token = self.bearer_token().await?;
        let mut headers = HeaderMap::new();
        let value = HeaderValue::from_str(&format!("Bearer {token}"))
            .map_err(|_| OAuthError::NotAuthenticated)?;
        headers.insert(AUTHORIZATION, value);
        Ok(headers)
    }

    /// The held token set, for display after a completed exchange.
    pub async fn current_tokens(&self) -> Option<TokenSet> {
        self.tokens.lock().await.clone()
    }

    /// Structured authorization-error payload for MCP clients.
    ///
    /// Carries the full OAuth metadata needed to bootstrap a flow so
    /// automated clients on transports without HTTP challenge headers
    /// can self-initiate. The protected API base URL is always named as
    /// the resource, whether or not RFC 8707 parameters are sent.
    #[must_use]
    pub fn authorization_error_response(&self) -> serde_json::Value {
        serde_json::json!({
            "code": -32001,
            "message": "Authentication required",
            "data": {
                "type": "oauth2",
                "grant_type": "authorization_code",
                "authorization_url": self.config.oauth_authorization_url,
                "token_url": self.config.oauth_token_url,
                "scopes": self.config.scopes_list(),
                "code_challenge_method": "S256",
                "resource": self.config.api_base_url,
            }
        })
    }
}

impl std::fmt::Debug for OAuthHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuthHandler")
            .field("client_id", &self.config.oauth_client_id)
            .field("resource_indicator", &self.resource_uri.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn handler() -> OAuthHandler {
        OAuthHandler::new(Config::new("test_client_id", "test_client_secret")).unwrap()
    }

    fn query_map(url: &str) -> HashMap<String, String> {
        Url::parse(url)
            .unwrap()
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect()
    }

    #[test]
    fn test_authorization_url_parameters() {
        let request = handler().build_authorization_url(None).unwrap();
        let params = query_map(&request.url);

        assert_eq!(params["client_id"], "test_client_id");
        assert_eq!(params["response_type"], "code");
        assert_eq!(params["code_challenge_method"], "S256");
        assert_eq!(params["state"], request.state);
        assert_eq!(params["scope"], "read:user");
        assert_eq!(params["code_challenge"], pkce::s256_challenge(&request.code_verifier));
        assert!(!params.contains_key("resource"));
    }

    #[test]
    fn test_authorization_url_custom_state() {
        let request = handler().build_authorization_url(Some("my_state_123".into())).unwrap();
        assert_eq!(request.state, "my_state_123");
        assert!(request.url.contains("state=my_state_123"));
    }

    #[test]
    fn test_authorization_url_fresh_pkce_per_attempt() {
        let handler = handler();
        let a = handler.build_authorization_url(None).unwrap();
        let b = handler.build_authorization_url(None).unwrap();
        assert_ne!(a.code_verifier, b.code_verifier);
        assert_ne!(a.state, b.state);
    }

    #[test]
    fn test_authorization_url_with_resource_indicator() {
        let mut config = Config::new("id", "secret");
        config.resource_indicator = true;
        let handler = OAuthHandler::new(config).unwrap();

        let request = handler.build_authorization_url(None).unwrap();
        let params = query_map(&request.url);
        assert_eq!(params["resource"], "https://api.github.com");
    }

    #[test]
    fn test_unconfigured_handler_rejects_flow() {
        let handler = OAuthHandler::new(Config::default()).unwrap();
        assert!(matches!(
            handler.build_authorization_url(None),
            Err(OAuthError::NotConfigured)
        ));
    }

    #[tokio::test]
    async fn test_auth_headers_require_token() {
        let handler = handler();
        assert!(!handler.is_authenticated().await);
        assert!(matches!(handler.get_auth_headers().await, Err(OAuthError::NotAuthenticated)));
    }

    #[tokio::test]
    async fn test_refresh_without_token_is_specific() {
        let handler = handler();
        assert!(matches!(handler.refresh_access_token().await, Err(OAuthError::NoRefreshToken)));
    }

    #[test]
    fn test_authorization_error_response_shape() {
        let payload = handler().authorization_error_response();

        assert_eq!(payload["code"], -32001);
        assert_eq!(payload["message"], "Authentication required");
        assert_eq!(payload["data"]["type"], "oauth2");
        assert_eq!(payload["data"]["code_challenge_method"], "S256");
        assert_eq!(
            payload["data"]["authorization_url"],
            "https://github.com/login/oauth/authorize"
        );
        assert_eq!(payload["data"]["resource"], "https://api.github.com");
    }

    #[test]
    fn test_masked_access_token() {
        let token = TokenSet {
            access_token: "gho_abcdefgh12345678".to_string(),
            refresh_token: None,
            token_type: "bearer".to_string(),
            scope: String::new(),
            expires_in: None,
        };
        assert_eq!(token.masked_access_token(), "***12345678");
    }
}
