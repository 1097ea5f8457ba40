//! GitHub REST API client.
//!
//! Provides async HTTP client with:
//! - Connection pooling via reqwest
//! - Retry middleware with exponential backoff for transient failures
//! - Response caching with 5-minute TTL
//!
//! The client is a black-box fetcher keyed by bearer token: every call
//! takes the token explicitly, and the OAuth layer decides which token
//! that is.

use std::collections::BTreeMap;
use std::time::Duration;

use moka::future::Cache;
use reqwest::Client;
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{RetryTransientMiddleware, policies::ExponentialBackoff};

use crate::config::{Config, api};
use crate::error::{ClientError, ClientResult};
use crate::models::{GitHubUser, Repository};

/// GitHub API client.
#[derive(Clone)]
pub struct GitHubClient {
    /// HTTP client with middleware.
    client: ClientWithMiddleware,

    /// Response cache.
    cache: Cache<String, serde_json::Value>,

    /// API base URL.
    base_url: String,
}

impl GitHubClient {
    /// Create a new client with the given configuration.
    ///
    /// # Errors
    ///
    /// Returns error if HTTP client initialization fails.
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(reqwest::header::ACCEPT, api::ACCEPT.parse()?);
        headers.insert("X-GitHub-Api-Version", api::API_VERSION.parse()?);
        headers.insert(
            reqwest::header::USER_AGENT,
            format!("{}/{}", config.server_name, config.server_version).parse()?,
        );

        let client = Client::builder()
            .default_headers(headers)
            .timeout(config.api_timeout)
            .connect_timeout(config.connect_timeout)
            .pool_max_idle_per_host(api::MAX_KEEPALIVE)
            .pool_idle_timeout(api::KEEPALIVE_EXPIRY)
            .gzip(true)
            .build()?;

        let retry_policy = ExponentialBackoff::builder()
            .retry_bounds(Duration::from_secs(1), Duration::from_secs(30))
            .build_with_max_retries(3);

        let client = ClientBuilder::new(client)
            .with(RetryTransientMiddleware::new_with_policy(retry_policy))
            .build();

        let cache = Cache::builder()
            .max_capacity(config.cache_max_size)
            .time_to_live(config.cache_ttl)
            .build();

        Ok(Self { client, cache, base_url: config.api_base_url.clone() })
    }

    /// Fetch the authenticated user's profile.
    ///
    /// # Errors
    ///
    /// Returns error on API failure.
    pub async fn get_user(&self, token: &str) -> ClientResult<GitHubUser> {
        let url = format!("{}/user", self.base_url);
        self.get(token, &url, &[]).await
    }

    /// Fetch the authenticated user's repositories, most recently updated
    /// first.
    ///
    /// # Errors
    ///
    /// Returns error on API failure.
    pub async fn get_user_repos(&self, token: &str, limit: u32) -> ClientResult<Vec<Repository>> {
        let url = format!("{}/user/repos", self.base_url);
        let params = vec![
            ("per_page".to_string(), limit.to_string()),
            ("sort".to_string(), "updated".to_string()),
        ];
        self.get(token, &url, &params).await
    }

    /// Fetch a repository by owner and name.
    ///
    /// # Errors
    ///
    /// Returns error on API failure.
    pub async fn get_repository(
        &self,
        token: &str,
        owner: &str,
        repo: &str,
    ) -> ClientResult<Repository> {
        let url = format!("{}/repos/{owner}/{repo}", self.base_url);
        self.get(token, &url, &[]).await
    }

    /// Fetch a repository's README as raw text.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::NotFound`] when the repository has no README.
    pub async fn get_readme(&self, token: &str, owner: &str, repo: &str) -> ClientResult<String> {
        let url = format!("{}/repos/{owner}/{repo}/readme", self.base_url);

        let response = self
            .client
            .get(&url)
            .bearer_auth(token)
            .header(reqwest::header::ACCEPT, api::ACCEPT_RAW)
            .send()
            .await?;

        let response = Self::handle_response(response).await?;
        Ok(response.text().await.map_err(ClientError::from)?)
    }

    /// Fetch a repository's language byte counts.
    ///
    /// # Errors
    ///
    /// Returns error on API failure.
    pub async fn get_repository_languages(
        &self,
        token: &str,
        owner: &str,
        repo: &str,
    ) -> ClientResult<BTreeMap<String, u64>> {
        let url = format!("{}/repos/{owner}/{repo}/languages", self.base_url);
        self.get(token, &url, &[]).await
    }

    /// Make a GET request.
    async fn get<T>(&self, token: &str, url: &str, params: &[(String, String)]) -> ClientResult<T>
    where
        T: serde::de::DeserializeOwned,
    {
        // Check cache. Responses vary by token, so the token is part of
        // the key.
        let cache_key = Self::cache_key(token, url, params);
        if let Some(cached) = self.cache.get(&cache_key).await {
            return serde_json::from_value(cached).map_err(ClientError::from);
        }

        let response = self.client.get(url).bearer_auth(token).query(params).send().await?;

        let response = Self::handle_response(response).await?;
        let value: serde_json::Value = response.json().await.map_err(ClientError::from)?;

        // Cache response
        self.cache.insert(cache_key, value.clone()).await;

        serde_json::from_value(value).map_err(ClientError::from)
    }

    /// Handle API response status codes.
    async fn handle_response(response: reqwest::Response) -> ClientResult<reqwest::Response> {
        let status = response.status();

        if status.is_success() {
            return Ok(response);
        }

        match status.as_u16() {
            401 => {
                let text = response.text().await.unwrap_or_default();
                Err(ClientError::unauthorized(text))
            }
            429 => {
                let retry_after = response
                    .headers()
                    .get("Retry-After")
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(60);

                Err(ClientError::rate_limited(retry_after))
            }
            404 => {
                let text = response.text().await.unwrap_or_default();
                Err(ClientError::not_found(text))
            }
            400 | 422 => {
                let text = response.text().await.unwrap_or_default();
                Err(ClientError::bad_request(text))
            }
            500..=599 => {
                let text = response.text().await.unwrap_or_default();
                Err(ClientError::server(status.as_u16(), text))
            }
            _ => {
                let text = response.text().await.unwrap_or_default();
                Err(ClientError::UnexpectedStatus { status: status.as_u16(), message: text })
            }
        }
    }

    /// Generate cache key.
    fn cache_key(token: &str, url: &str, params: &[(String, String)]) -> String {
        use md5::{Digest, Md5};

        let mut hasher = Md5::new();
        hasher.update(token.as_bytes());
        hasher.update(b"|");
        hasher.update(url.as_bytes());
        hasher.update(b"|");

        for (k, v) in params {
            hasher.update(k.as_bytes());
            hasher.update(b"=");
            hasher.update(v.as_bytes());
            hasher.update(b"&");
        }

        format!("{:x}", hasher.finalize())
    }
}

impl std::fmt::Debug for GitHubClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitHubClient").field("base_url", &self.base_url).finish()
    }
}
