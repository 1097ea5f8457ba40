//! GitHub OAuth MCP Server
//!
//! A Model Context Protocol (MCP) server that mediates GitHub OAuth 2.1
//! authentication and re-exposes GitHub read-only operations as MCP tools.
//!
//! # Features
//!
//! - **OAuth 2.1 with PKCE**: S256 challenges, anti-CSRF state tokens,
//!   read-once session correlation, token refresh
//! - **RFC 8414 metadata**: endpoint autodiscovery at
//!   `/.well-known/oauth-authorization-server`
//! - **RFC 8707 resource indicators**: opt-in token audience scoping
//! - **Async-first**: Built on Tokio with bounded timeouts on every
//!   outbound call
//!
//! # Example
//!
//! ```no_run
//! use github_oauth_mcp::{config::Config, server::McpServer};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::from_env()?;
//!     let server = McpServer::new(config)?;
//!     server.run_http(8080).await
//! }
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod metrics;
pub mod models;
pub mod oauth;
pub mod server;
pub mod tools;

pub use client::GitHubClient;
pub use config::Config;
pub use error::{ClientError, OAuthError, ToolError};
pub use oauth::{OAuthHandler, SessionStore, TokenSet};
