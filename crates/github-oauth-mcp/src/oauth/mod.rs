//! OAuth 2.1 client-side authorization against GitHub.
//!
//! The server never issues tokens of its own; it drives the upstream
//! authorization-code flow and holds what the upstream issues.
//!
//! ## Supported Standards
//! - RFC 6749: OAuth 2.0 Authorization Code Grant
//! - RFC 7636: PKCE (S256)
//! - RFC 8414: OAuth Authorization Server Metadata
//! - RFC 8707: Resource Indicators (opt-in)

pub mod handler;
pub mod pkce;
pub mod session;

pub use handler::{AuthorizationRequest, OAuthHandler, TokenSet};
pub use session::{OAuthSession, SessionStore};
