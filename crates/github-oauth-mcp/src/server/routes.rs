//! HTTP routes for the OAuth flow.
//!
//! Three externally reachable endpoints drive the handler and session
//! store: `/oauth/authorize`, `/oauth/callback`, and the RFC 8414
//! metadata document.

use std::sync::Arc;
use std::time::Instant;

use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use serde::Deserialize;

use super::pages;
use super::transport::HttpState;
use crate::config::oauth;
use crate::error::OAuthError;

/// `GET /.well-known/oauth-authorization-server`
///
/// RFC 8414 Authorization Server Metadata, a pure function of config.
pub async fn handle_oauth_metadata(State(state): State<Arc<HttpState>>) -> impl IntoResponse {
    tracing::info!("Serving OAuth authorization server metadata");
    Json(state.ctx.config.authorization_server_metadata())
}

/// `GET /oauth/authorize`
///
/// Starts the flow: records a pending session keyed by a fresh state
/// token and redirects to the upstream authorization page.
pub async fn handle_authorize(State(state): State<Arc<HttpState>>) -> Response {
    state.sessions.sweep_expired(Instant::now()).await;

    if !state.ctx.config.is_oauth_configured() {
        return (StatusCode::SERVICE_UNAVAILABLE, OAuthError::NotConfigured.to_string())
            .into_response();
    }

    let request = match state.ctx.oauth.build_authorization_url(None) {
        Ok(request) => request,
        Err(e) => {
            tracing::error!(error = %e, "Failed to build authorization URL");
            return (StatusCode::INTERNAL_SERVER_ERROR, e.to_user_message()).into_response();
        }
    };

    state.sessions.create(request.state.clone(), request.code_verifier, oauth::SESSION_TTL).await;

    let sessions = state.sessions.len().await;
    tracing::info!(state = %request.state, sessions,
        "OAuth session created, redirecting to authorization server");

    (StatusCode::FOUND, [("Location", request.url)]).into_response()
}

#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}

/// `GET /oauth/callback`
///
/// Completes the flow: resolves the pending session (read-once) and
/// exchanges the code for tokens. Every failure is a user-facing page;
/// the token endpoint is never contacted when the upstream already
/// reported an error or the callback is incomplete.
pub async fn handle_callback(
    State(state): State<Arc<HttpState>>,
    Query(query): Query<CallbackQuery>,
) -> Response {
    state.sessions.sweep_expired(Instant::now()).await;

    if let Some(ref error) = query.error {
        tracing::error!(error = %error, "Authorization server returned an error");
        return error_page(
            StatusCode::BAD_REQUEST,
            "OAuth Authorization Failed",
            error,
            "Please try again or contact support if the problem persists.",
        );
    }

    let (Some(code), Some(oauth_state)) = (query.code.as_deref(), query.state.as_deref()) else {
        tracing::error!("Callback missing authorization code or state");
        return error_page(
            StatusCode::BAD_REQUEST,
            "OAuth Authorization Failed",
            "Missing authorization code or state parameter",
            "The OAuth callback was incomplete. Please try again.",
        );
    };

    let Some(session) = state.sessions.resolve_and_delete(oauth_state).await else {
        tracing::error!(state = %oauth_state, "Invalid or expired state");
        return error_page(
            StatusCode::BAD_REQUEST,
            "OAuth Authorization Failed",
            &OAuthError::SessionNotFound.to_user_message(),
            "Authorization sessions expire after 10 minutes and can only be \
             used once.",
        );
    };

    let redirect_uri = state.ctx.config.oauth_redirect_uri.clone();
    match state.ctx.oauth.exchange_code_for_token(code, &session.code_verifier, &redirect_uri).await
    {
        Ok(token) => {
            tracing::info!("Successfully exchanged authorization code for access token");
            Html(pages::render_success_page(
                &token.masked_access_token(),
                &token.token_type,
                &token.scope,
            ))
            .into_response()
        }
        Err(e) => {
            tracing::error!(error = %e, "Token exchange failed");
            error_page(
                StatusCode::INTERNAL_SERVER_ERROR,
                "OAuth Token Exchange Failed",
                &e.to_user_message(),
                "Failed to exchange authorization code for access token. Please \
                 try again or check your OAuth configuration.",
            )
        }
    }
}

fn error_page(status: StatusCode, title: &str, message: &str, hint: &str) -> Response {
    (status, Html(pages::render_error_page(title, message, hint))).into_response()
}
