//! services/api/src/web/middleware.rs
//!
//! Authentication middleware for protecting routes.

use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use tracing::debug;

use crate::token;
use crate::web::error::RequestError;
use crate::web::state::AppState;

/// The authenticated username, inserted into request extensions by
/// [`require_auth`].
#[derive(Debug, Clone)]
pub struct AuthUser(pub String);

/// Pulls the `token` cookie out of a Cookie header value.
fn token_cookie(cookie_header: &str) -> Option<&str> {
    cookie_header
        .split(';')
        .find_map(|c| c.trim().strip_prefix("token="))
        .filter(|t| !t.is_empty())
}

/// Middleware that validates the session cookie and extracts the username.
///
/// A missing token is 401 while a bad or expired one is 403, so callers
/// can distinguish "never logged in" from "session expired".
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<Response, RequestError> {
    let token = req
        .headers()
        .get(header::COOKIE)
        .and_then(|v| v.to_str().ok())
        .and_then(token_cookie)
        .ok_or(RequestError::Unauthenticated)?;

    let username = token::verify(token, &state.config.jwt_secret).map_err(|e| {
        debug!("Rejected session token: {e}");
        RequestError::InvalidToken
    })?;

    req.extensions_mut().insert(AuthUser(username));
    Ok(next.run(req).await)
}
