//! services/api/src/web/mod.rs
//!
//! Handlers, middleware, shared state, and the router assembly for the
//! HTTP API, plus the master OpenAPI definition.

pub mod auth;
pub mod chat;
pub mod error;
pub mod middleware;
pub mod state;

use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    http::{
        header::{ACCEPT, CONTENT_TYPE},
        HeaderValue, Method,
    },
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;
use utoipa::OpenApi;

use crate::extract::MAX_UPLOAD_BYTES;
use state::AppState;

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        auth::register_handler,
        auth::login_handler,
        auth::current_user_handler,
        auth::logout_handler,
        chat::history_handler,
        chat::send_handler,
    ),
    components(
        schemas(
            auth::RegisterRequest,
            auth::LoginRequest,
            auth::MessageResponse,
            auth::UserPayload,
            auth::UserResponse,
            chat::TurnPayload,
            chat::HistoryResponse,
            chat::ChatResponse,
        )
    ),
    tags(
        (name = "Support Chat API", description = "Authentication and AI chat endpoints.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// Router Assembly
//=========================================================================================

/// Builds the API router over the shared state. Used by the binary and
/// by the integration tests.
pub fn router(state: Arc<AppState>) -> Router {
    // Public routes (no auth required). Logout stays public on purpose:
    // clearing the cookie must work even with an expired token.
    let public_routes = Router::new()
        .route("/api/auth/register", post(auth::register_handler))
        .route("/api/auth/login", post(auth::login_handler))
        .route("/api/auth/logout", post(auth::logout_handler));

    // Protected routes (auth required).
    let protected_routes = Router::new()
        .route("/api/auth/user", get(auth::current_user_handler))
        .route(
            "/api/chat",
            get(chat::history_handler).post(chat::send_handler),
        )
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::require_auth,
        ));

    let allowed_origin = state
        .config
        .frontend_origin
        .parse::<HeaderValue>()
        .unwrap_or_else(|_| HeaderValue::from_static("http://localhost:5173"));
    let cors = CorsLayer::new()
        .allow_origin(allowed_origin)
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE, ACCEPT]);

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        // Leave room above the 5 MB per-file cap so the cap itself,
        // not the transport limit, produces the 413.
        .layer(DefaultBodyLimit::max(2 * MAX_UPLOAD_BYTES))
        .layer(cors)
        .with_state(state)
}
