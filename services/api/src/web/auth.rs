//! services/api/src/web/auth.rs
//!
//! Authentication endpoints for user registration, login, current-user
//! lookup, and logout.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use axum::{
    extract::{Extension, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error};
use utoipa::ToSchema;

use crate::token::{self, TOKEN_TTL_SECS};
use crate::web::error::RequestError;
use crate::web::middleware::AuthUser;
use crate::web::state::AppState;
use support_chat_core::ports::PortError;

//=========================================================================================
// Request/Response Types
//=========================================================================================

#[derive(Deserialize, ToSchema)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
    /// Optional confirmation; when present it must match `password`.
    #[serde(default)]
    pub confirm_password: Option<String>,
}

#[derive(Deserialize, ToSchema)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Serialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Serialize, ToSchema)]
pub struct UserPayload {
    pub username: String,
}

#[derive(Serialize, ToSchema)]
pub struct UserResponse {
    pub user: UserPayload,
}

//=========================================================================================
// Password Hashing Helpers
//=========================================================================================

/// Hash a password using Argon2 with a fresh salt.
pub fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let hash = argon2.hash_password(password.as_bytes(), &salt)?;
    Ok(hash.to_string())
}

/// Verify a password against a stored hash.
pub fn verify_password(password: &str, hash: &str) -> bool {
    let parsed_hash = match PasswordHash::new(hash) {
        Ok(h) => h,
        Err(_) => return false,
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok()
}

fn validate_credentials(username: &str, password: &str) -> Result<(), RequestError> {
    if username.trim().is_empty() || password.is_empty() {
        return Err(RequestError::Validation(
            "Username and password are required".to_string(),
        ));
    }
    if username.len() < 3 || username.len() > 32 {
        return Err(RequestError::Validation(
            "Username must be between 3 and 32 characters".to_string(),
        ));
    }
    if !username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(RequestError::Validation(
            "Username may only contain letters, digits, dashes and underscores".to_string(),
        ));
    }
    Ok(())
}

//=========================================================================================
// Session Cookie Helpers
//=========================================================================================

/// Builds the session cookie. Production-like deployments run the client
/// on a different origin, so they need `SameSite=None; Secure`.
fn session_cookie(token: &str, production: bool) -> String {
    let attributes = if production {
        "SameSite=None; Secure"
    } else {
        "SameSite=Lax"
    };
    format!("token={token}; HttpOnly; Path=/; Max-Age={TOKEN_TTL_SECS}; {attributes}")
}

fn cleared_cookie(production: bool) -> String {
    let attributes = if production {
        "SameSite=None; Secure"
    } else {
        "SameSite=Lax"
    };
    format!("token=; HttpOnly; Path=/; Max-Age=0; {attributes}")
}

//=========================================================================================
// Handlers
//=========================================================================================

/// POST /api/auth/register - Create a new user account
#[utoipa::path(
    post,
    path = "/api/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "User created successfully", body = MessageResponse),
        (status = 400, description = "Missing or mismatched fields"),
        (status = 409, description = "Username already taken"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn register_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RegisterRequest>,
) -> Result<impl IntoResponse, RequestError> {
    validate_credentials(&req.username, &req.password)?;
    if let Some(confirm) = &req.confirm_password {
        if confirm != &req.password {
            return Err(RequestError::Validation(
                "Passwords do not match".to_string(),
            ));
        }
    }

    let password_hash = hash_password(&req.password).map_err(|e| {
        error!("Failed to hash password: {:?}", e);
        RequestError::Internal("Failed to hash password".to_string())
    })?;

    state
        .store
        .create_user(&req.username, &password_hash)
        .await
        .map_err(|e| match e {
            PortError::Conflict(_) => {
                RequestError::Conflict("Username already taken".to_string())
            }
            other => {
                error!("Failed to create user: {:?}", other);
                RequestError::Internal("Failed to create user".to_string())
            }
        })?;

    // No auto-login: the user signs in explicitly afterwards.
    Ok((
        StatusCode::CREATED,
        Json(MessageResponse {
            message: "Registration successful. Please log in.".to_string(),
        }),
    ))
}

/// POST /api/auth/login - Login with existing account
#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = MessageResponse),
        (status = 401, description = "Invalid credentials"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn login_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, RequestError> {
    // Unknown user and wrong password produce the same response.
    let user = state.store.get_user(&req.username).await.map_err(|e| {
        debug!("Login failed for '{}': {}", req.username, e);
        RequestError::InvalidCredentials
    })?;

    if !verify_password(&req.password, &user.password_hash) {
        return Err(RequestError::InvalidCredentials);
    }

    let token = token::mint(&user.username, &state.config.jwt_secret).map_err(|e| {
        error!("Failed to sign session token: {:?}", e);
        RequestError::Internal("Failed to create session".to_string())
    })?;

    let cookie = session_cookie(&token, state.config.production);

    Ok((
        StatusCode::OK,
        [(header::SET_COOKIE, cookie)],
        Json(MessageResponse {
            message: "Login Successful".to_string(),
        }),
    ))
}

/// GET /api/auth/user - The currently authenticated user
#[utoipa::path(
    get,
    path = "/api/auth/user",
    responses(
        (status = 200, description = "The authenticated user", body = UserResponse),
        (status = 401, description = "No session token"),
        (status = 403, description = "Invalid or expired token")
    )
)]
pub async fn current_user_handler(
    Extension(AuthUser(username)): Extension<AuthUser>,
) -> Json<UserResponse> {
    Json(UserResponse {
        user: UserPayload { username },
    })
}

/// POST /api/auth/logout - Clear the session cookie
///
/// Always succeeds, with or without a valid token.
#[utoipa::path(
    post,
    path = "/api/auth/logout",
    responses(
        (status = 200, description = "Session cookie cleared", body = MessageResponse)
    )
)]
pub async fn logout_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let cookie = cleared_cookie(state.config.production);
    (
        StatusCode::OK,
        [(header::SET_COOKIE, cookie)],
        Json(MessageResponse {
            message: "Logged out".to_string(),
        }),
    )
}
