//! services/api/src/web/error.rs
//!
//! Per-request error taxonomy. Every handler failure maps onto one of
//! these variants, which render as an HTTP status plus a JSON error
//! envelope.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::extract::ExtractError;
use support_chat_core::ports::PortError;

#[derive(Debug, thiserror::Error)]
pub enum RequestError {
    /// Bad or missing input (400).
    #[error("{0}")]
    Validation(String),

    /// Duplicate registration (409).
    #[error("{0}")]
    Conflict(String),

    /// Unknown user or wrong password (401). One generic message for
    /// both so the endpoint cannot be used to enumerate usernames.
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// No session token was presented (401).
    #[error("Not authenticated")]
    Unauthenticated,

    /// A token was presented but its signature or expiry failed (403).
    /// Distinct from `Unauthenticated` so the client can tell "never
    /// logged in" from "session expired".
    #[error("Invalid or expired token")]
    InvalidToken,

    /// Upload of a type other than plain text or PDF (415).
    #[error("Unsupported file type: {0}")]
    UnsupportedType(String),

    /// Upload above the fixed size limit (413).
    #[error("File exceeds the upload size limit")]
    PayloadTooLarge,

    /// Catch-all (500).
    #[error("{0}")]
    Internal(String),
}

impl RequestError {
    fn status(&self) -> StatusCode {
        match self {
            RequestError::Validation(_) => StatusCode::BAD_REQUEST,
            RequestError::Conflict(_) => StatusCode::CONFLICT,
            RequestError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            RequestError::Unauthenticated => StatusCode::UNAUTHORIZED,
            RequestError::InvalidToken => StatusCode::FORBIDDEN,
            RequestError::UnsupportedType(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            RequestError::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            RequestError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for RequestError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Internal error detail stays in the logs outside debug builds.
        let message = match &self {
            RequestError::Internal(detail) => {
                tracing::error!(error = %detail, "internal error while handling request");
                if cfg!(debug_assertions) {
                    detail.clone()
                } else {
                    "Internal server error".to_string()
                }
            }
            other => other.to_string(),
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

impl From<PortError> for RequestError {
    fn from(e: PortError) -> Self {
        match e {
            PortError::Invalid(msg) => RequestError::Validation(msg),
            PortError::Conflict(msg) => RequestError::Conflict(msg),
            PortError::NotFound(msg) => RequestError::Internal(msg),
            PortError::Unexpected(msg) => RequestError::Internal(msg),
        }
    }
}

impl From<ExtractError> for RequestError {
    fn from(e: ExtractError) -> Self {
        match e {
            ExtractError::TooLarge => RequestError::PayloadTooLarge,
            ExtractError::UnsupportedType(what) => RequestError::UnsupportedType(what),
            ExtractError::Malformed(msg) => RequestError::Validation(msg),
        }
    }
}
