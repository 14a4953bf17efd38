//! crates/support_chat_client/src/api.rs
//!
//! Transport contracts for the client-side state machines. The session
//! and conversation controllers only talk to these traits, so they can
//! be driven by the real HTTP adapter or by test doubles.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;

/// Errors from the transport layer.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("server returned {status}: {message}")]
    Api { status: u16, message: String },
}

impl ClientError {
    /// The server's error message when there is one, otherwise `fallback`.
    pub fn user_message(&self, fallback: &str) -> String {
        match self {
            ClientError::Api { message, .. } if !message.is_empty() => message.clone(),
            _ => fallback.to_string(),
        }
    }
}

/// One stored turn, as returned by the history endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct TurnDto {
    pub role: String,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

/// A file selected for upload.
#[derive(Debug, Clone)]
pub struct FileUpload {
    pub filename: String,
    pub content_type: String,
    pub data: Vec<u8>,
}

/// The authentication endpoints.
#[async_trait]
pub trait AuthApi: Send + Sync {
    async fn register(
        &self,
        username: &str,
        password: &str,
        confirm_password: &str,
    ) -> Result<(), ClientError>;

    async fn login(&self, username: &str, password: &str) -> Result<(), ClientError>;

    /// The username of the authenticated session, if any.
    async fn current_user(&self) -> Result<String, ClientError>;

    async fn logout(&self) -> Result<(), ClientError>;
}

/// The chat endpoints.
#[async_trait]
pub trait ChatApi: Send + Sync {
    async fn history(&self) -> Result<Vec<TurnDto>, ClientError>;

    /// Sends a message and/or a file; resolves to the assistant reply or
    /// the upload confirmation.
    async fn send(&self, message: &str, file: Option<FileUpload>) -> Result<String, ClientError>;
}
