//! services/api/src/web/chat.rs
//!
//! Chat endpoints: transcript retrieval and the send operation (plain
//! message or file upload as multipart form data).

use axum::{
    extract::{Extension, Multipart, State},
    Json,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use utoipa::ToSchema;

use crate::extract::extract_text;
use crate::web::error::RequestError;
use crate::web::middleware::AuthUser;
use crate::web::state::AppState;
use support_chat_core::domain::Turn;

//=========================================================================================
// Response Types
//=========================================================================================

#[derive(Serialize, ToSchema)]
pub struct TurnPayload {
    pub role: String,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl From<Turn> for TurnPayload {
    fn from(turn: Turn) -> Self {
        Self {
            role: turn.role.as_str().to_string(),
            content: turn.content,
            timestamp: turn.timestamp,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct HistoryResponse {
    pub messages: Vec<TurnPayload>,
}

#[derive(Serialize, ToSchema)]
pub struct ChatResponse {
    /// The assistant reply, or the upload confirmation for file sends.
    pub message: String,
}

//=========================================================================================
// Handlers
//=========================================================================================

/// GET /api/chat - The full conversation transcript for the current user
#[utoipa::path(
    get,
    path = "/api/chat",
    responses(
        (status = 200, description = "Ordered transcript, empty if the user has no conversation yet", body = HistoryResponse),
        (status = 401, description = "No session token"),
        (status = 403, description = "Invalid or expired token")
    )
)]
pub async fn history_handler(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(username)): Extension<AuthUser>,
) -> Result<Json<HistoryResponse>, RequestError> {
    let turns = state.chat.history(&username).await?;
    Ok(Json(HistoryResponse {
        messages: turns.into_iter().map(TurnPayload::from).collect(),
    }))
}

/// One parsed part of the upload form.
struct FilePart {
    filename: String,
    content_type: Option<String>,
    data: Vec<u8>,
}

/// POST /api/chat - Send a message and/or upload a file
///
/// Multipart form with an optional `message` text part and an optional
/// `file` part; at least one must be present. A file upload stores the
/// extracted text as context and returns a confirmation without calling
/// the completion provider.
#[utoipa::path(
    post,
    path = "/api/chat",
    request_body(content_type = "multipart/form-data", description = "Optional `message` text part and optional `file` part."),
    responses(
        (status = 200, description = "Assistant reply or upload confirmation", body = ChatResponse),
        (status = 400, description = "Neither message nor file present, or malformed input"),
        (status = 413, description = "File exceeds the upload size limit"),
        (status = 415, description = "File is neither plain text nor PDF")
    )
)]
pub async fn send_handler(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(username)): Extension<AuthUser>,
    mut multipart: Multipart,
) -> Result<Json<ChatResponse>, RequestError> {
    let mut message: Option<String> = None;
    let mut file: Option<FilePart> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| RequestError::Validation(format!("Malformed multipart body: {e}")))?
    {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("message") => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| RequestError::Validation(format!("Unreadable message: {e}")))?;
                message = Some(text);
            }
            Some("file") => {
                let filename = field.file_name().unwrap_or("upload.txt").to_string();
                let content_type = field.content_type().map(str::to_string);
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| RequestError::Validation(format!("Unreadable file: {e}")))?;
                file = Some(FilePart {
                    filename,
                    content_type,
                    data: data.to_vec(),
                });
            }
            // Unknown parts are ignored.
            _ => {}
        }
    }

    // The file path wins when both parts are present; it never touches
    // the completion provider.
    let reply = if let Some(part) = file {
        let text = extract_text(&part.filename, part.content_type.as_deref(), &part.data)?;
        state
            .chat
            .ingest_document(&username, &part.filename, &text)
            .await?
    } else {
        let content = message.ok_or_else(|| {
            RequestError::Validation("A message or a file is required".to_string())
        })?;
        state.chat.send_message(&username, &content).await?
    };

    Ok(Json(ChatResponse { message: reply }))
}
