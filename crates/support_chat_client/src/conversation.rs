//! crates/support_chat_client/src/conversation.rs
//!
//! The client conversation state machine: the in-memory message list, a
//! typing flag, and the optimistic send. Sending is an explicit
//! two-phase append: phase 1 synchronously appends the pending user
//! message, phase 2 appends the server's resolution. The phase-1 entry
//! is never retracted, so the list always records what the user sent.

use std::sync::Arc;

use chrono::{DateTime, Datelike, Utc};
use tokio::sync::watch;
use tracing::warn;

use crate::api::{ChatApi, FileUpload, TurnDto};

/// Placeholder appended when the send request itself fails.
pub const SEND_FAILURE_PLACEHOLDER: &str = "Sorry, something went wrong.";

/// Who a display message is attributed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sender {
    User,
    Ai,
    System,
}

impl Sender {
    fn from_role(role: &str) -> Sender {
        match role {
            "user" => Sender::User,
            "system" => Sender::System,
            _ => Sender::Ai,
        }
    }
}

/// One rendered chat bubble.
#[derive(Debug, Clone)]
pub struct DisplayMessage {
    pub sender: Sender,
    pub text: String,
    /// Set when the message was a file upload.
    pub file_name: Option<String>,
    pub time: String,
}

/// An immutable view of the conversation state.
#[derive(Debug, Clone, Default)]
pub struct ConversationSnapshot {
    pub messages: Vec<DisplayMessage>,
    /// True while a send is waiting on the assistant.
    pub typing: bool,
    /// True while history is being (re)loaded.
    pub loading: bool,
}

/// Drives the conversation state machine against a [`ChatApi`].
#[derive(Clone)]
pub struct ConversationController {
    api: Arc<dyn ChatApi>,
    tx: Arc<watch::Sender<ConversationSnapshot>>,
}

impl ConversationController {
    pub fn new(api: Arc<dyn ChatApi>) -> Self {
        let (tx, _rx) = watch::channel(ConversationSnapshot::default());
        Self {
            api,
            tx: Arc::new(tx),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<ConversationSnapshot> {
        self.tx.subscribe()
    }

    pub fn snapshot(&self) -> ConversationSnapshot {
        self.tx.borrow().clone()
    }

    fn emit(&self, snapshot: ConversationSnapshot) {
        self.tx.send_replace(snapshot);
    }

    /// Replaces the message list with the stored transcript. `loading`
    /// is cleared regardless of outcome.
    pub async fn load_chat(&self) {
        self.emit(ConversationSnapshot {
            loading: true,
            ..self.snapshot()
        });

        let result = self.api.history().await;

        let mut snapshot = self.snapshot();
        snapshot.loading = false;
        match result {
            Ok(turns) => {
                let now = Utc::now();
                snapshot.messages = turns
                    .into_iter()
                    .map(|turn| display_message(turn, now))
                    .collect();
            }
            Err(e) => warn!("failed to load chat history: {e}"),
        }
        self.emit(snapshot);
    }

    /// Sends a message and/or a file.
    ///
    /// Phase 1 appends the pending user message before the network call,
    /// so the UI reflects the send immediately. Phase 2 appends exactly
    /// one message: the reply, or a failure placeholder. `typing` is
    /// cleared regardless of outcome.
    pub async fn send_message(&self, content: &str, file: Option<FileUpload>) {
        let file_name = file.as_ref().map(|f| f.filename.clone());
        let pending_text = match &file_name {
            Some(name) => name.clone(),
            None => content.to_string(),
        };

        // Phase 1: local, synchronous.
        let mut snapshot = self.snapshot();
        snapshot.messages.push(DisplayMessage {
            sender: Sender::User,
            text: pending_text,
            file_name,
            time: format_timestamp(Utc::now(), Utc::now()),
        });
        snapshot.typing = true;
        self.emit(snapshot);

        // Phase 2: on completion, append the resolution.
        let result = self.api.send(content, file).await;

        let mut snapshot = self.snapshot();
        let text = match result {
            Ok(reply) => reply,
            Err(e) => {
                warn!("send failed: {e}");
                SEND_FAILURE_PLACEHOLDER.to_string()
            }
        };
        snapshot.messages.push(DisplayMessage {
            sender: Sender::Ai,
            text,
            file_name: None,
            time: format_timestamp(Utc::now(), Utc::now()),
        });
        snapshot.typing = false;
        self.emit(snapshot);
    }
}

fn display_message(turn: TurnDto, now: DateTime<Utc>) -> DisplayMessage {
    DisplayMessage {
        sender: Sender::from_role(&turn.role),
        text: turn.content,
        file_name: None,
        time: format_timestamp(turn.timestamp, now),
    }
}

/// Formats a turn timestamp for display relative to `now`: recent turns
/// get a relative label, older same-day turns a clock time, everything
/// else the date.
pub fn format_timestamp(ts: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let elapsed = now.signed_duration_since(ts);
    let minutes = elapsed.num_minutes();

    if minutes < 1 {
        "just now".to_string()
    } else if minutes < 60 {
        format!("{minutes}m ago")
    } else if ts.ordinal() == now.ordinal() && ts.year() == now.year() {
        ts.format("%H:%M").to_string()
    } else {
        ts.format("%b %e, %H:%M").to_string()
    }
}
