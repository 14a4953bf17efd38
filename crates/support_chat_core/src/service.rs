//! crates/support_chat_core/src/service.rs
//!
//! The chat orchestration service. Validates input, turns uploaded files
//! into stored documents, builds the completion prompt from recent
//! documents, and appends the resulting turns to the conversation.

use std::sync::Arc;

use chrono::Utc;
use tracing::warn;

use crate::domain::{Document, Role, Turn};
use crate::ports::{ChatStore, CompletionService, PortError, PortResult};

/// How many of the user's most recent documents are offered to the
/// completion provider as context.
pub const CONTEXT_DOCUMENT_LIMIT: usize = 3;

/// Separator placed between document contents when more than one is
/// included in the prompt.
pub const DOCUMENT_SEPARATOR: &str = "\n\n---\n\n";

/// Reply returned when the completion provider fails or times out. The
/// conversation still records an assistant turn so the transcript is
/// never left with a lone user turn.
pub const FALLBACK_REPLY: &str =
    "I'm sorry, I'm having trouble answering right now. Please try again in a moment.";

const CONTEXT_SYSTEM_PROMPT: &str = "You are a helpful customer support assistant for our company. \
Use the following company documents to answer the user's question.\n\n{context}\n\n\
If the documents do not cover the question, answer from your general knowledge.";

const GENERIC_SYSTEM_PROMPT: &str = "You are a helpful customer support assistant. \
Answer the user's question clearly and concisely.";

/// Orchestrates a single chat request against the backing store and the
/// completion provider.
#[derive(Clone)]
pub struct ChatService {
    store: Arc<dyn ChatStore>,
    completion: Arc<dyn CompletionService>,
}

impl ChatService {
    pub fn new(store: Arc<dyn ChatStore>, completion: Arc<dyn CompletionService>) -> Self {
        Self { store, completion }
    }

    /// Handles a plain text message: builds the prompt from the user's
    /// recent documents, calls the provider, and appends the user and
    /// assistant turns.
    ///
    /// Provider failures are logged and degraded to [`FALLBACK_REPLY`]
    /// rather than surfaced to the caller.
    pub async fn send_message(&self, username: &str, content: &str) -> PortResult<String> {
        let content = content.trim();
        if content.is_empty() {
            return Err(PortError::Invalid(
                "message must not be blank".to_string(),
            ));
        }

        let documents = self
            .store
            .recent_documents(username, CONTEXT_DOCUMENT_LIMIT)
            .await?;
        let system_prompt = build_system_prompt(&documents);

        let reply = match self.completion.complete(&system_prompt, content).await {
            Ok(reply) => reply,
            Err(e) => {
                warn!(user = username, error = %e, "completion provider failed, returning fallback reply");
                FALLBACK_REPLY.to_string()
            }
        };

        let now = Utc::now();
        self.store
            .append_turns(
                username,
                &[
                    Turn::new(Role::User, content, now),
                    Turn::new(Role::Assistant, reply.clone(), now),
                ],
            )
            .await?;

        Ok(reply)
    }

    /// Handles a file upload whose text has already been extracted: stores
    /// the document and records the exchange as a user turn (the filename)
    /// followed by a system confirmation turn. The completion provider is
    /// not involved.
    pub async fn ingest_document(
        &self,
        username: &str,
        title: &str,
        text: &str,
    ) -> PortResult<String> {
        self.store.create_document(username, title, text).await?;

        let confirmation = format!(
            "Received \"{title}\". The assistant will use it to answer your questions."
        );

        let now = Utc::now();
        self.store
            .append_turns(
                username,
                &[
                    Turn::new(Role::User, title, now),
                    Turn::new(Role::System, confirmation.clone(), now),
                ],
            )
            .await?;

        Ok(confirmation)
    }

    /// The full ordered transcript for a user. Empty when the user has
    /// never sent a message.
    pub async fn history(&self, username: &str) -> PortResult<Vec<Turn>> {
        self.store.history(username).await
    }
}

/// The company-context preamble when the user has uploaded documents,
/// the generic support-agent preamble otherwise.
fn build_system_prompt(documents: &[Document]) -> String {
    if documents.is_empty() {
        return GENERIC_SYSTEM_PROMPT.to_string();
    }

    let context = documents
        .iter()
        .map(|d| d.content.as_str())
        .collect::<Vec<_>>()
        .join(DOCUMENT_SEPARATOR);

    CONTEXT_SYSTEM_PROMPT.replace("{context}", &context)
}
