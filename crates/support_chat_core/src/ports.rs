//! crates/support_chat_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to be independent of specific external implementations like databases or APIs.

use async_trait::async_trait;

use crate::domain::{Document, Turn, UserCredentials};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., database, network).
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("Already exists: {0}")]
    Conflict(String),
    #[error("Invalid input: {0}")]
    Invalid(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

/// Persistence boundary for user records, uploaded documents, and
/// per-user conversation transcripts.
#[async_trait]
pub trait ChatStore: Send + Sync {
    // --- Credential Store ---

    /// Creates a user record. Fails with `Conflict` if the username is taken.
    async fn create_user(&self, username: &str, password_hash: &str) -> PortResult<()>;

    /// Looks a user up by name. Fails with `NotFound` for unknown usernames.
    async fn get_user(&self, username: &str) -> PortResult<UserCredentials>;

    // --- Document Store ---

    async fn create_document(
        &self,
        username: &str,
        title: &str,
        content: &str,
    ) -> PortResult<Document>;

    /// The most recently uploaded documents for a user, newest first,
    /// capped at `limit`. Empty when the user has uploaded nothing.
    async fn recent_documents(&self, username: &str, limit: usize) -> PortResult<Vec<Document>>;

    // --- Conversation Store ---

    /// Appends turns to a user's conversation in the given order,
    /// creating the conversation lazily on first append.
    async fn append_turns(&self, username: &str, turns: &[Turn]) -> PortResult<()>;

    /// The full ordered transcript for a user; empty when no conversation
    /// exists yet.
    async fn history(&self, username: &str) -> PortResult<Vec<Turn>>;
}

/// The external text-completion API, treated as an opaque
/// request -> reply function.
#[async_trait]
pub trait CompletionService: Send + Sync {
    /// Produces an assistant reply for a single system + user exchange.
    /// No conversation history is carried beyond this one exchange.
    async fn complete(&self, system_prompt: &str, user_message: &str) -> PortResult<String>;
}
