//! services/api/src/web/state.rs
//!
//! Defines the application's shared state.

use std::sync::Arc;

use crate::config::Config;
use support_chat_core::ports::ChatStore;
use support_chat_core::service::ChatService;

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Direct store access for the auth handlers.
    pub store: Arc<dyn ChatStore>,
    /// The chat orchestration service.
    pub chat: ChatService,
    pub config: Arc<Config>,
}
