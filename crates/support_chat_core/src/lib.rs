pub mod domain;
pub mod ports;
pub mod service;

pub use domain::{Document, Role, Turn, UserCredentials};
pub use ports::{ChatStore, CompletionService, PortError, PortResult};
pub use service::{ChatService, CONTEXT_DOCUMENT_LIMIT, FALLBACK_REPLY};
