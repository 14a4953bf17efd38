//! Client-side state machines and HTTP transport for the support chat
//! service. The controllers publish immutable snapshots over watch
//! channels; a UI subscribes and re-renders on change.

pub mod api;
pub mod conversation;
pub mod http;
pub mod session;

pub use api::{AuthApi, ChatApi, ClientError, FileUpload, TurnDto};
pub use conversation::{
    ConversationController, ConversationSnapshot, DisplayMessage, Sender,
    SEND_FAILURE_PLACEHOLDER,
};
pub use http::HttpClient;
pub use session::{AuthPhase, Route, SessionController, SessionSnapshot};
