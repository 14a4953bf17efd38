//! crates/support_chat_client/src/session.rs
//!
//! The client session state machine: tracks authentication status and
//! drives route access. State changes are published as immutable
//! snapshots on a watch channel; views subscribe and re-render on
//! change.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::warn;

use crate::api::AuthApi;

/// Authentication phase. `Unknown` is the state before the first
/// `refresh`; `Loading` while a current-user fetch is in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthPhase {
    #[default]
    Unknown,
    Loading,
    Authenticated,
    Unauthenticated,
}

/// Which view the session is allowed to see.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Login,
    Chat,
}

/// An immutable view of the session state.
#[derive(Debug, Clone, Default)]
pub struct SessionSnapshot {
    pub phase: AuthPhase,
    pub username: Option<String>,
    /// Last auth failure, shown on the login view.
    pub error: Option<String>,
    /// Last success notice (e.g. after registration).
    pub notice: Option<String>,
}

impl SessionSnapshot {
    pub fn is_authenticated(&self) -> bool {
        self.phase == AuthPhase::Authenticated
    }

    /// Route gating: only an authenticated session may view the chat;
    /// every other phase lands on the login view. The login view in turn
    /// redirects authenticated sessions to the chat.
    pub fn route(&self) -> Route {
        if self.is_authenticated() {
            Route::Chat
        } else {
            Route::Login
        }
    }
}

/// Drives the session state machine against an [`AuthApi`].
#[derive(Clone)]
pub struct SessionController {
    api: Arc<dyn AuthApi>,
    tx: Arc<watch::Sender<SessionSnapshot>>,
}

impl SessionController {
    pub fn new(api: Arc<dyn AuthApi>) -> Self {
        let (tx, _rx) = watch::channel(SessionSnapshot::default());
        Self {
            api,
            tx: Arc::new(tx),
        }
    }

    /// A receiver that observes every snapshot change.
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.tx.subscribe()
    }

    /// The current snapshot.
    pub fn snapshot(&self) -> SessionSnapshot {
        self.tx.borrow().clone()
    }

    fn emit(&self, snapshot: SessionSnapshot) {
        self.tx.send_replace(snapshot);
    }

    /// Re-fetches the current user: `Loading` while in flight, then
    /// `Authenticated` or `Unauthenticated`.
    pub async fn refresh(&self) {
        self.emit(SessionSnapshot {
            phase: AuthPhase::Loading,
            ..self.snapshot()
        });

        match self.api.current_user().await {
            Ok(username) => self.emit(SessionSnapshot {
                phase: AuthPhase::Authenticated,
                username: Some(username),
                error: None,
                notice: None,
            }),
            Err(_) => self.emit(SessionSnapshot {
                phase: AuthPhase::Unauthenticated,
                username: None,
                ..self.snapshot()
            }),
        }
    }

    /// Attempts a login; on success the session is re-fetched from the
    /// server rather than assumed.
    pub async fn login(&self, username: &str, password: &str) {
        match self.api.login(username, password).await {
            Ok(()) => self.refresh().await,
            Err(e) => self.emit(SessionSnapshot {
                phase: AuthPhase::Unauthenticated,
                username: None,
                error: Some(e.user_message("Login failed")),
                notice: None,
            }),
        }
    }

    /// Registers a new account. Does not log in; the user is pointed at
    /// the login form via `notice`.
    pub async fn register(&self, username: &str, password: &str, confirm_password: &str) {
        if password != confirm_password {
            self.emit(SessionSnapshot {
                error: Some("Passwords do not match".to_string()),
                notice: None,
                ..self.snapshot()
            });
            return;
        }

        match self.api.register(username, password, confirm_password).await {
            Ok(()) => self.emit(SessionSnapshot {
                error: None,
                notice: Some("Registration successful. Please log in.".to_string()),
                ..self.snapshot()
            }),
            Err(e) => self.emit(SessionSnapshot {
                error: Some(e.user_message("Registration failed")),
                notice: None,
                ..self.snapshot()
            }),
        }
    }

    /// Logs out. Local authenticated state is cleared whether or not the
    /// network call succeeds.
    pub async fn logout(&self) {
        if let Err(e) = self.api.logout().await {
            warn!("logout request failed: {e}");
        }

        self.emit(SessionSnapshot {
            phase: AuthPhase::Unauthenticated,
            username: None,
            error: None,
            notice: None,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ClientError;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use tokio::sync::Notify;

    #[derive(Default)]
    struct FakeAuth {
        user: Mutex<Option<String>>,
        fail_login: bool,
        fail_logout: bool,
        register_calls: AtomicUsize,
        /// When set, `current_user` parks until notified.
        gate: Option<Arc<Notify>>,
    }

    fn api_error(status: u16, message: &str) -> ClientError {
        ClientError::Api {
            status,
            message: message.to_string(),
        }
    }

    #[async_trait]
    impl AuthApi for FakeAuth {
        async fn register(
            &self,
            _username: &str,
            _password: &str,
            _confirm_password: &str,
        ) -> Result<(), ClientError> {
            self.register_calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn login(&self, username: &str, _password: &str) -> Result<(), ClientError> {
            if self.fail_login {
                return Err(api_error(401, "Invalid credentials"));
            }
            *self.user.lock().unwrap() = Some(username.to_string());
            Ok(())
        }

        async fn current_user(&self) -> Result<String, ClientError> {
            if let Some(gate) = &self.gate {
                gate.notified().await;
            }
            self.user
                .lock()
                .unwrap()
                .clone()
                .ok_or_else(|| api_error(401, "Not authenticated"))
        }

        async fn logout(&self) -> Result<(), ClientError> {
            if self.fail_logout {
                return Err(api_error(500, "boom"));
            }
            *self.user.lock().unwrap() = None;
            Ok(())
        }
    }

    #[tokio::test]
    async fn refresh_resolves_to_unauthenticated_without_a_session() {
        let session = SessionController::new(Arc::new(FakeAuth::default()));
        session.refresh().await;

        let snapshot = session.snapshot();
        assert_eq!(snapshot.phase, AuthPhase::Unauthenticated);
        assert_eq!(snapshot.route(), Route::Login);
    }

    #[tokio::test]
    async fn refresh_passes_through_loading() {
        let gate = Arc::new(Notify::new());
        let auth = FakeAuth {
            gate: Some(gate.clone()),
            ..FakeAuth::default()
        };
        let session = SessionController::new(Arc::new(auth));
        let mut rx = session.subscribe();

        let task = {
            let session = session.clone();
            tokio::spawn(async move { session.refresh().await })
        };

        rx.wait_for(|s| s.phase == AuthPhase::Loading).await.unwrap();
        gate.notify_one();
        task.await.unwrap();

        assert_eq!(session.snapshot().phase, AuthPhase::Unauthenticated);
    }

    #[tokio::test]
    async fn login_refetches_and_authenticates() {
        let session = SessionController::new(Arc::new(FakeAuth::default()));
        session.login("alice", "pw").await;

        let snapshot = session.snapshot();
        assert_eq!(snapshot.phase, AuthPhase::Authenticated);
        assert_eq!(snapshot.username.as_deref(), Some("alice"));
        assert_eq!(snapshot.route(), Route::Chat);
        assert!(snapshot.error.is_none());
    }

    #[tokio::test]
    async fn failed_login_surfaces_the_server_message() {
        let auth = FakeAuth {
            fail_login: true,
            ..FakeAuth::default()
        };
        let session = SessionController::new(Arc::new(auth));
        session.login("alice", "wrong").await;

        let snapshot = session.snapshot();
        assert_eq!(snapshot.phase, AuthPhase::Unauthenticated);
        assert_eq!(snapshot.error.as_deref(), Some("Invalid credentials"));
    }

    #[tokio::test]
    async fn register_rejects_mismatched_confirmation_locally() {
        let auth = Arc::new(FakeAuth::default());
        let session = SessionController::new(auth.clone());
        session.register("alice", "one", "two").await;

        assert_eq!(auth.register_calls.load(Ordering::SeqCst), 0);
        assert_eq!(
            session.snapshot().error.as_deref(),
            Some("Passwords do not match")
        );
    }

    #[tokio::test]
    async fn register_success_notifies_without_logging_in() {
        let session = SessionController::new(Arc::new(FakeAuth::default()));
        session.register("alice", "pw", "pw").await;

        let snapshot = session.snapshot();
        assert!(snapshot.notice.is_some());
        assert_ne!(snapshot.phase, AuthPhase::Authenticated);
    }

    #[tokio::test]
    async fn logout_clears_local_state_even_when_the_request_fails() {
        let auth = FakeAuth {
            fail_logout: true,
            ..FakeAuth::default()
        };
        let session = SessionController::new(Arc::new(auth));
        session.login("alice", "pw").await;
        assert!(session.snapshot().is_authenticated());

        session.logout().await;

        let snapshot = session.snapshot();
        assert!(!snapshot.is_authenticated());
        assert_eq!(snapshot.phase, AuthPhase::Unauthenticated);
        assert!(snapshot.username.is_none());
    }
}
