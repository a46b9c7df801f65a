//! Process-wide observable session.
//!
//! One [`SessionStore`] is created at startup and handed to every component
//! that needs the current user. Components read the latest value or subscribe
//! to changes; nothing talks to the auth provider on its own.

use tokio::sync::watch;

use crate::auth::{AuthSession, AuthUser, SessionRestorer};
use crate::store::Actor;
use crate::Result;

/// What is known about the signed-in user.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SessionState {
    /// Restoration has not finished yet.
    #[default]
    Loading,
    SignedOut,
    SignedIn(AuthSession),
}

impl SessionState {
    #[must_use]
    pub const fn session(&self) -> Option<&AuthSession> {
        match self {
            Self::SignedIn(session) => Some(session),
            Self::Loading | Self::SignedOut => None,
        }
    }

    #[must_use]
    pub const fn is_loading(&self) -> bool {
        matches!(self, Self::Loading)
    }
}

#[derive(Debug, Clone)]
pub struct SessionStore {
    sender: watch::Sender<SessionState>,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStore {
    #[must_use]
    pub fn new() -> Self {
        let (sender, _receiver) = watch::channel(SessionState::Loading);
        Self { sender }
    }

    /// Restore the persisted session and publish the outcome.
    ///
    /// A restore failure is published as signed-out and returned.
    pub async fn init(&self, restorer: &dyn SessionRestorer) -> Result<SessionState> {
        match restorer.restore_session().await {
            Ok(Some(session)) => {
                tracing::debug!(user_id = %session.user.id, "Restored session");
                self.publish(SessionState::SignedIn(session));
            }
            Ok(None) => self.publish(SessionState::SignedOut),
            Err(error) => {
                self.publish(SessionState::SignedOut);
                return Err(error.into());
            }
        }
        Ok(self.current())
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.sender.subscribe()
    }

    #[must_use]
    pub fn current(&self) -> SessionState {
        self.sender.borrow().clone()
    }

    #[must_use]
    pub fn current_user(&self) -> Option<AuthUser> {
        self.sender.borrow().session().map(|session| session.user.clone())
    }

    /// The actor to attach to mutations, when signed in.
    #[must_use]
    pub fn actor(&self) -> Option<Actor> {
        self.sender.borrow().session().map(Actor::from)
    }

    pub fn set_signed_in(&self, session: AuthSession) {
        self.publish(SessionState::SignedIn(session));
    }

    pub fn sign_out(&self) {
        self.publish(SessionState::SignedOut);
    }

    /// Publish a final signed-out state for any remaining subscribers.
    pub fn teardown(&self) {
        self.publish(SessionState::SignedOut);
        tracing::debug!(
            subscribers = self.sender.receiver_count(),
            "Session store torn down"
        );
    }

    fn publish(&self, state: SessionState) {
        self.sender.send_if_modified(|current| {
            if *current == state {
                false
            } else {
                *current = state;
                true
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{AuthError, AuthResult};
    use async_trait::async_trait;

    struct FixedRestorer(Option<AuthSession>);

    #[async_trait]
    impl SessionRestorer for FixedRestorer {
        async fn restore_session(&self) -> AuthResult<Option<AuthSession>> {
            Ok(self.0.clone())
        }
    }

    struct FailingRestorer;

    #[async_trait]
    impl SessionRestorer for FailingRestorer {
        async fn restore_session(&self) -> AuthResult<Option<AuthSession>> {
            Err(AuthError::SecureStorage("keychain locked".to_string()))
        }
    }

    fn session(user_id: &str) -> AuthSession {
        AuthSession {
            access_token: format!("{user_id}-token"),
            refresh_token: "refresh".to_string(),
            expires_at: i64::MAX,
            user: AuthUser {
                id: user_id.to_string(),
                email: Some(format!("{user_id}@example.com")),
            },
        }
    }

    #[tokio::test]
    async fn starts_loading_then_resolves() {
        let store = SessionStore::new();
        assert!(store.current().is_loading());

        let state = store
            .init(&FixedRestorer(Some(session("alice"))))
            .await
            .unwrap();
        assert_eq!(state, SessionState::SignedIn(session("alice")));
        assert_eq!(store.current_user().unwrap().id, "alice");
        assert_eq!(store.actor().unwrap().access_token, "alice-token");
    }

    #[tokio::test]
    async fn restore_failure_publishes_signed_out() {
        let store = SessionStore::new();
        assert!(store.init(&FailingRestorer).await.is_err());
        assert_eq!(store.current(), SessionState::SignedOut);
    }

    #[tokio::test]
    async fn subscribers_observe_changes() {
        let store = SessionStore::new();
        let mut first = store.subscribe();
        let mut second = store.subscribe();

        store.set_signed_in(session("bob"));
        first.changed().await.unwrap();
        second.changed().await.unwrap();
        assert_eq!(
            first.borrow().session().map(|s| s.user.id.clone()),
            Some("bob".to_string())
        );

        store.sign_out();
        second.changed().await.unwrap();
        assert_eq!(*second.borrow(), SessionState::SignedOut);
    }

    #[tokio::test]
    async fn unchanged_state_does_not_notify() {
        let store = SessionStore::new();
        store.sign_out();
        let mut receiver = store.subscribe();
        receiver.mark_unchanged();

        store.sign_out();
        assert!(!receiver.has_changed().unwrap());

        store.teardown();
        assert!(!receiver.has_changed().unwrap());
        assert!(store.actor().is_none());
    }
}
