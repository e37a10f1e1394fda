/// Identity provider sessions
///
/// Sign-in itself happens at the external provider. This module only models
/// the resulting session and lets the rest of the client observe changes to
/// it through a `watch` channel.

use mastery_shared::models::UserId;
use tokio::sync::watch;

/// Signed-in user as reported by the provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionUser {
    pub id: UserId,
    pub email: Option<String>,
}

/// Active provider session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub user: SessionUser,

    /// Bearer token accepted by the API
    pub access_token: String,
}

impl Session {
    pub fn new(id: UserId, email: Option<String>, access_token: impl Into<String>) -> Self {
        Self {
            user: SessionUser { id, email },
            access_token: access_token.into(),
        }
    }
}

/// Source of session changes
pub trait IdentityProvider: Send + Sync {
    /// Receiver that yields the current session and every later change.
    fn subscribe(&self) -> watch::Receiver<Option<Session>>;

    fn current(&self) -> Option<Session> {
        self.subscribe().borrow().clone()
    }
}

/// In-process provider driven by explicit sign-in and sign-out calls
#[derive(Debug)]
pub struct ManualIdentity {
    tx: watch::Sender<Option<Session>>,
}

impl ManualIdentity {
    pub fn new(initial: Option<Session>) -> Self {
        let (tx, _rx) = watch::channel(initial);
        Self { tx }
    }

    pub fn sign_in(&self, session: Session) {
        tracing::info!(user_id = %session.user.id, "Signed in");
        self.tx.send_replace(Some(session));
    }

    pub fn sign_out(&self) {
        tracing::info!("Signed out");
        self.tx.send_replace(None);
    }
}

impl Default for ManualIdentity {
    fn default() -> Self {
        Self::new(None)
    }
}

impl IdentityProvider for ManualIdentity {
    fn subscribe(&self) -> watch::Receiver<Option<Session>> {
        self.tx.subscribe()
    }
}
