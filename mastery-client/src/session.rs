/// Session context
///
/// Follows the identity provider and keeps the signed-in user's account
/// loaded. Consumers read the latest [`SessionSnapshot`] or subscribe to
/// changes; there is one context per running client, owned by whoever
/// started it, and it unsubscribes from the provider when shut down or
/// dropped.
///
/// # Example
///
/// ```no_run
/// use mastery_client::identity::ManualIdentity;
/// use mastery_client::session::SessionContext;
/// use mastery_client::source::StoreSource;
/// use mastery_shared::store::InMemoryStore;
/// use std::sync::Arc;
///
/// # async fn example() {
/// let identity = Arc::new(ManualIdentity::default());
/// let source = Arc::new(StoreSource::new(Arc::new(InMemoryStore::new())));
///
/// let context = SessionContext::start(identity, source);
/// let snapshot = context.loaded().await;
/// assert!(snapshot.session.is_none());
/// # }
/// ```

use crate::gate::AuthState;
use crate::identity::{IdentityProvider, Session, SessionUser};
use crate::source::AccountSource;
use mastery_shared::models::Account;
use std::sync::Arc;
use tokio::sync::{watch, Notify};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Published session state
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSnapshot {
    /// A session change or refresh is being resolved
    pub loading: bool,

    pub session: Option<Session>,

    /// Account of the session's user. Records that failed to load are left
    /// empty, which reads as "no access".
    pub account: Option<Account>,
}

impl SessionSnapshot {
    fn initial() -> Self {
        Self {
            loading: true,
            session: None,
            account: None,
        }
    }

    pub fn user(&self) -> Option<&SessionUser> {
        self.session.as_ref().map(|session| &session.user)
    }

    pub fn has_active_access(&self) -> bool {
        self.account
            .as_ref()
            .map_or(false, |account| account.has_active_access)
    }

    pub fn auth_state(&self) -> AuthState {
        if self.loading {
            AuthState::Loading
        } else if self.session.is_none() {
            AuthState::SignedOut
        } else {
            AuthState::SignedIn {
                has_access: self.has_active_access(),
            }
        }
    }
}

pub struct SessionContext {
    snapshot: watch::Receiver<SessionSnapshot>,
    refresh: Arc<Notify>,
    cancel: CancellationToken,
    handle: Option<JoinHandle<()>>,
}

impl SessionContext {
    /// Subscribes to `identity` and starts loading accounts from `source`.
    pub fn start(identity: Arc<dyn IdentityProvider>, source: Arc<dyn AccountSource>) -> Self {
        let (tx, snapshot) = watch::channel(SessionSnapshot::initial());
        let refresh = Arc::new(Notify::new());
        let cancel = CancellationToken::new();

        let handle = tokio::spawn(run(
            identity.subscribe(),
            source,
            tx,
            refresh.clone(),
            cancel.clone(),
        ));

        Self {
            snapshot,
            refresh,
            cancel,
            handle: Some(handle),
        }
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.snapshot.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshot.clone()
    }

    /// Waits until no load is in flight and returns that snapshot.
    pub async fn loaded(&self) -> SessionSnapshot {
        let mut rx = self.snapshot.clone();
        if let Ok(snapshot) = rx.wait_for(|snapshot| !snapshot.loading).await {
            return snapshot.clone();
        }
        // Context stopped; the last value is final
        self.snapshot()
    }

    /// Reloads the account of the current session.
    pub fn refresh(&self) {
        self.refresh.notify_one();
    }

    /// Stops following the provider and waits for the loader to exit.
    pub async fn shutdown(mut self) {
        self.cancel.cancel();
        if let Some(handle) = self.handle.take() {
            if let Err(e) = handle.await {
                tracing::warn!(error = %e, "Session loader ended abnormally");
            }
        }
    }
}

impl Drop for SessionContext {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

async fn run(
    mut identity: watch::Receiver<Option<Session>>,
    source: Arc<dyn AccountSource>,
    tx: watch::Sender<SessionSnapshot>,
    refresh: Arc<Notify>,
    cancel: CancellationToken,
) {
    loop {
        let session = identity.borrow_and_update().clone();

        // Keep the previous account while reloading the same user
        let previous = tx.borrow().account.clone().filter(|account| {
            session
                .as_ref()
                .map_or(false, |s| s.user.id == account.user_id)
        });

        tx.send_replace(SessionSnapshot {
            loading: true,
            session: session.clone(),
            account: previous,
        });

        let account = match &session {
            Some(session) => tokio::select! {
                _ = cancel.cancelled() => break,
                account = load_account(source.as_ref(), session) => Some(account),
            },
            None => None,
        };

        tx.send_replace(SessionSnapshot {
            loading: false,
            session,
            account,
        });

        tokio::select! {
            _ = cancel.cancelled() => break,
            changed = identity.changed() => {
                if changed.is_err() {
                    tracing::debug!("Identity provider closed");
                    break;
                }
            }
            _ = refresh.notified() => {}
        }
    }

    tracing::debug!("Session context stopped");
}

async fn load_account(source: &dyn AccountSource, session: &Session) -> Account {
    match source.account(session).await {
        Ok(account) => account,
        Err(e) => {
            tracing::warn!(user_id = %session.user.id, error = %e, "Failed to load account");
            Account::empty(session.user.id.clone())
        }
    }
}
