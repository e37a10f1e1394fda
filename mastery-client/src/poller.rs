/// Post-checkout entitlement poller
///
/// After the hosted checkout sends the buyer back, the payment webhook may
/// not have written the entitlement yet. The success flow polls for it at a
/// fixed interval and ends in one of two terminal states:
///
/// ```text
/// Processing { attempts } ──found──────────────▶ Verified { attempts }
///         │                                            │
///         └──attempts == max_attempts──▶ Timeout       └─▶ countdown ─▶ redirect
/// ```
///
/// A failed read counts as one attempt, the same as a read that found
/// nothing, and never ends polling early. Everything the flow spawns is tied
/// to one `CancellationToken`; unmounting or dropping the flow cancels it,
/// and a read that resolves afterwards is discarded.
///
/// # Example
///
/// ```no_run
/// use mastery_client::identity::Session;
/// use mastery_client::navigator::LogNavigator;
/// use mastery_client::poller::{PollState, PollerConfig, SuccessFlow};
/// use mastery_client::source::StoreSource;
/// use mastery_shared::{models::UserId, store::InMemoryStore};
/// use std::sync::Arc;
///
/// # async fn example() {
/// let session = Session::new(UserId::from("u1"), None, "token");
/// let source = Arc::new(StoreSource::new(Arc::new(InMemoryStore::new())));
///
/// let flow = SuccessFlow::mount(Some(&session), source, Arc::new(LogNavigator), PollerConfig::default())
///     .expect("signed in");
///
/// if let PollState::Timeout { .. } = flow.finished().await {
///     flow.continue_manually();
/// }
/// # }
/// ```

use crate::countdown::Countdown;
use crate::identity::Session;
use crate::navigator::Navigator;
use crate::source::AccountSource;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

/// Time between entitlement reads
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Reads before giving up (about a minute at the default interval)
pub const DEFAULT_MAX_ATTEMPTS: u32 = 30;

#[derive(Debug, Clone)]
pub struct PollerConfig {
    pub interval: Duration,

    pub max_attempts: u32,

    pub countdown: Countdown,

    /// Post-purchase location, used by the countdown and the manual continue
    pub redirect_to: String,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            countdown: Countdown::default(),
            redirect_to: "/".to_string(),
        }
    }
}

/// Poller state; `attempts` is the number of reads performed so far
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollState {
    Processing { attempts: u32 },
    Verified { attempts: u32 },
    Timeout { attempts: u32 },
}

impl PollState {
    pub fn attempts(&self) -> u32 {
        match *self {
            PollState::Processing { attempts }
            | PollState::Verified { attempts }
            | PollState::Timeout { attempts } => attempts,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, PollState::Processing { .. })
    }
}

/// One mounted success page
pub struct SuccessFlow {
    state: watch::Receiver<PollState>,
    countdown: watch::Receiver<Option<u32>>,
    navigator: Arc<dyn Navigator>,
    redirect_to: String,
    continued: AtomicBool,
    cancel: CancellationToken,
    handle: Option<JoinHandle<()>>,
}

impl SuccessFlow {
    /// Starts polling for `session`'s entitlement.
    ///
    /// Returns `None` without polling when nobody is signed in; the success
    /// page is only reachable after sign-in, so that case is logged as an
    /// anomaly.
    pub fn mount(
        session: Option<&Session>,
        source: Arc<dyn AccountSource>,
        navigator: Arc<dyn Navigator>,
        config: PollerConfig,
    ) -> Option<Self> {
        let Some(session) = session else {
            tracing::error!("Success page mounted without a signed-in user; not polling");
            return None;
        };

        let (state_tx, state) = watch::channel(PollState::Processing { attempts: 0 });
        let (countdown_tx, countdown) = watch::channel(None);
        let cancel = CancellationToken::new();
        let redirect_to = config.redirect_to.clone();

        tracing::info!(
            user_id = %session.user.id,
            interval_ms = config.interval.as_millis() as u64,
            max_attempts = config.max_attempts,
            "Waiting for entitlement"
        );

        let handle = tokio::spawn(poll(
            session.clone(),
            source,
            navigator.clone(),
            config,
            state_tx,
            countdown_tx,
            cancel.clone(),
        ));

        Some(Self {
            state,
            countdown,
            navigator,
            redirect_to,
            continued: AtomicBool::new(false),
            cancel,
            handle: Some(handle),
        })
    }

    pub fn state(&self) -> PollState {
        *self.state.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<PollState> {
        self.state.clone()
    }

    /// Countdown value once verified; `None` before that.
    pub fn countdown(&self) -> watch::Receiver<Option<u32>> {
        self.countdown.clone()
    }

    /// Waits for `Verified` or `Timeout`.
    pub async fn finished(&self) -> PollState {
        let mut rx = self.state.clone();
        if let Ok(state) = rx.wait_for(PollState::is_terminal).await {
            return *state;
        }
        // Poller stopped; the last value is final
        self.state()
    }

    /// Manual continue offered by the timeout view.
    ///
    /// Navigates once to the post-purchase location; returns `false` when
    /// not timed out or already continued.
    pub fn continue_manually(&self) -> bool {
        if !matches!(self.state(), PollState::Timeout { .. }) {
            return false;
        }
        if self.continued.swap(true, Ordering::SeqCst) {
            return false;
        }

        tracing::info!(location = %self.redirect_to, "Continuing after entitlement timeout");
        self.navigator.redirect(&self.redirect_to);
        true
    }

    /// Tears the flow down and waits for the poll task to exit.
    pub async fn unmount(mut self) {
        self.cancel.cancel();
        if let Some(handle) = self.handle.take() {
            if let Err(e) = handle.await {
                tracing::warn!(error = %e, "Entitlement poller ended abnormally");
            }
        }
    }
}

impl Drop for SuccessFlow {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

async fn poll(
    session: Session,
    source: Arc<dyn AccountSource>,
    navigator: Arc<dyn Navigator>,
    config: PollerConfig,
    state: watch::Sender<PollState>,
    countdown: watch::Sender<Option<u32>>,
    cancel: CancellationToken,
) {
    let user_id = &session.user.id;
    let mut attempts = 0;

    loop {
        tokio::select! {
            _ = cancel.cancelled() => return,
            _ = sleep(config.interval) => {}
        }

        let result = tokio::select! {
            _ = cancel.cancelled() => return,
            result = source.active_entitlement(&session) => result,
        };

        // Torn down while the read was in flight
        if cancel.is_cancelled() {
            return;
        }

        attempts += 1;

        match result {
            Ok(Some(entitlement)) => {
                tracing::info!(
                    user_id = %user_id,
                    entitlement_id = %entitlement.id,
                    attempts,
                    "Entitlement verified"
                );
                state.send_replace(PollState::Verified { attempts });

                config.countdown.start(
                    countdown,
                    navigator,
                    config.redirect_to.clone(),
                    cancel.child_token(),
                );
                return;
            }
            Ok(None) => {
                tracing::debug!(user_id = %user_id, attempts, "Entitlement not found yet");
            }
            Err(e) => {
                tracing::warn!(user_id = %user_id, attempts, error = %e, "Entitlement read failed");
            }
        }

        if attempts >= config.max_attempts {
            tracing::warn!(user_id = %user_id, attempts, "Gave up waiting for entitlement");
            state.send_replace(PollState::Timeout { attempts });
            return;
        }

        state.send_replace(PollState::Processing { attempts });
    }
}
