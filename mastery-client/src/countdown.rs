/// Visible countdown before the post-purchase redirect
///
/// Runs as its own task, independent of the poller that started it. The
/// displayed value starts at `from` and drops by one every `tick`; when it
/// reaches zero the redirect is issued exactly once, then `0` is published.
/// Cancelling the token before then stops the task without navigating.

use crate::navigator::Navigator;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

/// Countdown start value
pub const DEFAULT_COUNTDOWN_FROM: u32 = 3;

/// Time between decrements
pub const DEFAULT_COUNTDOWN_TICK: Duration = Duration::from_secs(1);

#[derive(Debug, Clone)]
pub struct Countdown {
    pub from: u32,
    pub tick: Duration,
}

impl Default for Countdown {
    fn default() -> Self {
        Self {
            from: DEFAULT_COUNTDOWN_FROM,
            tick: DEFAULT_COUNTDOWN_TICK,
        }
    }
}

impl Countdown {
    /// Starts counting and returns the task handle.
    ///
    /// `display` receives every value, starting with `from`.
    pub fn start(
        &self,
        display: watch::Sender<Option<u32>>,
        navigator: Arc<dyn Navigator>,
        location: String,
        cancel: CancellationToken,
    ) -> JoinHandle<()> {
        let from = self.from;
        let tick = self.tick;

        tokio::spawn(async move {
            let mut remaining = from;
            display.send_replace(Some(remaining));

            while remaining > 0 {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        tracing::debug!(remaining, "Countdown cancelled");
                        return;
                    }
                    _ = sleep(tick) => {}
                }

                remaining -= 1;
                if remaining > 0 {
                    display.send_replace(Some(remaining));
                }
            }

            if cancel.is_cancelled() {
                return;
            }

            tracing::info!(location = %location, "Countdown finished");
            navigator.redirect(&location);
            display.send_replace(Some(0));
        })
    }
}
