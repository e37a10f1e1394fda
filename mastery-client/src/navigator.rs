/// Location changes
///
/// The poller and the route gate decide *where* to go; a `Navigator`
/// performs the move. A browser shell would assign `window.location`; the
/// CLI just logs.

use std::sync::Mutex;

pub trait Navigator: Send + Sync {
    fn redirect(&self, location: &str);
}

/// Logs each redirect
#[derive(Debug, Default)]
pub struct LogNavigator;

impl Navigator for LogNavigator {
    fn redirect(&self, location: &str) {
        tracing::info!(location, "Redirecting");
    }
}

/// Keeps every redirect in order, for tests and dry runs
#[derive(Debug, Default)]
pub struct RecordingNavigator {
    visits: Mutex<Vec<String>>,
}

impl RecordingNavigator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn visits(&self) -> Vec<String> {
        self.visits
            .lock()
            .map(|visits| visits.clone())
            .unwrap_or_default()
    }
}

impl Navigator for RecordingNavigator {
    fn redirect(&self, location: &str) {
        if let Ok(mut visits) = self.visits.lock() {
            visits.push(location.to_string());
        }
    }
}
