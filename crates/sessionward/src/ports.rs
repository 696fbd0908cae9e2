//! Navigator and notifier that only log, for headless clients.

use sessionward_session::{Alert, Navigator, Notifier};

/// Logs navigation resets.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNavigator;

impl Navigator for LogNavigator {
    fn reset_to(&self, route: &str) {
        tracing::info!(route, "navigation reset");
    }
}

/// Logs alerts at `warn`.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn alert(&self, alert: &Alert) {
        tracing::warn!(title = %alert.title, message = %alert.message, "alert");
    }
}
