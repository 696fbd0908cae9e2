//! Validation loop configuration.

use std::time::Duration;

use tracing::warn;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorConfig {
    /// Period of the steady-state check. Default: 5 s.
    pub check_interval: Duration,
    /// Wait after a session starts before confirming the stored token and
    /// running the first check. Default: 2 s.
    pub settle_delay: Duration,
    /// Seconds counted down after a connectivity failure before the
    /// automatic retry. Default: 10.
    pub countdown_secs: u32,
    /// Extra wait between the countdown reaching zero and the retry.
    /// Default: none.
    pub retry_delay: Duration,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            check_interval: Duration::from_secs(5),
            settle_delay: Duration::from_secs(2),
            countdown_secs: Self::MAX_COUNTDOWN_SECS,
            retry_delay: Duration::ZERO,
        }
    }
}

impl MonitorConfig {
    pub const MAX_COUNTDOWN_SECS: u32 = 10;
    pub const MIN_CHECK_INTERVAL: Duration = Duration::from_millis(100);

    /// Clamp out-of-range values. Called by
    /// [`SessionMonitor::spawn`](crate::SessionMonitor::spawn).
    ///
    /// - `countdown_secs` clamped to `1..=MAX_COUNTDOWN_SECS`.
    /// - `check_interval` raised to at least `MIN_CHECK_INTERVAL`.
    pub fn validated(mut self) -> Self {
        let countdown = self.countdown_secs.clamp(1, Self::MAX_COUNTDOWN_SECS);
        if countdown != self.countdown_secs {
            warn!(
                countdown_secs = self.countdown_secs,
                clamped = countdown,
                "countdown_secs out of range, clamping"
            );
            self.countdown_secs = countdown;
        }
        if self.check_interval < Self::MIN_CHECK_INTERVAL {
            warn!(
                interval_ms = self.check_interval.as_millis() as u64,
                "check_interval too short, raising to minimum"
            );
            self.check_interval = Self::MIN_CHECK_INTERVAL;
        }
        self
    }
}
