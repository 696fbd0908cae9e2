//! Error types for the monitor.

/// Errors returned by [`SessionMonitor`](crate::SessionMonitor) handles.
#[derive(Debug, thiserror::Error)]
pub enum MonitorError {
    /// The monitor's actor has already exited.
    #[error("session monitor is not running")]
    Unavailable,
}
