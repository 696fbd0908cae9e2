//! What the monitor publishes to observers.

use std::fmt;

/// Connectivity banner shown while checks can't reach the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionBanner {
    pub active: bool,
    /// Seconds until the automatic retry.
    pub countdown: u32,
}

impl ConnectionBanner {
    pub fn hidden(countdown_secs: u32) -> Self {
        Self {
            active: false,
            countdown: countdown_secs,
        }
    }

    pub fn showing(countdown: u32) -> Self {
        Self {
            active: true,
            countdown,
        }
    }

    pub fn title(&self) -> &'static str {
        "Connection error"
    }

    pub fn message(&self) -> String {
        format!("Reconnecting in {} seconds...", self.countdown)
    }
}

/// Where the validation loop is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MonitorPhase {
    /// No session to check, or its token is not in durable storage.
    #[default]
    Idle,
    /// Waiting out the settle delay after a session started.
    Starting,
    /// Checking on the regular period.
    Checking,
    /// Counting down to a retry after a connectivity failure.
    ConnectionError,
    /// The session ended or the monitor was shut down.
    Stopped,
}

impl fmt::Display for MonitorPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Starting => "starting",
            Self::Checking => "checking",
            Self::ConnectionError => "connection-error",
            Self::Stopped => "stopped",
        };
        f.write_str(name)
    }
}
