//! Error types for the session layer.

use sessionward_protocol::FailureClass;

/// Errors returned by session transitions.
///
/// Only [`SessionError::SessionExpired`] is terminal. Everything else
/// leaves the session exactly as it was.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    /// The auth service rejected the token; storage and memory have been
    /// cleared.
    #[error("session expired")]
    SessionExpired,

    /// Validation failed for a reason that says nothing about the token
    /// (no network, server error, unexpected response). The session is
    /// left untouched.
    #[error("token could not be verified: {reason}")]
    Unverified {
        class: Option<FailureClass>,
        reason: String,
    },

    /// The result belongs to a session that has since been replaced
    /// (newer login) or ended, so it was discarded.
    #[error("validation result superseded by a newer session")]
    Superseded,

    /// There is no authenticated session to operate on.
    #[error("not authenticated")]
    NotAuthenticated,
}

impl SessionError {
    /// The `sessionExpired` tag: `true` only for a confirmed expiry.
    pub fn session_expired(&self) -> bool {
        matches!(self, Self::SessionExpired)
    }

    /// The failure class behind this error, if one was determined.
    pub fn classification(&self) -> Option<FailureClass> {
        match self {
            Self::SessionExpired => Some(FailureClass::AuthExpired),
            Self::Unverified { class, .. } => *class,
            Self::Superseded | Self::NotAuthenticated => None,
        }
    }
}
