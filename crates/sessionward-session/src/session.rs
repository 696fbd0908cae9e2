//! The session snapshot: what the client currently believes about
//! authentication.

use std::fmt;

use sessionward_protocol::Role;

/// A point-in-time view of the session.
///
/// Invariant: `is_authenticated()` implies `token().is_some()`. Only
/// [`AuthState`](crate::AuthState) constructs sessions, which is how the
/// invariant is kept.
///
/// `epoch` numbers authenticated sessions: every transition INTO an
/// authenticated state (login, register, restoring a stored token) starts
/// a new epoch. Asynchronous work captures the epoch it started under and
/// is discarded if the epoch moved on while it was suspended.
#[derive(Clone, PartialEq, Eq)]
pub struct Session {
    pub(crate) token: Option<String>,
    pub(crate) role: Option<Role>,
    pub(crate) is_authenticated: bool,
    pub(crate) is_loading: bool,
    pub(crate) epoch: u64,
}

impl Session {
    /// The state at process start: nothing known yet, still loading.
    pub(crate) fn initial() -> Self {
        Self {
            token: None,
            role: None,
            is_authenticated: false,
            is_loading: true,
            epoch: 0,
        }
    }

    pub(crate) fn authenticated(token: String, role: Role, epoch: u64) -> Self {
        Self {
            token: Some(token),
            role: Some(role),
            is_authenticated: true,
            is_loading: false,
            epoch,
        }
    }

    /// An empty, settled session that keeps the epoch it ended in.
    pub(crate) fn cleared(epoch: u64) -> Self {
        Self {
            token: None,
            role: None,
            is_authenticated: false,
            is_loading: false,
            epoch,
        }
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn role(&self) -> Option<Role> {
        self.role
    }

    pub fn is_authenticated(&self) -> bool {
        self.is_authenticated
    }

    pub fn is_loading(&self) -> bool {
        self.is_loading
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Identity of the authenticated session, or `None` when signed out.
    pub fn key(&self) -> Option<SessionKey> {
        match (&self.token, self.is_authenticated) {
            (Some(token), true) => Some(SessionKey {
                epoch: self.epoch,
                token: token.clone(),
            }),
            _ => None,
        }
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("role", &self.role)
            .field("is_authenticated", &self.is_authenticated)
            .field("is_loading", &self.is_loading)
            .field("epoch", &self.epoch)
            .finish()
    }
}

/// The `(epoch, token)` pair an asynchronous result is tagged with.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionKey {
    pub epoch: u64,
    pub token: String,
}

impl fmt::Debug for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionKey")
            .field("epoch", &self.epoch)
            .field("token", &"<redacted>")
            .finish()
    }
}
