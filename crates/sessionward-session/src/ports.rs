//! What the session layer needs from the outside world.
//!
//! `Navigator` and `Notifier` are synchronous and object-safe: they are
//! shared as `Arc<dyn ...>` and only ever called as the terminal step of
//! ending a session. `AuthService` is async and used through generics.

use std::future::Future;
use std::sync::Arc;

use sessionward_protocol::{Credentials, FailureClass, RegisterProfile, Role};

/// Replaces the whole navigation stack with a single route.
pub trait Navigator: Send + Sync + 'static {
    fn reset_to(&self, route: &str);
}

/// A single-button blocking alert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alert {
    pub title: String,
    pub message: String,
    pub button: String,
}

impl Alert {
    pub fn new(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
            button: "OK".into(),
        }
    }
}

/// Presents alerts to the user.
pub trait Notifier: Send + Sync + 'static {
    fn alert(&self, alert: &Alert);
}

/// An error from the auth service that has already been classified.
///
/// The session never inspects status codes itself; it only reads the
/// class the classifier attached.
pub trait ServiceFailure: std::error::Error + Send + Sync + 'static {
    fn classification(&self) -> Option<FailureClass>;

    /// The `sessionExpired` tag.
    fn session_expired(&self) -> bool {
        self.classification() == Some(FailureClass::AuthExpired)
    }
}

/// Remote authentication operations.
pub trait AuthService: Send + Sync + 'static {
    type Error: ServiceFailure;

    /// Exchanges an identifier and secret for credentials.
    fn login(
        &self,
        email: &str,
        password: &str,
    ) -> impl Future<Output = Result<Credentials, Self::Error>> + Send;

    /// Creates an account and returns its credentials.
    fn register(
        &self,
        email: &str,
        password: &str,
        profile: RegisterProfile,
    ) -> impl Future<Output = Result<Credentials, Self::Error>> + Send;

    /// Confirms the current bearer token. `Ok(None)` means valid but the
    /// server did not restate the role.
    fn validate(
        &self,
    ) -> impl Future<Output = Result<Option<Role>, Self::Error>> + Send;
}

impl<T: AuthService> AuthService for Arc<T> {
    type Error = T::Error;

    fn login(
        &self,
        email: &str,
        password: &str,
    ) -> impl Future<Output = Result<Credentials, Self::Error>> + Send {
        (**self).login(email, password)
    }

    fn register(
        &self,
        email: &str,
        password: &str,
        profile: RegisterProfile,
    ) -> impl Future<Output = Result<Credentials, Self::Error>> + Send {
        (**self).register(email, password, profile)
    }

    fn validate(
        &self,
    ) -> impl Future<Output = Result<Option<Role>, Self::Error>> + Send {
        (**self).validate()
    }
}
