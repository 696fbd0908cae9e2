//! Gate for screens that require a session.

use crate::{
    Alert, AuthService, CredentialStore, LogoutBundle, Session, SessionError,
};

/// Checks a session when a protected screen opens.
///
/// [`require`](Self::require) only looks for a token;
/// [`verify`](Self::verify) also asks the auth service whether that token
/// is still good.
pub struct AccessGuard<S> {
    bundle: LogoutBundle<S>,
}

impl<S: CredentialStore> AccessGuard<S> {
    pub(crate) fn new(bundle: LogoutBundle<S>) -> Self {
        Self { bundle }
    }

    /// Returns the session if there is a token; otherwise tells the user
    /// to log in, sends them to the login route, and fails with
    /// [`SessionError::NotAuthenticated`].
    ///
    /// Callers check `is_loading` first: a guard evaluated before `load`
    /// finishes would bounce a user who does have a stored session.
    pub fn require(&self) -> Result<Session, SessionError> {
        let session = self.bundle.state().current();
        if session.token().is_some() {
            return Ok(session);
        }
        tracing::debug!("protected screen opened without a session");
        self.bundle.notifier().alert(&Alert::new(
            "Authentication Required",
            "Please log in to access this feature.",
        ));
        self.bundle
            .navigator()
            .reset_to(&self.bundle.notice().login_route);
        Err(SessionError::NotAuthenticated)
    }

    /// Like [`require`](Self::require), then validates the token through
    /// `auth`.
    ///
    /// A rejected token fires the logout bundle (the "Session Expired"
    /// alert, at most once per session) and fails with
    /// [`SessionError::SessionExpired`]. A check that can't reach a
    /// verdict lets the user through on the session they have.
    pub async fn verify<A: AuthService>(&self, auth: &A) -> Result<Session, SessionError> {
        let session = self.require()?;
        match self.bundle.state().validate_token(auth).await {
            Ok(_) => Ok(self.bundle.state().current()),
            Err(SessionError::SessionExpired) => {
                self.bundle.fire(session.epoch()).await;
                Err(SessionError::SessionExpired)
            }
            Err(SessionError::Unverified { class, reason }) => {
                tracing::debug!(?class, %reason, "guard let an unverified session through");
                Ok(session)
            }
            // Signed out or replaced while the check was out.
            Err(e) => Err(e),
        }
    }
}
