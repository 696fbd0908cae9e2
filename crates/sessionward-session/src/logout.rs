//! The single-fire logout bundle.

use std::sync::Arc;

use sessionward_protocol::LOGIN_ROUTE;

use crate::{AccessGuard, Alert, AuthState, CredentialStore, Navigator, Notifier};

/// What the user sees when a session ends involuntarily.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogoutNotice {
    pub title: String,
    pub message: String,
    pub button: String,
    /// Route the navigation stack is reset to.
    pub login_route: String,
}

impl Default for LogoutNotice {
    fn default() -> Self {
        Self {
            title: "Session Expired".into(),
            message: "Session expired. Please log in again.".into(),
            button: "OK".into(),
            login_route: LOGIN_ROUTE.into(),
        }
    }
}

impl LogoutNotice {
    pub fn alert(&self) -> Alert {
        Alert {
            title: self.title.clone(),
            message: self.message.clone(),
            button: self.button.clone(),
        }
    }
}

/// Ends a session: clear storage and memory, reset navigation to the login
/// route, alert the user.
///
/// Both the failure classifier and the validation loop hold a clone and
/// may race to fire it for the same session. Whoever wins runs the side
/// effects; everyone else gets `false`.
pub struct LogoutBundle<S> {
    state: Arc<AuthState<S>>,
    navigator: Arc<dyn Navigator>,
    notifier: Arc<dyn Notifier>,
    notice: Arc<LogoutNotice>,
}

impl<S> Clone for LogoutBundle<S> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
            navigator: Arc::clone(&self.navigator),
            notifier: Arc::clone(&self.notifier),
            notice: Arc::clone(&self.notice),
        }
    }
}

impl<S: CredentialStore> LogoutBundle<S> {
    pub fn new(
        state: Arc<AuthState<S>>,
        navigator: Arc<dyn Navigator>,
        notifier: Arc<dyn Notifier>,
        notice: LogoutNotice,
    ) -> Self {
        Self {
            state,
            navigator,
            notifier,
            notice: Arc::new(notice),
        }
    }

    pub fn state(&self) -> &Arc<AuthState<S>> {
        &self.state
    }

    pub fn notice(&self) -> &LogoutNotice {
        &self.notice
    }

    /// Fires the bundle for the session of `epoch`.
    ///
    /// Returns `true` if this call ran the side effects. Repeated or
    /// concurrent calls for the same epoch, and calls for an epoch that
    /// has already been replaced, return `false` and do nothing.
    ///
    /// The bundle runs on its own task: a caller dropped half way does not
    /// leave a session ended without its alert.
    pub async fn fire(&self, epoch: u64) -> bool {
        let bundle = self.clone();
        match tokio::spawn(async move { bundle.run(epoch).await }).await {
            Ok(fired) => fired,
            Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
            Err(e) => {
                tracing::warn!(epoch, error = %e, "logout dropped by the runtime");
                false
            }
        }
    }

    async fn run(&self, epoch: u64) -> bool {
        if !self.state.end_session(epoch).await {
            tracing::debug!(epoch, "logout already handled");
            return false;
        }
        tracing::info!(epoch, route = %self.notice.login_route, "logged out, returning to login");
        self.navigator.reset_to(&self.notice.login_route);
        self.notifier.alert(&self.notice.alert());
        true
    }

    /// A guard for screens that need an authenticated session.
    pub fn access_guard(&self) -> AccessGuard<S> {
        AccessGuard::new(self.clone())
    }

    pub(crate) fn navigator(&self) -> &dyn Navigator {
        &*self.navigator
    }

    pub(crate) fn notifier(&self) -> &dyn Notifier {
        &*self.notifier
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use futures_util::future::join_all;
    use sessionward_protocol::{Credentials, Role};

    use super::*;
    use crate::MemoryStore;
    use crate::testing::{RecordingNavigator, RecordingNotifier, SlowStore};

    struct Harness {
        bundle: LogoutBundle<MemoryStore>,
        navigator: Arc<RecordingNavigator>,
        notifier: Arc<RecordingNotifier>,
    }

    fn harness() -> Harness {
        let navigator = Arc::new(RecordingNavigator::new());
        let notifier = Arc::new(RecordingNotifier::new());
        let bundle = LogoutBundle::new(
            Arc::new(AuthState::new(MemoryStore::new())),
            navigator.clone(),
            notifier.clone(),
            LogoutNotice::default(),
        );
        Harness {
            bundle,
            navigator,
            notifier,
        }
    }

    #[test]
    fn test_default_notice_text() {
        let alert = LogoutNotice::default().alert();
        assert_eq!(alert.title, "Session Expired");
        assert_eq!(alert.message, "Session expired. Please log in again.");
        assert_eq!(alert.button, "OK");
    }

    #[tokio::test]
    async fn test_fire_runs_side_effects_once() {
        let h = harness();
        let epoch = h
            .bundle
            .state()
            .save(Credentials::new("tok", Role::Member))
            .await
            .epoch();

        assert!(h.bundle.fire(epoch).await);
        assert!(!h.bundle.fire(epoch).await);

        assert_eq!(h.navigator.resets(), vec![LOGIN_ROUTE.to_string()]);
        assert_eq!(h.notifier.count(), 1);
        assert!(!h.bundle.state().current().is_authenticated());
        assert!(h.bundle.state().store().is_empty());
    }

    #[tokio::test]
    async fn test_fire_concurrent_clones_single_alert() {
        let h = harness();
        let epoch = h
            .bundle
            .state()
            .save(Credentials::new("tok", Role::Member))
            .await
            .epoch();
        let clones: Vec<_> = (0..8).map(|_| h.bundle.clone()).collect();

        let fired = join_all(clones.iter().map(|b| b.fire(epoch))).await;

        assert_eq!(fired.iter().filter(|f| **f).count(), 1);
        assert_eq!(h.navigator.resets().len(), 1);
        assert_eq!(h.notifier.count(), 1);
    }

    #[tokio::test]
    async fn test_fire_stale_epoch_is_noop() {
        let h = harness();
        let old = h
            .bundle
            .state()
            .save(Credentials::new("old", Role::Member))
            .await
            .epoch();
        h.bundle
            .state()
            .save(Credentials::new("new", Role::Member))
            .await;

        assert!(!h.bundle.fire(old).await);
        assert_eq!(h.notifier.count(), 0);
        assert_eq!(h.bundle.state().current().token(), Some("new"));
    }

    #[tokio::test]
    async fn test_fire_after_new_login_alerts_again() {
        let h = harness();
        let state = h.bundle.state().clone();
        let first = state.save(Credentials::new("a", Role::Member)).await.epoch();
        h.bundle.fire(first).await;
        let second = state.save(Credentials::new("b", Role::Member)).await.epoch();

        assert!(h.bundle.fire(second).await);
        assert_eq!(h.notifier.count(), 2);
    }

    #[tokio::test]
    async fn test_fire_after_sign_out_is_silent() {
        let h = harness();
        let state = h.bundle.state().clone();
        let epoch = state.save(Credentials::new("a", Role::Member)).await.epoch();
        state.sign_out().await;

        assert!(!h.bundle.fire(epoch).await);
        assert!(h.navigator.resets().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_fire_caller_dropped_mid_clear_still_alerts_once() {
        let navigator = Arc::new(RecordingNavigator::new());
        let notifier = Arc::new(RecordingNotifier::new());
        let bundle = LogoutBundle::new(
            Arc::new(AuthState::new(SlowStore::new(Duration::from_millis(50)))),
            navigator.clone(),
            notifier.clone(),
            LogoutNotice::default(),
        );
        let epoch = bundle
            .state()
            .save(Credentials::new("tok", Role::Member))
            .await
            .epoch();

        let dropped = tokio::time::timeout(Duration::from_millis(10), bundle.fire(epoch)).await;
        assert!(dropped.is_err());
        tokio::time::sleep(Duration::from_millis(100)).await;

        assert!(!bundle.state().current().is_authenticated());
        assert_eq!(bundle.state().store().inner().peek("token"), None);
        assert_eq!(navigator.resets(), vec![LOGIN_ROUTE.to_string()]);
        assert_eq!(notifier.count(), 1);
        assert!(!bundle.fire(epoch).await);
    }
}
