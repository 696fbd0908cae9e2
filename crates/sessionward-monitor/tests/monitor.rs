//! Validation loop timing, driven on a paused clock.

use std::sync::Arc;
use std::time::Duration;

use sessionward_monitor::{ConnectionBanner, MonitorConfig, MonitorError, MonitorPhase, SessionMonitor};
use sessionward_protocol::{Credentials, FailureClass, LOGIN_ROUTE, Role};
use sessionward_session::testing::{
    RecordingNavigator, RecordingNotifier, ScriptedAuthService, ScriptedFailure,
};
use sessionward_session::{
    AuthState, LogoutBundle, LogoutNotice, MemoryStore, StoreFailures,
};
use tokio::time::{Instant, sleep_until};

struct Harness {
    bundle: LogoutBundle<MemoryStore>,
    auth: Arc<ScriptedAuthService>,
    navigator: Arc<RecordingNavigator>,
    notifier: Arc<RecordingNotifier>,
    monitor: SessionMonitor,
    start: Instant,
}

impl Harness {
    fn new(auth: ScriptedAuthService) -> Self {
        Self::with_store(auth, MemoryStore::new())
    }

    fn with_store(auth: ScriptedAuthService, store: MemoryStore) -> Self {
        let navigator = Arc::new(RecordingNavigator::new());
        let notifier = Arc::new(RecordingNotifier::new());
        let bundle = LogoutBundle::new(
            Arc::new(AuthState::new(store)),
            navigator.clone(),
            notifier.clone(),
            LogoutNotice::default(),
        );
        let auth = Arc::new(auth);
        let monitor = SessionMonitor::spawn(bundle.clone(), auth.clone(), MonitorConfig::default());
        Self {
            bundle,
            auth,
            navigator,
            notifier,
            monitor,
            start: Instant::now(),
        }
    }

    async fn login(&self, token: &str) {
        self.bundle
            .state()
            .save(Credentials::new(token, Role::Member))
            .await;
    }

    /// Sleeps until `secs` after the harness was created.
    async fn at(&self, secs: f64) {
        sleep_until(self.start + Duration::from_secs_f64(secs)).await;
    }

    fn phase(&self) -> MonitorPhase {
        *self.monitor.phase().borrow()
    }

    fn banner(&self) -> ConnectionBanner {
        *self.monitor.banner().borrow()
    }

    fn authenticated(&self) -> bool {
        self.bundle.state().current().is_authenticated()
    }
}

fn offline() -> ScriptedFailure {
    ScriptedFailure::Class(FailureClass::NetworkUnreachable)
}

// =========================================================================
// Startup
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_monitor_without_session_stays_idle() {
    let h = Harness::new(ScriptedAuthService::new());

    h.at(30.0).await;

    assert_eq!(h.phase(), MonitorPhase::Idle);
    assert_eq!(h.auth.calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_monitor_first_check_after_settle_delay() {
    let h = Harness::new(ScriptedAuthService::new());
    h.login("tok").await;

    h.at(1.9).await;
    assert_eq!(h.phase(), MonitorPhase::Starting);
    assert_eq!(h.auth.calls(), 0);

    h.at(2.1).await;
    assert_eq!(h.phase(), MonitorPhase::Checking);
    assert_eq!(h.auth.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_monitor_token_not_durable_stays_idle() {
    let store = MemoryStore::new();
    store.set_failures(StoreFailures {
        set: true,
        ..StoreFailures::default()
    });
    let h = Harness::with_store(ScriptedAuthService::new(), store);
    h.login("tok").await;

    h.at(30.0).await;

    assert!(h.authenticated());
    assert_eq!(h.phase(), MonitorPhase::Idle);
    assert_eq!(h.auth.calls(), 0);
}

// =========================================================================
// Steady state
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_monitor_valid_session_checks_every_interval() {
    // Checks at 2, 7, 12, 17.
    let h = Harness::new(ScriptedAuthService::new());
    h.login("tok").await;

    h.at(17.5).await;

    assert_eq!(h.auth.calls(), 4);
    assert!(h.authenticated());
    assert_eq!(h.notifier.count(), 0);
    assert!(h.navigator.resets().is_empty());
    assert!(!h.banner().active);
}

#[tokio::test(start_paused = true)]
async fn test_monitor_slow_check_skips_overlapping_ticks() {
    // The first check runs 2..14; ticks at 7 and 12 find it in flight.
    let auth = ScriptedAuthService::new();
    auth.set_delay(Duration::from_secs(12));
    let h = Harness::new(auth);
    h.login("tok").await;

    h.at(16.0).await;
    assert_eq!(h.auth.calls(), 1);

    h.at(17.5).await;
    assert_eq!(h.auth.calls(), 2);
    assert_eq!(h.auth.max_in_flight(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_monitor_server_error_keeps_checking() {
    let auth = ScriptedAuthService::new();
    auth.push(Err(ScriptedFailure::Class(FailureClass::ServerError)));
    let h = Harness::new(auth);
    h.login("tok").await;

    h.at(7.5).await;

    assert_eq!(h.auth.calls(), 2);
    assert_eq!(h.phase(), MonitorPhase::Checking);
    assert!(!h.banner().active);
    assert!(h.authenticated());
}

// =========================================================================
// Connection errors
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_monitor_offline_counts_down_then_retries_once() {
    let auth = ScriptedAuthService::new();
    auth.push(Err(offline()));
    let h = Harness::new(auth);
    h.login("tok").await;

    h.at(2.5).await;
    assert_eq!(h.phase(), MonitorPhase::ConnectionError);
    assert_eq!(h.banner(), ConnectionBanner::showing(10));

    h.at(7.5).await;
    assert_eq!(h.banner(), ConnectionBanner::showing(5));
    assert_eq!(h.auth.calls(), 1, "periodic ticks are suspended");

    h.at(11.5).await;
    assert_eq!(h.banner(), ConnectionBanner::showing(1));
    assert_eq!(h.auth.calls(), 1);

    h.at(12.5).await;
    assert_eq!(h.auth.calls(), 2);
    assert_eq!(h.banner(), ConnectionBanner::hidden(10));
    assert_eq!(h.phase(), MonitorPhase::Checking);
    assert!(h.authenticated());

    // Periodic checks resume a full interval after the retry.
    h.at(16.5).await;
    assert_eq!(h.auth.calls(), 2);
    h.at(17.5).await;
    assert_eq!(h.auth.calls(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_monitor_still_offline_restarts_countdown() {
    let h = Harness::new(ScriptedAuthService::failing(FailureClass::NetworkUnreachable));
    h.login("tok").await;

    h.at(12.5).await;
    assert_eq!(h.auth.calls(), 2);
    assert_eq!(h.banner(), ConnectionBanner::showing(10));

    h.at(22.5).await;
    assert_eq!(h.auth.calls(), 3);
    assert_eq!(h.phase(), MonitorPhase::ConnectionError);
    assert!(h.authenticated(), "being offline never signs the user out");
    assert_eq!(h.bundle.state().store().peek("token").as_deref(), Some("tok"));
}

#[tokio::test(start_paused = true)]
async fn test_monitor_banner_sees_every_countdown_value() {
    let auth = ScriptedAuthService::new();
    auth.push(Err(offline()));
    let h = Harness::new(auth);
    let mut banner = h.monitor.banner();
    h.login("tok").await;

    let mut seen = Vec::new();
    while banner.changed().await.is_ok() {
        let b = *banner.borrow_and_update();
        seen.push(b);
        if !b.active {
            break;
        }
    }

    let expected: Vec<_> = (1..=10)
        .rev()
        .map(ConnectionBanner::showing)
        .chain([ConnectionBanner::hidden(10)])
        .collect();
    assert_eq!(seen, expected);
}

// =========================================================================
// Ending the session
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_monitor_rejected_token_fires_logout_once() {
    let auth = ScriptedAuthService::new();
    auth.push(Err(ScriptedFailure::Class(FailureClass::AuthExpired)));
    let h = Harness::new(auth);
    h.login("tok").await;

    h.at(30.0).await;

    assert_eq!(h.auth.calls(), 1);
    assert!(!h.authenticated());
    assert!(h.bundle.state().store().is_empty());
    assert_eq!(h.navigator.resets(), vec![LOGIN_ROUTE.to_string()]);
    assert_eq!(h.notifier.count(), 1);
    assert_eq!(h.phase(), MonitorPhase::Stopped);
}

#[tokio::test(start_paused = true)]
async fn test_monitor_sign_out_stops_checks() {
    let h = Harness::new(ScriptedAuthService::new());
    h.login("tok").await;

    h.at(3.0).await;
    h.bundle.state().sign_out().await;
    h.at(30.0).await;

    assert_eq!(h.auth.calls(), 1);
    assert_eq!(h.phase(), MonitorPhase::Stopped);
    assert_eq!(h.notifier.count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_monitor_sign_out_abandons_check_in_flight() {
    let auth = ScriptedAuthService::new();
    auth.set_delay(Duration::from_secs(5));
    auth.set_fallback(Err(ScriptedFailure::Class(FailureClass::AuthExpired)));
    let h = Harness::new(auth);
    h.login("tok").await;

    h.at(3.0).await;
    assert_eq!(h.auth.in_flight(), 1);
    h.bundle.state().sign_out().await;
    h.at(30.0).await;

    assert_eq!(h.auth.in_flight(), 0);
    assert_eq!(h.notifier.count(), 0, "a stopped loop never alerts");
    assert_eq!(h.phase(), MonitorPhase::Stopped);
}

#[tokio::test(start_paused = true)]
async fn test_monitor_sign_out_during_countdown_cancels_retry() {
    let h = Harness::new(ScriptedAuthService::failing(FailureClass::NetworkUnreachable));
    h.login("tok").await;

    h.at(5.0).await;
    assert!(h.banner().active);
    h.bundle.state().sign_out().await;
    h.at(30.0).await;

    assert_eq!(h.auth.calls(), 1);
    assert!(!h.banner().active);
    assert_eq!(h.phase(), MonitorPhase::Stopped);
}

#[tokio::test(start_paused = true)]
async fn test_monitor_new_login_restarts_loop() {
    let h = Harness::new(ScriptedAuthService::new());
    h.login("first").await;
    h.at(3.0).await;
    h.bundle.state().sign_out().await;

    h.at(10.0).await;
    h.login("second").await;
    h.at(11.5).await;
    assert_eq!(h.phase(), MonitorPhase::Starting);

    h.at(12.5).await;
    assert_eq!(h.phase(), MonitorPhase::Checking);
    assert_eq!(h.auth.calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_monitor_relogin_mid_check_discards_old_result() {
    let auth = ScriptedAuthService::new();
    auth.set_delay(Duration::from_secs(4));
    auth.push(Err(ScriptedFailure::Class(FailureClass::AuthExpired)));
    let h = Harness::new(auth);
    h.login("old").await;

    h.at(3.0).await;
    h.login("new").await;
    h.at(30.0).await;

    assert!(h.authenticated());
    assert_eq!(h.bundle.state().current().token(), Some("new"));
    assert_eq!(h.notifier.count(), 0);
}

// =========================================================================
// Shutdown
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_shutdown_stops_actor() {
    let h = Harness::new(ScriptedAuthService::new());
    h.login("tok").await;
    h.at(2.5).await;

    h.monitor.shutdown().await.unwrap();
    h.at(30.0).await;

    assert_eq!(h.auth.calls(), 1);
    assert_eq!(h.phase(), MonitorPhase::Stopped);
    assert!(!h.monitor.is_running());
    assert!(matches!(h.monitor.shutdown().await, Err(MonitorError::Unavailable)));
}
