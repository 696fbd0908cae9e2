//! The whole stack wired together, over a scripted transport and a paused
//! clock.

use std::sync::Arc;
use std::time::Duration;

use sessionward::prelude::*;
use sessionward_protocol::LOGIN_ROUTE;
use sessionward_session::testing::{RecordingNavigator, RecordingNotifier};
use sessionward_transport::testing::{Reply, ScriptedTransport, json, status, unreachable};
use tokio::time::{Instant, sleep_until};

const LOGIN: &str = "/api/auth/login";
const REGISTER: &str = "/api/auth/register";
const VALIDATE: &str = "/api/auth/validate";
const LISTINGS: &str = "/api/listings";
const ADMIN: &str = "/api/admin/users";

struct Harness {
    client: SessionClient<Arc<ScriptedTransport>, MemoryStore>,
    transport: Arc<ScriptedTransport>,
    navigator: Arc<RecordingNavigator>,
    notifier: Arc<RecordingNotifier>,
    start: Instant,
}

impl Harness {
    fn new() -> Self {
        Self::with_store(MemoryStore::new())
    }

    fn with_store(store: MemoryStore) -> Self {
        let transport = Arc::new(ScriptedTransport::new());
        let navigator = Arc::new(RecordingNavigator::new());
        let notifier = Arc::new(RecordingNotifier::new());
        let client = SessionClient::builder()
            .navigator(navigator.clone())
            .notifier(notifier.clone())
            .build(transport.clone(), store);
        Self {
            client,
            transport,
            navigator,
            notifier,
            start: Instant::now(),
        }
    }

    async fn logged_in() -> Self {
        let h = Self::new();
        h.transport
            .push(LOGIN, json(200, r#"{"token":"tok","role":"member"}"#));
        h.client.login("a@b.vn", "pw").await.unwrap();
        h
    }

    async fn at(&self, secs: f64) {
        sleep_until(self.start + Duration::from_secs_f64(secs)).await;
    }

    fn phase(&self) -> MonitorPhase {
        *self.client.phase().borrow()
    }

    fn authenticated(&self) -> bool {
        self.client.session().is_authenticated()
    }

    fn assert_logged_out_once(&self) {
        assert!(!self.authenticated());
        assert!(self.client.state().store().is_empty());
        assert_eq!(self.navigator.resets(), vec![LOGIN_ROUTE.to_string()]);
        assert_eq!(self.notifier.count(), 1);
        assert_eq!(self.notifier.alerts()[0].title, "Session Expired");
    }
}

fn valid() -> Reply {
    json(200, r#"{"valid":true,"role":"member"}"#)
}

// =========================================================================
// Login and registration
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_login_saves_session_and_starts_checks() {
    let h = Harness::new();
    h.transport
        .push(LOGIN, json(200, r#"{"token":"tok","role":"admin"}"#));
    h.transport.respond(VALIDATE, valid());

    let session = h.client.login("a@b.vn", "pw").await.unwrap();

    assert!(session.is_authenticated());
    assert_eq!(session.role(), Some(Role::Admin));
    assert_eq!(h.client.state().store().peek("token").as_deref(), Some("tok"));

    h.at(2.5).await;
    assert_eq!(h.phase(), MonitorPhase::Checking);
    assert_eq!(h.transport.count(VALIDATE), 1);

    h.at(7.5).await;
    assert_eq!(h.transport.count(VALIDATE), 2);
}

#[tokio::test(start_paused = true)]
async fn test_login_rejected_is_raw_and_silent() {
    let h = Harness::new();
    h.transport
        .push(LOGIN, json(401, r#"{"message":"wrong password"}"#));

    let err = h.client.login("a@b.vn", "bad").await.unwrap_err();

    assert!(matches!(err, ApiError::Status(_)));
    assert_eq!(err.server_message().as_deref(), Some("wrong password"));
    h.at(30.0).await;
    assert!(!h.authenticated());
    assert_eq!(h.notifier.count(), 0);
    assert!(h.navigator.resets().is_empty());
    assert_eq!(h.transport.count(VALIDATE), 0);
}

#[tokio::test(start_paused = true)]
async fn test_register_starts_member_session() {
    let h = Harness::new();
    h.transport
        .push(REGISTER, json(201, r#"{"token":"fresh"}"#));
    let profile = RegisterProfile {
        full_name: "Nguyen Van A".into(),
        phone: None,
    };

    let session = h.client.register("a@b.vn", "pw", profile).await.unwrap();

    assert_eq!(session.token(), Some("fresh"));
    assert_eq!(session.role(), Some(Role::Member));
}

// =========================================================================
// Restoring a stored session
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_load_stored_session_is_optimistic() {
    let store = MemoryStore::with_entries([("token", "stored"), ("role", "admin")]);
    let h = Harness::with_store(store);
    h.transport.respond(VALIDATE, unreachable());

    let session = h.client.load().await;

    assert!(session.is_authenticated());
    assert!(!session.is_loading());
    assert_eq!(session.role(), Some(Role::Admin));

    h.at(1.0).await;
    assert!(h.authenticated(), "offline at startup keeps the stored session");
    assert_eq!(h.transport.count(VALIDATE), 1);
}

#[tokio::test(start_paused = true)]
async fn test_load_expired_stored_token_logs_out_once() {
    let store = MemoryStore::with_entries([("token", "old"), ("role", "member")]);
    let h = Harness::with_store(store);
    h.transport.respond(VALIDATE, status(401));

    h.client.load().await;
    h.at(30.0).await;

    h.assert_logged_out_once();
    assert_eq!(h.phase(), MonitorPhase::Stopped);
}

#[tokio::test(start_paused = true)]
async fn test_load_nothing_stored_stays_idle() {
    let h = Harness::new();

    let session = h.client.load().await;
    h.at(30.0).await;

    assert!(!session.is_authenticated());
    assert!(!session.is_loading());
    assert_eq!(h.phase(), MonitorPhase::Idle);
    assert_eq!(h.transport.count(VALIDATE), 0);
}

// =========================================================================
// Classification through the stack
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_admin_route_denied_keeps_valid_session() {
    let h = Harness::logged_in().await;
    h.transport.respond(VALIDATE, valid());
    h.transport
        .push(ADMIN, json(403, r#"{"message":"admins only"}"#));

    let err = h.client.api().get(ADMIN).await.unwrap_err();

    assert!(matches!(err, ApiError::PermissionDenied(_)));
    assert!(h.authenticated());
    assert_eq!(h.notifier.count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_server_revokes_token_loop_logs_out() {
    let h = Harness::logged_in().await;
    h.transport.push(VALIDATE, valid());
    h.transport.respond(VALIDATE, status(401));

    h.at(5.0).await;
    assert!(h.authenticated());

    h.at(7.5).await;
    h.assert_logged_out_once();
    assert_eq!(h.phase(), MonitorPhase::Stopped);

    h.at(30.0).await;
    assert_eq!(h.transport.count(VALIDATE), 2);
}

#[tokio::test(start_paused = true)]
async fn test_business_and_loop_401_together_alert_once() {
    let h = Harness::logged_in().await;
    h.transport.respond(VALIDATE, status(401));
    h.transport.respond(LISTINGS, status(401));

    let (business, check) =
        tokio::join!(h.client.api().get(LISTINGS), h.client.validate_token());

    assert!(business.unwrap_err().session_expired());
    assert!(check.is_err());
    h.at(30.0).await;
    h.assert_logged_out_once();
}

#[tokio::test(start_paused = true)]
async fn test_business_401_while_loop_checks_alerts_once() {
    let h = Harness::logged_in().await;
    h.transport.set_delay(Duration::from_secs(1));
    h.transport.respond(VALIDATE, status(401));
    h.transport.respond(LISTINGS, status(401));

    h.at(1.5).await;
    let business = tokio::spawn({
        let client = h.client.clone();
        async move { client.api().get(LISTINGS).await }
    });

    h.at(30.0).await;
    assert!(business.await.unwrap().unwrap_err().session_expired());
    h.assert_logged_out_once();
}

// =========================================================================
// Connectivity
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_offline_shows_banner_and_keeps_session() {
    let h = Harness::logged_in().await;
    h.transport.respond(VALIDATE, unreachable());

    h.at(2.5).await;
    assert_eq!(*h.client.banner().borrow(), ConnectionBanner::showing(10));
    assert_eq!(h.phase(), MonitorPhase::ConnectionError);

    h.transport.respond(VALIDATE, valid());
    h.at(12.5).await;
    assert!(!h.client.banner().borrow().active);
    assert_eq!(h.phase(), MonitorPhase::Checking);
    assert!(h.authenticated());
    assert_eq!(h.notifier.count(), 0);
}

// =========================================================================
// Sign-out and guard
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_sign_out_twice_is_quiet() {
    let h = Harness::logged_in().await;
    h.transport.respond(VALIDATE, valid());
    h.at(3.0).await;

    h.client.sign_out().await;
    let second = h.client.sign_out().await;

    assert!(!second.is_authenticated());
    assert!(h.client.state().store().is_empty());
    h.at(30.0).await;
    assert_eq!(h.phase(), MonitorPhase::Stopped);
    assert_eq!(h.transport.count(VALIDATE), 1);
    assert_eq!(h.notifier.count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_access_guard_without_session_redirects() {
    let h = Harness::new();

    let result = h.client.access_guard().require();

    assert!(matches!(result, Err(SessionError::NotAuthenticated)));
    assert_eq!(h.notifier.alerts()[0].title, "Authentication Required");
    assert_eq!(h.navigator.resets(), vec![LOGIN_ROUTE.to_string()]);
}

#[tokio::test(start_paused = true)]
async fn test_access_guard_with_session_passes() {
    let h = Harness::logged_in().await;

    let session = h.client.access_guard().require().unwrap();

    assert_eq!(session.token(), Some("tok"));
    assert_eq!(h.notifier.count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_verify_access_expired_token_logs_out_once() {
    let h = Harness::logged_in().await;
    h.transport.respond(VALIDATE, status(401));

    let result = h.client.verify_access().await;

    assert!(matches!(result, Err(SessionError::SessionExpired)));
    h.assert_logged_out_once();
    h.at(30.0).await;
    assert_eq!(h.notifier.count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_verify_access_valid_token_passes() {
    let h = Harness::logged_in().await;
    h.transport
        .respond(VALIDATE, json(200, r#"{"valid":true,"role":"admin"}"#));

    let session = h.client.verify_access().await.unwrap();

    assert_eq!(session.role(), Some(Role::Admin));
    assert_eq!(h.notifier.count(), 0);
    assert!(h.navigator.resets().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_stops_loop_keeps_session() {
    let h = Harness::logged_in().await;
    h.transport.respond(VALIDATE, valid());
    h.at(2.5).await;

    h.client.shutdown().await.unwrap();
    h.at(30.0).await;

    assert!(h.authenticated());
    assert_eq!(h.transport.count(VALIDATE), 1);
    assert!(!h.client.monitor().is_running());
}
