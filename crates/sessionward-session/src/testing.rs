//! Recording and scripted doubles for the session ports.
//!
//! Enabled with the `testing` feature so the client and monitor crates
//! can drive the session layer in their own tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use sessionward_protocol::{Credentials, FailureClass, RegisterProfile, Role};

use crate::{
    Alert, AuthService, CredentialStore, MemoryStore, Navigator, Notifier,
    ServiceFailure, StoreError,
};

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

// ---------------------------------------------------------------------------
// Navigator / Notifier
// ---------------------------------------------------------------------------

/// Records every `reset_to` call.
#[derive(Debug, Default)]
pub struct RecordingNavigator {
    routes: Mutex<Vec<String>>,
}

impl RecordingNavigator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn resets(&self) -> Vec<String> {
        lock(&self.routes).clone()
    }
}

impl Navigator for RecordingNavigator {
    fn reset_to(&self, route: &str) {
        lock(&self.routes).push(route.to_string());
    }
}

/// Records every alert shown.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    alerts: Mutex<Vec<Alert>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alerts(&self) -> Vec<Alert> {
        lock(&self.alerts).clone()
    }

    pub fn count(&self) -> usize {
        lock(&self.alerts).len()
    }
}

impl Notifier for RecordingNotifier {
    fn alert(&self, alert: &Alert) {
        lock(&self.alerts).push(alert.clone());
    }
}

// ---------------------------------------------------------------------------
// CountingStore
// ---------------------------------------------------------------------------

/// A [`MemoryStore`] that counts writes and removals.
#[derive(Debug, Default)]
pub struct CountingStore {
    inner: MemoryStore,
    sets: AtomicUsize,
    removals: AtomicUsize,
}

impl CountingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entries<'a>(
        entries: impl IntoIterator<Item = (&'a str, &'a str)>,
    ) -> Self {
        Self {
            inner: MemoryStore::with_entries(entries),
            ..Self::default()
        }
    }

    pub fn inner(&self) -> &MemoryStore {
        &self.inner
    }

    pub fn sets(&self) -> usize {
        self.sets.load(Ordering::SeqCst)
    }

    pub fn removals(&self) -> usize {
        self.removals.load(Ordering::SeqCst)
    }
}

impl CredentialStore for CountingStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.sets.fetch_add(1, Ordering::SeqCst);
        self.inner.set(key, value).await
    }

    async fn remove_many(&self, keys: &[&str]) -> Result<(), StoreError> {
        self.removals.fetch_add(1, Ordering::SeqCst);
        self.inner.remove_many(keys).await
    }
}

/// A [`MemoryStore`] whose writes suspend after they land, like a device
/// flushing to disk. Lets a test drop a caller mid-write.
#[derive(Debug)]
pub struct SlowStore {
    inner: MemoryStore,
    delay: Duration,
}

impl SlowStore {
    pub fn new(delay: Duration) -> Self {
        Self {
            inner: MemoryStore::new(),
            delay,
        }
    }

    pub fn inner(&self) -> &MemoryStore {
        &self.inner
    }
}

impl CredentialStore for SlowStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.inner.set(key, value).await?;
        tokio::time::sleep(self.delay).await;
        Ok(())
    }

    async fn remove_many(&self, keys: &[&str]) -> Result<(), StoreError> {
        self.inner.remove_many(keys).await?;
        tokio::time::sleep(self.delay).await;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// ScriptedAuthService
// ---------------------------------------------------------------------------

/// Failure returned by [`ScriptedAuthService`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScriptedFailure {
    #[error("scripted failure: {0}")]
    Class(FailureClass),
    #[error("scripted rejection")]
    Rejected,
}

impl ServiceFailure for ScriptedFailure {
    fn classification(&self) -> Option<FailureClass> {
        match self {
            Self::Class(class) => Some(*class),
            Self::Rejected => None,
        }
    }
}

/// What one `validate` call resolves to.
pub type ValidateOutcome = Result<Option<Role>, ScriptedFailure>;

/// An [`AuthService`] whose validate results are scripted.
///
/// Scripted outcomes are consumed in order; once the script is empty every
/// call returns the fallback. Tracks call count and peak concurrency, and
/// a cancelled call still releases its in-flight slot.
#[derive(Debug)]
pub struct ScriptedAuthService {
    script: Mutex<VecDeque<ValidateOutcome>>,
    fallback: Mutex<ValidateOutcome>,
    delay: Mutex<Duration>,
    credentials: Mutex<Result<Credentials, ScriptedFailure>>,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl Default for ScriptedAuthService {
    fn default() -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            fallback: Mutex::new(Ok(None)),
            delay: Mutex::new(Duration::ZERO),
            credentials: Mutex::new(Ok(Credentials::new(
                "issued-token",
                Role::Member,
            ))),
            calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }
}

impl ScriptedAuthService {
    /// Every validate call succeeds unless scripted otherwise.
    pub fn new() -> Self {
        Self::default()
    }

    /// Every validate call fails with `class` unless scripted otherwise.
    pub fn failing(class: FailureClass) -> Self {
        let svc = Self::default();
        svc.set_fallback(Err(ScriptedFailure::Class(class)));
        svc
    }

    /// Queues one outcome.
    pub fn push(&self, outcome: ValidateOutcome) {
        lock(&self.script).push_back(outcome);
    }

    pub fn set_fallback(&self, outcome: ValidateOutcome) {
        *lock(&self.fallback) = outcome;
    }

    /// Makes every validate call take `delay` (tokio time).
    pub fn set_delay(&self, delay: Duration) {
        *lock(&self.delay) = delay;
    }

    pub fn set_credentials(&self, result: Result<Credentials, ScriptedFailure>) {
        *lock(&self.credentials) = result;
    }

    /// Validate calls started so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Highest number of validate calls ever running at once.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }
}

/// Decrements the in-flight counter when the call finishes or is dropped.
struct InFlight<'a>(&'a AtomicUsize);

impl<'a> InFlight<'a> {
    fn enter(counter: &'a AtomicUsize, peak: &AtomicUsize) -> Self {
        let now = counter.fetch_add(1, Ordering::SeqCst) + 1;
        peak.fetch_max(now, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl AuthService for ScriptedAuthService {
    type Error = ScriptedFailure;

    async fn login(
        &self,
        _email: &str,
        _password: &str,
    ) -> Result<Credentials, ScriptedFailure> {
        lock(&self.credentials).clone()
    }

    async fn register(
        &self,
        _email: &str,
        _password: &str,
        _profile: RegisterProfile,
    ) -> Result<Credentials, ScriptedFailure> {
        lock(&self.credentials).clone()
    }

    async fn validate(&self) -> Result<Option<Role>, ScriptedFailure> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let _slot = InFlight::enter(&self.in_flight, &self.max_in_flight);
        let scripted = lock(&self.script).pop_front();
        let outcome = scripted.unwrap_or_else(|| lock(&self.fallback).clone());
        let delay = *lock(&self.delay);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        outcome
    }
}
