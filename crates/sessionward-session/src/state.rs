//! The auth state container.
//!
//! [`AuthState`] owns the [`Session`] and is the only thing that mutates
//! it. Every transition runs under one async lock, so storage writes and
//! the in-memory snapshot always move together. Observers subscribe to a
//! `watch` channel and see each transition as a whole.
//!
//! Transitions that write storage run on their own task. A caller that
//! is dropped mid-transition only stops waiting; the transition itself
//! still finishes.

use std::sync::Arc;

use sessionward_protocol::{AUTH_KEYS, Credentials, ROLE_KEY, Role, TOKEN_KEY};
use tokio::sync::{Mutex, watch};

use crate::{
    AuthService, CredentialStore, ServiceFailure, Session, SessionError,
    SessionKey, StoreError,
};

/// Where the current epoch is in its life.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EpochState {
    /// Nothing has authenticated in this epoch.
    Empty,
    /// A session is live.
    Live,
    /// The auth service rejected the token and storage is cleared, but the
    /// logout bundle has not run for this epoch yet.
    Expired,
    /// Ended by the logout bundle or by sign-out.
    Ended,
}

/// Single source of truth for authentication state.
///
/// ```text
///          load (token) / save            validate: AuthExpired
///  Empty ───────────────────────▶ Live ──────────────────────▶ Expired
///    ▲                             │  end_session / sign_out      │
///    │                             ▼                              │
///    └────── next save/load ──── Ended ◀────── end_session ───────┘
/// ```
pub struct AuthState<S> {
    shared: Arc<Shared<S>>,
}

/// The parts a detached transition needs to own.
struct Shared<S> {
    store: S,
    session: watch::Sender<Session>,
    lifecycle: Mutex<EpochState>,
}

impl<S: CredentialStore> AuthState<S> {
    pub fn new(store: S) -> Self {
        let (session, _) = watch::channel(Session::initial());
        Self {
            shared: Arc::new(Shared {
                store,
                session,
                lifecycle: Mutex::new(EpochState::Empty),
            }),
        }
    }

    /// Snapshot of the current session.
    pub fn current(&self) -> Session {
        self.shared.current()
    }

    /// Receiver that observes every transition.
    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.shared.session.subscribe()
    }

    pub fn store(&self) -> &S {
        &self.shared.store
    }

    /// The token currently in durable storage, if any.
    pub async fn persisted_token(&self) -> Result<Option<String>, StoreError> {
        Ok(non_empty(self.shared.store.get(TOKEN_KEY).await?))
    }

    /// Restores a stored session optimistically.
    ///
    /// With a stored token the session becomes authenticated immediately
    /// under a new epoch, and the token is validated in the background. A
    /// validation that can't reach a verdict keeps the session; only a
    /// confirmed rejection clears it. Storage read failures count as
    /// "no stored session".
    pub async fn load<A: AuthService>(self: &Arc<Self>, auth: Arc<A>) -> Session {
        let shared = &self.shared;
        // Only reads storage before the publish, so cancelling it part way
        // leaves nothing behind.
        let mut lifecycle = shared.lifecycle.lock().await;

        let token = match shared.store.get(TOKEN_KEY).await {
            Ok(token) => non_empty(token),
            Err(e) => {
                tracing::warn!(error = %e, "reading stored token failed");
                None
            }
        };

        let Some(token) = token else {
            shared.session.send_modify(|s| s.is_loading = false);
            tracing::debug!("no stored session");
            return self.current();
        };

        let role = match shared.store.get(ROLE_KEY).await {
            Ok(role) => non_empty(role).map(|r| Role::parse(&r)).unwrap_or_default(),
            Err(e) => {
                tracing::warn!(error = %e, "reading stored role failed");
                Role::default()
            }
        };

        let epoch = shared.current_epoch() + 1;
        *lifecycle = EpochState::Live;
        shared
            .session
            .send_replace(Session::authenticated(token, role, epoch));
        drop(lifecycle);

        tracing::info!(epoch, %role, "restored stored session");

        let state = Arc::clone(self);
        tokio::spawn(async move {
            match state.validate_token(&*auth).await {
                Ok(role) => tracing::debug!(epoch, %role, "stored session confirmed"),
                Err(SessionError::SessionExpired) => {
                    tracing::info!(epoch, "stored session was expired");
                }
                Err(e) => {
                    tracing::debug!(epoch, error = %e, "stored session kept unverified");
                }
            }
        });

        self.current()
    }

    /// Persists fresh credentials and publishes them as a new epoch.
    ///
    /// Persistence is best-effort: a storage failure is logged and the
    /// in-memory session still becomes authenticated.
    pub async fn save(&self, credentials: Credentials) -> Session {
        self.detached(
            move |shared| async move { shared.save(credentials).await },
            || self.current(),
        )
        .await
    }

    /// Clears storage and memory. Calling it again is a no-op.
    pub async fn sign_out(&self) -> Session {
        self.detached(
            |shared| async move { shared.sign_out().await },
            || self.current(),
        )
        .await
    }

    /// Asks the auth service whether the current token is still valid.
    ///
    /// - confirmed valid: the role is refreshed (the current role is kept
    ///   when the response carries none) and returned.
    /// - rejected (`AuthExpired`): storage and memory are cleared and
    ///   [`SessionError::SessionExpired`] is returned.
    /// - anything else: [`SessionError::Unverified`], nothing touched.
    ///
    /// A result that arrives after the session it was issued for has been
    /// replaced or ended is discarded with [`SessionError::Superseded`].
    pub async fn validate_token<A: AuthService>(
        &self,
        auth: &A,
    ) -> Result<Role, SessionError> {
        let Some(key) = self.current().key() else {
            return Err(SessionError::NotAuthenticated);
        };
        // The request itself may be abandoned freely; applying its verdict
        // may not.
        let outcome = auth.validate().await;
        self.detached(
            move |shared| async move { shared.apply_validation(&key, outcome).await },
            || Err(SessionError::Superseded),
        )
        .await
    }

    /// Ends the session of `epoch`, clearing it if still live.
    ///
    /// Returns `true` only for the first call per authenticated epoch, so
    /// the caller can run its one-time side effects. Stale epochs and
    /// epochs that never authenticated return `false`.
    pub(crate) async fn end_session(&self, epoch: u64) -> bool {
        self.detached(
            move |shared| async move { shared.end_session(epoch).await },
            || false,
        )
        .await
    }

    /// Runs `transition` on its own task and waits for it.
    ///
    /// `fallback` is only used if the runtime drops the task, which happens
    /// at shutdown. A panic inside the transition is re-raised here.
    async fn detached<T, F, Fut>(&self, transition: F, fallback: impl FnOnce() -> T) -> T
    where
        F: FnOnce(Arc<Shared<S>>) -> Fut,
        Fut: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        match tokio::spawn(transition(Arc::clone(&self.shared))).await {
            Ok(value) => value,
            Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
            Err(e) => {
                tracing::warn!(error = %e, "session transition dropped by the runtime");
                fallback()
            }
        }
    }
}

impl<S: CredentialStore> Shared<S> {
    fn current(&self) -> Session {
        self.session.borrow().clone()
    }

    fn current_epoch(&self) -> u64 {
        self.session.borrow().epoch
    }

    async fn save(&self, credentials: Credentials) -> Session {
        let mut lifecycle = self.lifecycle.lock().await;
        let Credentials { token, role } = credentials;
        let epoch = self.current_epoch() + 1;

        if token.trim().is_empty() {
            tracing::warn!(epoch, "refusing to save an empty token");
            self.clear(epoch).await;
            *lifecycle = EpochState::Empty;
            return self.current();
        }

        // Role is written in its canonical upper-case form.
        if let Err(e) = self.store.set(TOKEN_KEY, &token).await {
            tracing::warn!(error = %e, "persisting token failed, session kept in memory");
        }
        if let Err(e) = self.store.set(ROLE_KEY, role.as_str()).await {
            tracing::warn!(error = %e, "persisting role failed, session kept in memory");
        }

        *lifecycle = EpochState::Live;
        self.session
            .send_replace(Session::authenticated(token, role, epoch));
        tracing::info!(epoch, %role, "session saved");
        self.current()
    }

    async fn sign_out(&self) -> Session {
        let mut lifecycle = self.lifecycle.lock().await;
        let epoch = self.current_epoch();
        match *lifecycle {
            EpochState::Ended => {
                tracing::debug!(epoch, "already signed out");
                return self.current();
            }
            // Already cleared when it expired.
            EpochState::Expired => {}
            // `Empty` still clears: storage may hold a token `load` never
            // got to read.
            EpochState::Empty | EpochState::Live => self.clear(epoch).await,
        }
        *lifecycle = EpochState::Ended;
        tracing::info!(epoch, "signed out");
        self.current()
    }

    async fn apply_validation<E: ServiceFailure>(
        &self,
        key: &SessionKey,
        outcome: Result<Option<Role>, E>,
    ) -> Result<Role, SessionError> {
        let mut lifecycle = self.lifecycle.lock().await;
        let current = self.current();

        // A newer epoch means a newer login; its token is not the one
        // this verdict is about.
        if current.epoch != key.epoch {
            tracing::debug!(
                issued = key.epoch,
                current = current.epoch,
                "discarding validation for a replaced session"
            );
            return Err(SessionError::Superseded);
        }

        match outcome {
            Ok(role) => {
                if current.key().as_ref() != Some(key) {
                    tracing::debug!(epoch = key.epoch, "session ended before validation returned");
                    return Err(SessionError::Superseded);
                }
                let role = role.or(current.role).unwrap_or_default();
                // Observers only wake when the role actually moved.
                self.session.send_if_modified(|s| {
                    let changed = s.role != Some(role);
                    s.role = Some(role);
                    changed
                });
                Ok(role)
            }
            Err(e) if e.session_expired() => {
                // Clear once; a second rejection for the same epoch only
                // reports it.
                if *lifecycle == EpochState::Live {
                    self.clear(key.epoch).await;
                    *lifecycle = EpochState::Expired;
                    tracing::info!(epoch = key.epoch, "token rejected, session cleared");
                }
                Err(SessionError::SessionExpired)
            }
            Err(e) => {
                tracing::warn!(
                    epoch = key.epoch,
                    class = ?e.classification(),
                    error = %e,
                    "token could not be verified, session kept"
                );
                Err(SessionError::Unverified {
                    class: e.classification(),
                    reason: e.to_string(),
                })
            }
        }
    }

    async fn end_session(&self, epoch: u64) -> bool {
        let mut lifecycle = self.lifecycle.lock().await;
        if self.current_epoch() != epoch {
            tracing::debug!(epoch, "ignoring end of a replaced session");
            return false;
        }
        match *lifecycle {
            EpochState::Live => self.clear(epoch).await,
            EpochState::Expired => {}
            EpochState::Empty | EpochState::Ended => return false,
        }
        *lifecycle = EpochState::Ended;
        tracing::info!(epoch, "session ended");
        true
    }

    /// Removes the auth keys and publishes a cleared session.
    /// Callers hold the lifecycle lock.
    async fn clear(&self, epoch: u64) {
        if let Err(e) = self.store.remove_many(&AUTH_KEYS).await {
            tracing::warn!(error = %e, "removing stored credentials failed");
        }
        self.session.send_replace(Session::cleared(epoch));
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
