//! The validation loop actor and its handle.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use sessionward_protocol::{FailureClass, Role};
use sessionward_session::{
    AuthService, AuthState, CredentialStore, LogoutBundle, Session, SessionError, SessionKey,
};
use tokio::sync::{mpsc, oneshot, watch};

use crate::{CheckScheduler, ConnectionBanner, Due, MonitorConfig, MonitorError, MonitorPhase};

type CheckFuture = Pin<Box<dyn Future<Output = Result<Role, SessionError>> + Send>>;

enum MonitorCommand {
    Shutdown { reply: oneshot::Sender<()> },
}

/// Handle to a running validation loop.
///
/// Cheap to clone. The loop runs until [`shutdown`](Self::shutdown) is
/// called or every handle is dropped.
#[derive(Clone)]
pub struct SessionMonitor {
    commands: mpsc::Sender<MonitorCommand>,
    phase: watch::Receiver<MonitorPhase>,
    banner: watch::Receiver<ConnectionBanner>,
}

impl SessionMonitor {
    /// Spawns the loop on the current tokio runtime.
    ///
    /// The loop follows the session held by `bundle`: it starts when a
    /// session begins and stops the moment it ends.
    pub fn spawn<S, A>(bundle: LogoutBundle<S>, auth: Arc<A>, config: MonitorConfig) -> Self
    where
        S: CredentialStore,
        A: AuthService,
    {
        let scheduler = CheckScheduler::new(config);
        let countdown_secs = scheduler.config().countdown_secs;
        let (commands, receiver) = mpsc::channel(4);
        let (phase_tx, phase) = watch::channel(MonitorPhase::Idle);
        let (banner_tx, banner) = watch::channel(ConnectionBanner::hidden(countdown_secs));

        let actor = MonitorActor {
            state: Arc::clone(bundle.state()),
            session_rx: bundle.state().subscribe(),
            bundle,
            auth,
            scheduler,
            receiver,
            phase: phase_tx,
            banner: banner_tx,
            key: None,
            in_flight: None,
        };
        tokio::spawn(actor.run());

        Self {
            commands,
            phase,
            banner,
        }
    }

    /// Observes the loop's phase.
    pub fn phase(&self) -> watch::Receiver<MonitorPhase> {
        self.phase.clone()
    }

    /// Observes the connectivity banner.
    pub fn banner(&self) -> watch::Receiver<ConnectionBanner> {
        self.banner.clone()
    }

    pub fn is_running(&self) -> bool {
        !self.commands.is_closed()
    }

    /// Stops the loop and waits for it to exit. Any check in flight is
    /// abandoned.
    pub async fn shutdown(&self) -> Result<(), MonitorError> {
        let (reply, done) = oneshot::channel();
        self.commands
            .send(MonitorCommand::Shutdown { reply })
            .await
            .map_err(|_| MonitorError::Unavailable)?;
        done.await.map_err(|_| MonitorError::Unavailable)
    }
}

/// A validation call in progress.
struct InFlight {
    epoch: u64,
    retry: bool,
    future: CheckFuture,
}

struct MonitorActor<S, A> {
    state: Arc<AuthState<S>>,
    session_rx: watch::Receiver<Session>,
    bundle: LogoutBundle<S>,
    auth: Arc<A>,
    scheduler: CheckScheduler,
    receiver: mpsc::Receiver<MonitorCommand>,
    phase: watch::Sender<MonitorPhase>,
    banner: watch::Sender<ConnectionBanner>,
    /// The session being monitored.
    key: Option<SessionKey>,
    in_flight: Option<InFlight>,
}

impl<S: CredentialStore, A: AuthService> MonitorActor<S, A> {
    async fn run(mut self) {
        tracing::debug!("session monitor started");
        self.on_session_change();

        loop {
            // Session changes are handled first so a stale timer or check
            // result never runs after the session it belonged to is gone.
            tokio::select! {
                biased;

                changed = self.session_rx.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    self.on_session_change();
                }

                cmd = self.receiver.recv() => match cmd {
                    Some(MonitorCommand::Shutdown { reply }) => {
                        self.stop();
                        let _ = reply.send(());
                        break;
                    }
                    None => break,
                },

                result = wait_in_flight(&mut self.in_flight) => {
                    if let Some(check) = self.in_flight.take() {
                        self.on_check_result(check, result).await;
                    }
                }

                due = self.scheduler.next_due() => self.on_due(due).await,
            }
        }

        self.stop();
        tracing::debug!("session monitor exited");
    }

    // -----------------------------------------------------------------------
    // Session changes
    // -----------------------------------------------------------------------

    fn on_session_change(&mut self) {
        let key = self.session_rx.borrow_and_update().key();
        if key == self.key {
            return;
        }
        self.cancel();
        self.key = key;

        match &self.key {
            Some(key) => {
                tracing::debug!(epoch = key.epoch, "session started, settling");
                self.scheduler.arm_settle();
                self.set_phase(MonitorPhase::Starting);
            }
            None => {
                tracing::debug!("session ended, checks stopped");
                self.set_phase(MonitorPhase::Stopped);
            }
        }
    }

    /// Drops the check in flight, disarms timers, hides the banner.
    fn cancel(&mut self) {
        // Dropping the boxed future is the cancellation. Any state change
        // it had started runs to completion on its own task.
        if self.in_flight.take().is_some() {
            tracing::debug!("abandoned in-flight check");
        }
        self.scheduler.clear();
        self.hide_banner();
    }

    fn stop(&mut self) {
        self.cancel();
        self.set_phase(MonitorPhase::Stopped);
    }

    // -----------------------------------------------------------------------
    // Timers
    // -----------------------------------------------------------------------

    async fn on_due(&mut self, due: Due) {
        match due {
            Due::Settled => self.confirm_durable().await,
            Due::Tick(tick) => {
                if self.in_flight.is_some() {
                    tracing::trace!(tick, "check still in flight, skipping tick");
                } else {
                    self.start_check(false);
                }
            }
            Due::Countdown(0) => {
                tracing::info!("reconnect countdown finished, retrying");
                self.hide_banner();
            }
            Due::Countdown(remaining) => {
                self.banner
                    .send_replace(ConnectionBanner::showing(remaining));
            }
            Due::Retry => {
                self.set_phase(MonitorPhase::Checking);
                self.start_check(true);
            }
        }
    }

    /// Confirms the stored token is the session's before checking.
    async fn confirm_durable(&mut self) {
        let Some(key) = self.key.clone() else {
            return;
        };
        match self.state.persisted_token().await {
            Ok(Some(stored)) if stored == key.token => {
                tracing::info!(epoch = key.epoch, "session confirmed, checking");
                self.set_phase(MonitorPhase::Checking);
                self.scheduler.start_periodic();
                self.start_check(false);
            }
            Ok(_) => {
                tracing::warn!(epoch = key.epoch, "stored token does not match session, not checking");
                self.set_phase(MonitorPhase::Idle);
            }
            Err(e) => {
                tracing::warn!(epoch = key.epoch, error = %e, "could not read stored token, not checking");
                self.set_phase(MonitorPhase::Idle);
            }
        }
    }

    // -----------------------------------------------------------------------
    // Checks
    // -----------------------------------------------------------------------

    fn start_check(&mut self, retry: bool) {
        let Some(key) = &self.key else {
            return;
        };
        let state = Arc::clone(&self.state);
        let auth = Arc::clone(&self.auth);
        tracing::debug!(epoch = key.epoch, retry, "validating session");
        self.in_flight = Some(InFlight {
            epoch: key.epoch,
            retry,
            future: Box::pin(async move { state.validate_token(&*auth).await }),
        });
    }

    async fn on_check_result(&mut self, check: InFlight, result: Result<Role, SessionError>) {
        match result {
            Ok(role) => {
                tracing::debug!(epoch = check.epoch, %role, "session valid");
                self.hide_banner();
                self.scheduler.resume();
                self.set_phase(MonitorPhase::Checking);
            }
            Err(SessionError::SessionExpired) => {
                tracing::info!(epoch = check.epoch, "session rejected, stopping checks");
                self.stop();
                self.bundle.fire(check.epoch).await;
            }
            Err(SessionError::Unverified {
                class: Some(FailureClass::NetworkUnreachable),
                ..
            }) => {
                let secs = self.scheduler.config().countdown_secs;
                tracing::warn!(
                    epoch = check.epoch,
                    retry = check.retry,
                    countdown = secs,
                    "server unreachable, retrying after countdown"
                );
                self.scheduler.start_countdown();
                self.banner.send_replace(ConnectionBanner::showing(secs));
                self.set_phase(MonitorPhase::ConnectionError);
            }
            Err(SessionError::Superseded | SessionError::NotAuthenticated) => {
                tracing::debug!(epoch = check.epoch, "check result no longer applies");
            }
            Err(e) => {
                tracing::warn!(epoch = check.epoch, error = %e, "check failed, continuing");
                self.scheduler.resume();
                self.set_phase(MonitorPhase::Checking);
            }
        }
    }

    // -----------------------------------------------------------------------
    // Publishing
    // -----------------------------------------------------------------------

    fn set_phase(&self, next: MonitorPhase) {
        self.phase.send_if_modified(|phase| {
            if *phase == next {
                return false;
            }
            tracing::trace!(from = %phase, to = %next, "monitor phase");
            *phase = next;
            true
        });
    }

    fn hide_banner(&self) {
        let hidden = ConnectionBanner::hidden(self.scheduler.config().countdown_secs);
        self.banner.send_if_modified(|banner| {
            let changed = *banner != hidden;
            *banner = hidden;
            changed
        });
    }
}

/// Resolves with the in-flight check's result; pends forever when there
/// is none.
async fn wait_in_flight(slot: &mut Option<InFlight>) -> Result<Role, SessionError> {
    match slot {
        Some(check) => check.future.as_mut().await,
        None => std::future::pending().await,
    }
}
