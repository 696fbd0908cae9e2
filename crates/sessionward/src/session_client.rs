//! `SessionClient`: the wired-up stack.

use std::sync::Arc;

use sessionward_client::{ApiClient, ApiError, AuthApi};
use sessionward_monitor::{ConnectionBanner, MonitorError, MonitorPhase, SessionMonitor};
use sessionward_protocol::{RegisterProfile, Role};
use sessionward_session::{
    AccessGuard, AuthService, AuthState, CredentialStore, LogoutBundle, Navigator, Notifier,
    Session, SessionError,
};
use sessionward_transport::HttpTransport;
use tokio::sync::watch;

use crate::{ClientConfig, LogNavigator, LogNotifier};

/// Builder for [`SessionClient`].
///
/// ```rust,no_run
/// # use sessionward::prelude::*;
/// # fn demo() -> Result<(), SessionwardError> {
/// let client = SessionClient::builder()
///     .config(ClientConfig::default().with_base_url("http://localhost:3000"))
///     .connect(MemoryStore::new())?;
/// # Ok(())
/// # }
/// ```
pub struct SessionClientBuilder {
    config: ClientConfig,
    navigator: Option<Arc<dyn Navigator>>,
    notifier: Option<Arc<dyn Notifier>>,
}

impl SessionClientBuilder {
    pub fn new() -> Self {
        Self {
            config: ClientConfig::default(),
            navigator: None,
            notifier: None,
        }
    }

    pub fn config(mut self, config: ClientConfig) -> Self {
        self.config = config;
        self
    }

    /// Where the navigation stack is reset when a session ends. Defaults to
    /// [`LogNavigator`].
    pub fn navigator(mut self, navigator: Arc<dyn Navigator>) -> Self {
        self.navigator = Some(navigator);
        self
    }

    /// Who shows alerts. Defaults to [`LogNotifier`].
    pub fn notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    /// Wires the stack over `transport` and `store` and spawns the
    /// validation loop.
    ///
    /// Must be called inside a tokio runtime.
    pub fn build<T, S>(self, transport: T, store: S) -> SessionClient<T, S>
    where
        T: HttpTransport,
        S: CredentialStore,
    {
        let Self {
            config,
            navigator,
            notifier,
        } = self;

        let bundle = LogoutBundle::new(
            Arc::new(AuthState::new(store)),
            navigator.unwrap_or_else(|| Arc::new(LogNavigator)),
            notifier.unwrap_or_else(|| Arc::new(LogNotifier)),
            config.notice,
        );
        let api = ApiClient::new(transport, bundle.clone(), config.endpoints);
        let auth = Arc::new(AuthApi::new(api.clone()));
        let monitor = SessionMonitor::spawn(bundle.clone(), Arc::clone(&auth), config.monitor);

        tracing::info!(base_url = %config.base_url, "session client ready");
        SessionClient {
            bundle,
            api,
            auth,
            monitor,
        }
    }

    /// Like [`build`](Self::build), over a [`ReqwestTransport`] for the
    /// configured base URL and timeout.
    ///
    /// [`ReqwestTransport`]: sessionward_transport::ReqwestTransport
    #[cfg(feature = "reqwest")]
    pub fn connect<S: CredentialStore>(
        self,
        store: S,
    ) -> Result<SessionClient<sessionward_transport::ReqwestTransport, S>, crate::SessionwardError>
    {
        let transport = sessionward_transport::ReqwestTransport::new(
            self.config.base_url.clone(),
            self.config.request_timeout,
        )?;
        Ok(self.build(transport, store))
    }
}

impl Default for SessionClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// The session, the classifying API client, and the validation loop,
/// sharing one logout bundle.
///
/// Cheap to clone. The validation loop keeps running until
/// [`shutdown`](Self::shutdown) or until every clone is dropped.
pub struct SessionClient<T, S> {
    bundle: LogoutBundle<S>,
    api: ApiClient<T, S>,
    auth: Arc<AuthApi<T, S>>,
    monitor: SessionMonitor,
}

impl<T, S> Clone for SessionClient<T, S> {
    fn clone(&self) -> Self {
        Self {
            bundle: self.bundle.clone(),
            api: self.api.clone(),
            auth: Arc::clone(&self.auth),
            monitor: self.monitor.clone(),
        }
    }
}

impl SessionClient<(), ()> {
    pub fn builder() -> SessionClientBuilder {
        SessionClientBuilder::new()
    }
}

impl<T: HttpTransport, S: CredentialStore> SessionClient<T, S> {
    // -----------------------------------------------------------------------
    // Session lifecycle
    // -----------------------------------------------------------------------

    /// Restores a stored session, if any. See [`AuthState::load`].
    pub async fn load(&self) -> Session {
        self.state().load(Arc::clone(&self.auth)).await
    }

    /// Logs in and starts a new session.
    ///
    /// Failures come back raw (`ApiError::Status` or `ApiError::Transport`)
    /// and leave any current session alone.
    pub async fn login(&self, email: &str, password: &str) -> Result<Session, ApiError> {
        let credentials = self.auth.login(email, password).await?;
        Ok(self.state().save(credentials).await)
    }

    /// Creates an account and starts a session for it.
    pub async fn register(
        &self,
        email: &str,
        password: &str,
        profile: RegisterProfile,
    ) -> Result<Session, ApiError> {
        let credentials = self.auth.register(email, password, profile).await?;
        Ok(self.state().save(credentials).await)
    }

    /// Ends the session. Calling it again is a no-op.
    pub async fn sign_out(&self) -> Session {
        self.state().sign_out().await
    }

    /// Validates the current token once, outside the loop's schedule.
    pub async fn validate_token(&self) -> Result<Role, SessionError> {
        self.state().validate_token(&*self.auth).await
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    pub fn session(&self) -> Session {
        self.state().current()
    }

    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.state().subscribe()
    }

    pub fn state(&self) -> &Arc<AuthState<S>> {
        self.bundle.state()
    }

    /// The classifying client for business calls.
    pub fn api(&self) -> &ApiClient<T, S> {
        &self.api
    }

    pub fn access_guard(&self) -> AccessGuard<S> {
        self.bundle.access_guard()
    }

    /// Guards a protected screen, re-validating the token with the API.
    /// See [`AccessGuard::verify`].
    pub async fn verify_access(&self) -> Result<Session, SessionError> {
        self.access_guard().verify(&*self.auth).await
    }

    pub fn monitor(&self) -> &SessionMonitor {
        &self.monitor
    }

    pub fn banner(&self) -> watch::Receiver<ConnectionBanner> {
        self.monitor.banner()
    }

    pub fn phase(&self) -> watch::Receiver<MonitorPhase> {
        self.monitor.phase()
    }

    /// Stops the validation loop. The session itself is left as it is.
    pub async fn shutdown(&self) -> Result<(), MonitorError> {
        self.monitor.shutdown().await
    }
}
