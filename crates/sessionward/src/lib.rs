//! # Sessionward
//!
//! Session lifecycle and connectivity-resilient authentication for API
//! clients.
//!
//! Sessionward keeps a client's belief about "am I logged in" in step with
//! the server that issued the token, over a network that comes and goes:
//!
//! - every API call attaches the bearer token and classifies failures, so
//!   a dead session is told apart from a dead network or a plain
//!   permission problem;
//! - a background loop re-validates the token while a session is live and
//!   shows a reconnect countdown instead of logging the user out when the
//!   server can't be reached;
//! - however many callers discover an expired session at once, the user
//!   is logged out and alerted exactly once.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use sessionward::prelude::*;
//!
//! # async fn run() -> Result<(), SessionwardError> {
//! sessionward::telemetry::init_tracing();
//! let client = SessionClient::builder()
//!     .config(ClientConfig::from_env()?)
//!     .connect(FileStore::new("session.json"))?;
//!
//! if !client.load().await.is_authenticated() {
//!     client.login("user@example.com", "secret").await?;
//! }
//! let listings = client.api().get("/api/listings").await?;
//! # Ok(())
//! # }
//! ```

mod config;
mod error;
mod ports;
mod session_client;
pub mod telemetry;

pub use config::{BASE_URL_VAR, ClientConfig, ConfigError, TIMEOUT_VAR};
pub use error::SessionwardError;
pub use ports::{LogNavigator, LogNotifier};
pub use session_client::{SessionClient, SessionClientBuilder};

pub use sessionward_client as client;
pub use sessionward_monitor as monitor;
pub use sessionward_protocol as protocol;
pub use sessionward_session as session;
pub use sessionward_transport as transport;

/// Everything an application usually needs.
pub mod prelude {
    pub use crate::{ClientConfig, SessionClient, SessionwardError};
    pub use sessionward_client::{ApiClient, ApiError, ApiRequest};
    pub use sessionward_monitor::{ConnectionBanner, MonitorConfig, MonitorPhase};
    pub use sessionward_protocol::{Endpoints, FailureClass, RegisterProfile, Role};
    pub use sessionward_session::{
        Alert, CredentialStore, FileStore, LogoutNotice, MemoryStore, Navigator, Notifier,
        ServiceFailure, Session, SessionError,
    };
    pub use sessionward_transport::HttpTransport;
    #[cfg(feature = "reqwest")]
    pub use sessionward_transport::ReqwestTransport;
}
