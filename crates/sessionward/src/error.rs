//! Unified error type for Sessionward.

use sessionward_client::ApiError;
use sessionward_monitor::MonitorError;
use sessionward_protocol::ProtocolError;
use sessionward_session::{ServiceFailure, SessionError, StoreError};
use sessionward_transport::TransportError;

use crate::ConfigError;

/// Top-level error that wraps every crate-specific error, so `?` works
/// across layers.
#[derive(Debug, thiserror::Error)]
pub enum SessionwardError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Monitor(#[from] MonitorError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl SessionwardError {
    /// `true` when the error means the session is over.
    pub fn session_expired(&self) -> bool {
        match self {
            Self::Session(e) => e.session_expired(),
            Self::Api(e) => e.session_expired(),
            _ => false,
        }
    }
}
