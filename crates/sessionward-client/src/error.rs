//! Classified API errors.

use sessionward_protocol::{Codec, ErrorBody, FailureClass, JsonCodec, ProtocolError};
use sessionward_session::ServiceFailure;
use sessionward_transport::{HttpResponse, TransportError};

/// What went wrong with an API call.
///
/// The first four variants are the classifier's verdicts. `Transport` and
/// `Status` are raw failures that were deliberately not classified: calls
/// to the unauthenticated allow-list, ordinary 4xx responses, and repeats
/// of a request that was already classified once.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The server no longer accepts the session. The logout bundle has
    /// been fired for the session the request was sent under.
    #[error("session expired (HTTP {status})")]
    AuthExpired { status: u16 },

    /// The session is fine but the caller may not do this. Carries the
    /// original response untouched.
    #[error("permission denied (HTTP {})", .0.status)]
    PermissionDenied(HttpResponse),

    /// No response arrived.
    #[error("network unreachable: {0}")]
    NetworkUnreachable(#[source] TransportError),

    #[error("server error (HTTP {})", .0.status)]
    ServerError(HttpResponse),

    #[error("transport error: {0}")]
    Transport(#[source] TransportError),

    #[error("request failed (HTTP {})", .0.status)]
    Status(HttpResponse),

    #[error(transparent)]
    Decode(#[from] ProtocolError),
}

impl ApiError {
    /// The response behind this error, if one arrived.
    pub fn response(&self) -> Option<&HttpResponse> {
        match self {
            Self::PermissionDenied(r) | Self::ServerError(r) | Self::Status(r) => Some(r),
            _ => None,
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            Self::AuthExpired { status } => Some(*status),
            _ => self.response().map(|r| r.status),
        }
    }

    /// The server's error message (`message` or `error` field), if the
    /// response carried one.
    pub fn server_message(&self) -> Option<String> {
        let response = self.response()?;
        let body: ErrorBody = JsonCodec.decode(&response.body).ok()?;
        body.text().map(str::to_owned)
    }
}

impl ServiceFailure for ApiError {
    fn classification(&self) -> Option<FailureClass> {
        match self {
            Self::AuthExpired { .. } => Some(FailureClass::AuthExpired),
            Self::PermissionDenied(_) => Some(FailureClass::PermissionDenied),
            Self::NetworkUnreachable(_) => Some(FailureClass::NetworkUnreachable),
            Self::ServerError(_) => Some(FailureClass::ServerError),
            Self::Transport(_) | Self::Status(_) | Self::Decode(_) => None,
        }
    }
}
