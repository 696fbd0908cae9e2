//! HTTP transport abstraction for Sessionward.
//!
//! Provides the [`HttpTransport`] trait that every outbound call goes
//! through, plus the plain request/response types that cross it. The
//! failure classifier sits on top of this seam and never sees a concrete
//! HTTP library.
//!
//! # Feature Flags
//!
//! - `reqwest` (default): [`ReqwestTransport`] backed by `reqwest::Client`
//! - `testing`: [`testing::ScriptedTransport`] for tests in downstream crates

mod error;
#[cfg(feature = "reqwest")]
mod reqwest_transport;
#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use error::TransportError;
#[cfg(feature = "reqwest")]
pub use reqwest_transport::ReqwestTransport;

use std::borrow::Cow;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

/// HTTP method of an outbound request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl Method {
    /// Returns the canonical upper-case method name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A request ready to be put on the wire.
///
/// `path` is relative to the transport's base URL and may carry a query
/// string. Header names are matched case-insensitively.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: Method,
    pub path: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<Vec<u8>>,
}

impl HttpRequest {
    /// Creates a request with no headers and no body.
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            headers: Vec::new(),
            body: None,
        }
    }

    /// Builder-style [`set_header`](Self::set_header).
    pub fn with_header(
        mut self,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.set_header(name, value);
        self
    }

    /// Attaches a body.
    pub fn with_body(mut self, body: Vec<u8>) -> Self {
        self.body = Some(body);
        self
    }

    /// Sets a header, replacing any existing header with the same name.
    pub fn set_header(
        &mut self,
        name: impl Into<String>,
        value: impl Into<String>,
    ) {
        let name = name.into();
        self.headers.retain(|(n, _)| !n.eq_ignore_ascii_case(&name));
        self.headers.push((name, value.into()));
    }

    /// Returns the value of the first header named `name`.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// A response that made it back from the server, whatever its status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// `true` for 2xx statuses.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// `true` for 5xx statuses.
    pub fn is_server_error(&self) -> bool {
        (500..600).contains(&self.status)
    }

    /// The body decoded as UTF-8, lossily.
    pub fn body_text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }
}

/// Sends requests and returns whatever response came back.
///
/// Implementations must return `Ok` for ANY received response, including
/// 4xx/5xx; `Err` is reserved for "no response at all". That split is
/// what lets the classifier tell a dead session from a dead network.
pub trait HttpTransport: Send + Sync + 'static {
    /// Executes a single request.
    fn execute(
        &self,
        request: HttpRequest,
    ) -> impl Future<Output = Result<HttpResponse, TransportError>> + Send;
}

impl<T: HttpTransport> HttpTransport for Arc<T> {
    fn execute(
        &self,
        request: HttpRequest,
    ) -> impl Future<Output = Result<HttpResponse, TransportError>> + Send {
        (**self).execute(request)
    }
}
