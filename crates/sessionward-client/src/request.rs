//! Outbound API requests and the retry marker.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use sessionward_transport::{HttpRequest, Method};

/// Flags a request that has already been through classification.
///
/// Clones share the flag, so re-sending a clone of a classified request
/// skips classification too and its failure comes back raw.
#[derive(Debug, Clone, Default)]
pub struct RetryMarker(Arc<AtomicBool>);

impl RetryMarker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks the request. Returns `true` if it was not marked before.
    pub fn mark(&self) -> bool {
        !self.0.swap(true, Ordering::SeqCst)
    }

    pub fn is_marked(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// A request to the API, before auth headers are attached.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    http: HttpRequest,
    marker: RetryMarker,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            http: HttpRequest::new(method, path),
            marker: RetryMarker::new(),
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::Get, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::Delete, path)
    }

    pub fn with_header(
        mut self,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.http.set_header(name, value);
        self
    }

    /// Attaches an encoded body and its content type.
    pub fn with_body(mut self, body: Vec<u8>, content_type: &str) -> Self {
        self.http.set_header("Content-Type", content_type);
        self.http.body = Some(body);
        self
    }

    pub fn method(&self) -> Method {
        self.http.method
    }

    pub fn path(&self) -> &str {
        &self.http.path
    }

    pub fn marker(&self) -> &RetryMarker {
        &self.marker
    }

    pub(crate) fn http(&self) -> &HttpRequest {
        &self.http
    }
}
