//! The API client and its failure classifier.

use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use sessionward_protocol::{AUTHORIZATION, Codec, Endpoints, JsonCodec, bearer};
use sessionward_session::{AuthState, CredentialStore, LogoutBundle, Session};
use sessionward_transport::{
    HttpRequest, HttpResponse, HttpTransport, Method, TransportError,
};

use crate::{ApiError, ApiRequest};

struct Inner<T, S, C> {
    transport: T,
    bundle: LogoutBundle<S>,
    endpoints: Endpoints,
    codec: C,
}

/// Sends API requests and classifies their failures.
///
/// Cheap to clone; clones share the transport and the logout bundle.
pub struct ApiClient<T, S, C = JsonCodec> {
    inner: Arc<Inner<T, S, C>>,
}

impl<T, S, C> Clone for ApiClient<T, S, C> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: HttpTransport, S: CredentialStore> ApiClient<T, S> {
    pub fn new(transport: T, bundle: LogoutBundle<S>, endpoints: Endpoints) -> Self {
        Self::with_codec(transport, bundle, endpoints, JsonCodec)
    }
}

impl<T: HttpTransport, S: CredentialStore, C: Codec> ApiClient<T, S, C> {
    pub fn with_codec(
        transport: T,
        bundle: LogoutBundle<S>,
        endpoints: Endpoints,
        codec: C,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                transport,
                bundle,
                endpoints,
                codec,
            }),
        }
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.inner.endpoints
    }

    pub fn bundle(&self) -> &LogoutBundle<S> {
        &self.inner.bundle
    }

    pub fn state(&self) -> &Arc<AuthState<S>> {
        self.inner.bundle.state()
    }

    pub fn codec(&self) -> &C {
        &self.inner.codec
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    pub async fn get(&self, path: impl Into<String>) -> Result<HttpResponse, ApiError> {
        self.send(ApiRequest::get(path)).await
    }

    pub async fn delete(&self, path: impl Into<String>) -> Result<HttpResponse, ApiError> {
        self.send(ApiRequest::delete(path)).await
    }

    pub async fn post_json<B: Serialize>(
        &self,
        path: impl Into<String>,
        body: &B,
    ) -> Result<HttpResponse, ApiError> {
        self.send(self.encoded(Method::Post, path, body)?).await
    }

    pub async fn put_json<B: Serialize>(
        &self,
        path: impl Into<String>,
        body: &B,
    ) -> Result<HttpResponse, ApiError> {
        self.send(self.encoded(Method::Put, path, body)?).await
    }

    /// Decodes a response body with the client's codec.
    pub fn decode<D: DeserializeOwned>(&self, response: &HttpResponse) -> Result<D, ApiError> {
        // `?` turns the `ProtocolError` into `ApiError::Decode` through the
        // `#[from]` conversion on the error enum.
        Ok(self.inner.codec.decode(&response.body)?)
    }

    fn encoded<B: Serialize>(
        &self,
        method: Method,
        path: impl Into<String>,
        body: &B,
    ) -> Result<ApiRequest, ApiError> {
        let codec = &self.inner.codec;
        Ok(ApiRequest::new(method, path).with_body(codec.encode(body)?, codec.content_type()))
    }

    // -----------------------------------------------------------------------
    // Send + classify
    // -----------------------------------------------------------------------

    /// Sends a request and classifies the outcome.
    ///
    /// The token and session epoch are read from the session at call time.
    /// If the outcome is `AuthExpired`, the logout bundle fires for that
    /// epoch before this returns, so a late 401 from a session that has
    /// since been replaced never logs the new one out.
    pub async fn send(&self, request: ApiRequest) -> Result<HttpResponse, ApiError> {
        // One snapshot for the whole call: the token that goes out and the
        // epoch a 401 is charged to must belong to the same session.
        let session = self.state().current();
        let public = self.inner.endpoints.is_public(request.path());
        let http = self.prepare(&request, &session, public);

        tracing::debug!(method = %http.method, path = %http.path, "sending request");
        let result = self.inner.transport.execute(http).await;

        // Allow-listed paths and requests already classified once come back
        // untouched.
        if public || request.marker().is_marked() {
            return raw(result);
        }
        self.classify(&request, session.epoch(), result).await
    }

    fn prepare(&self, request: &ApiRequest, session: &Session, public: bool) -> HttpRequest {
        let mut http = request.http().clone();
        http.set_header("Accept", self.inner.codec.content_type());
        if !public {
            if let Some(token) = session.token() {
                http.set_header(AUTHORIZATION, bearer(token));
            }
        }
        http
    }

    async fn classify(
        &self,
        request: &ApiRequest,
        epoch: u64,
        result: Result<HttpResponse, TransportError>,
    ) -> Result<HttpResponse, ApiError> {
        let response = match result {
            Ok(response) if response.is_success() => return Ok(response),
            Ok(response) => response,
            Err(e) => {
                request.marker().mark();
                tracing::warn!(path = %request.path(), error = %e, "no response");
                return Err(ApiError::NetworkUnreachable(e));
            }
        };
        request.marker().mark();

        match response.status {
            401 => self.expire(epoch, 401).await,
            403 if self.inner.endpoints.is_validate(request.path()) => {
                self.expire(epoch, 403).await
            }
            403 => self.recheck(request, epoch, response).await,
            // Only a 5xx that carries a body counts; a bare one falls
            // through to `Status`.
            _ if response.is_server_error() && !response.body.is_empty() => {
                tracing::warn!(path = %request.path(), status = response.status, "server error");
                Err(ApiError::ServerError(response))
            }
            status => {
                tracing::debug!(path = %request.path(), status, "request failed");
                Err(ApiError::Status(response))
            }
        }
    }

    /// A 403 from a business endpoint: ask the validate endpoint whether
    /// the session is still good.
    async fn recheck(
        &self,
        request: &ApiRequest,
        epoch: u64,
        original: HttpResponse,
    ) -> Result<HttpResponse, ApiError> {
        let recheck = ApiRequest::get(self.inner.endpoints.validate.clone());
        recheck.marker().mark();
        let session = self.state().current();
        let http = self.prepare(&recheck, &session, false);

        match self.inner.transport.execute(http).await {
            Ok(r) if r.is_success() => {
                tracing::info!(path = %request.path(), "session valid, permission denied");
                Err(ApiError::PermissionDenied(original))
            }
            Ok(r) if r.status == 401 || r.status == 403 => {
                self.expire(epoch, original.status).await
            }
            Ok(r) => {
                tracing::warn!(
                    path = %request.path(),
                    recheck_status = r.status,
                    "session recheck inconclusive, treating as permission denied"
                );
                Err(ApiError::PermissionDenied(original))
            }
            Err(e) => {
                tracing::warn!(
                    path = %request.path(),
                    error = %e,
                    "session recheck got no response, treating as permission denied"
                );
                Err(ApiError::PermissionDenied(original))
            }
        }
    }

    /// Fires the logout bundle for `epoch` and returns `AuthExpired`.
    pub(crate) async fn expire(&self, epoch: u64, status: u16) -> Result<HttpResponse, ApiError> {
        tracing::info!(epoch, status, "server rejected the session");
        self.inner.bundle.fire(epoch).await;
        Err(ApiError::AuthExpired { status })
    }
}

/// Hands a response back without classifying it.
fn raw(result: Result<HttpResponse, TransportError>) -> Result<HttpResponse, ApiError> {
    match result {
        Ok(response) if response.is_success() => Ok(response),
        Ok(response) => Err(ApiError::Status(response)),
        Err(e) => Err(ApiError::Transport(e)),
    }
}
