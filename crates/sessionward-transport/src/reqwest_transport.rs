//! HTTP transport implementation using `reqwest`.

use std::time::Duration;

use reqwest::Client;

use crate::{HttpRequest, HttpResponse, HttpTransport, Method, TransportError};

/// A `reqwest`-backed [`HttpTransport`] bound to one API base URL.
///
/// Cheap to clone: `reqwest::Client` is an `Arc` around its pool.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    http: Client,
    base_url: String,
}

impl ReqwestTransport {
    /// Request timeout used when the caller has no opinion.
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

    /// Builds a transport that prefixes every request path with `base_url`.
    ///
    /// # Errors
    /// Returns [`TransportError::Request`] if the TLS backend or client
    /// configuration cannot be initialized.
    pub fn new(
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, TransportError> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TransportError::Request(e.to_string()))?;
        let base_url = base_url.into().trim_end_matches('/').to_string();
        tracing::debug!(%base_url, ?timeout, "reqwest transport configured");
        Ok(Self { http, base_url })
    }

    /// The base URL without a trailing slash.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url_for(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{path}", self.base_url)
        } else {
            format!("{}/{path}", self.base_url)
        }
    }
}

impl HttpTransport for ReqwestTransport {
    async fn execute(
        &self,
        request: HttpRequest,
    ) -> Result<HttpResponse, TransportError> {
        let url = self.url_for(&request.path);
        let mut builder = self.http.request(to_reqwest(request.method), url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let res = builder.send().await.map_err(map_send_error)?;
        let status = res.status().as_u16();

        // The body is read in full so 403/5xx payloads survive for callers
        // that surface the server's message.
        let body = res.bytes().await.map_err(|e| {
            if e.is_timeout() {
                TransportError::Timeout
            } else {
                TransportError::Body(e.to_string())
            }
        })?;

        Ok(HttpResponse {
            status,
            body: body.to_vec(),
        })
    }
}

fn to_reqwest(method: Method) -> reqwest::Method {
    match method {
        Method::Get => reqwest::Method::GET,
        Method::Post => reqwest::Method::POST,
        Method::Put => reqwest::Method::PUT,
        Method::Patch => reqwest::Method::PATCH,
        Method::Delete => reqwest::Method::DELETE,
    }
}

fn map_send_error(err: reqwest::Error) -> TransportError {
    // Order matters: a connect timeout reports both `is_timeout` and
    // `is_connect`, and should surface as a timeout.
    if err.is_timeout() {
        TransportError::Timeout
    } else if err.is_connect() {
        TransportError::Connect(err.to_string())
    } else if err.is_builder() {
        TransportError::InvalidUrl(err.to_string())
    } else {
        TransportError::Request(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_for_joins_with_single_slash() {
        let t = ReqwestTransport::new("http://api.local/", Duration::from_secs(1))
            .expect("client should build");

        assert_eq!(t.base_url(), "http://api.local");
        assert_eq!(t.url_for("/api/auth/validate"), "http://api.local/api/auth/validate");
        assert_eq!(t.url_for("api/listings"), "http://api.local/api/listings");
    }

    #[test]
    fn test_to_reqwest_maps_every_method() {
        assert_eq!(to_reqwest(Method::Get), reqwest::Method::GET);
        assert_eq!(to_reqwest(Method::Post), reqwest::Method::POST);
        assert_eq!(to_reqwest(Method::Put), reqwest::Method::PUT);
        assert_eq!(to_reqwest(Method::Patch), reqwest::Method::PATCH);
        assert_eq!(to_reqwest(Method::Delete), reqwest::Method::DELETE);
    }
}
