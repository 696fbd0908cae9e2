/// Errors that can occur in the transport layer.
///
/// Every variant means "no usable HTTP response was received". A response
/// with a failing status code is NOT a transport error; it comes back as an
/// [`HttpResponse`](crate::HttpResponse) and is classified higher up.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// The request did not complete within the configured timeout.
    #[error("request timed out")]
    Timeout,

    /// The remote host could not be reached (DNS, refused, reset).
    #[error("connection failed: {0}")]
    Connect(String),

    /// The request could not be built or sent.
    #[error("request failed: {0}")]
    Request(String),

    /// The response head arrived but reading the body failed.
    #[error("reading response body failed: {0}")]
    Body(String),

    /// The base URL or path did not form a valid URL.
    #[error("invalid url: {0}")]
    InvalidUrl(String),
}
