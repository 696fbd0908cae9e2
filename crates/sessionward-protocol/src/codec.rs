//! Codec trait and implementations for serializing/deserializing bodies.
//!
//! The client doesn't care HOW bodies are serialized, only that something
//! implements [`Codec`]. The auth service speaks JSON, so [`JsonCodec`] is
//! the one in use.

use serde::{Serialize, de::DeserializeOwned};

use crate::ProtocolError;

/// Encodes Rust types to bytes and decodes bytes back.
///
/// ## Trait bounds
///
/// - `Send + Sync`: the API client is cloned into the validation loop and
///   into every caller's task, and Tokio may poll any of them on any
///   worker thread.
/// - `'static`: the codec owns everything it needs, so it can sit inside
///   the long-lived client without borrowing.
///
/// `decode` asks for `DeserializeOwned` rather than `Deserialize<'de>`:
/// the decoded value owns its strings, so the response buffer can be
/// dropped straight after.
pub trait Codec: Send + Sync + 'static {
    /// MIME type sent as `Content-Type` for encoded bodies.
    fn content_type(&self) -> &'static str;

    /// Serializes a value into bytes.
    ///
    /// # Errors
    /// Returns `ProtocolError::Encode` if serialization fails.
    fn encode<T: Serialize>(
        &self,
        value: &T,
    ) -> Result<Vec<u8>, ProtocolError>;

    /// Deserializes bytes back into a value.
    ///
    /// # Errors
    /// Returns `ProtocolError::Decode` if the bytes are malformed or
    /// don't match the expected type.
    fn decode<T: DeserializeOwned>(
        &self,
        data: &[u8],
    ) -> Result<T, ProtocolError>;
}

/// A [`Codec`] that uses JSON (via `serde_json`).
///
/// ## Example
///
/// ```rust
/// use sessionward_protocol::{Codec, JsonCodec, LoginRequest};
///
/// let codec = JsonCodec;
/// let req = LoginRequest::new("a@b.vn", "secret");
///
/// let bytes = codec.encode(&req).unwrap();
/// let decoded: LoginRequest = codec.decode(&bytes).unwrap();
/// assert_eq!(req, decoded);
/// ```
#[cfg(feature = "json")]
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

#[cfg(feature = "json")]
impl Codec for JsonCodec {
    fn content_type(&self) -> &'static str {
        "application/json"
    }

    fn encode<T: Serialize>(
        &self,
        value: &T,
    ) -> Result<Vec<u8>, ProtocolError> {
        // Straight into a `Vec<u8>`; the transport sends bytes anyway.
        serde_json::to_vec(value).map_err(ProtocolError::Encode)
    }

    fn decode<T: DeserializeOwned>(
        &self,
        data: &[u8],
    ) -> Result<T, ProtocolError> {
        // `from_slice` parses the borrowed bytes in place, no copy into a
        // `String` first. Non-UTF-8 input is a decode error like any other.
        serde_json::from_slice(data).map_err(ProtocolError::Decode)
    }
}
