//! Error types for the protocol layer.

/// Errors that can occur while encoding or decoding bodies.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed (turning a Rust type into bytes).
    #[cfg(feature = "json")]
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserialization failed: malformed JSON, missing required fields,
    /// or wrong data types.
    #[cfg(feature = "json")]
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// The body decoded but violates the auth contract, e.g. a login
    /// response with an empty token.
    #[error("invalid message: {0}")]
    InvalidMessage(String),
}
