//! Error types for the protocol layer.

/// Errors raised while encoding, decoding, or validating wire messages.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// A value could not be serialized.
    #[cfg(feature = "json")]
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Bytes could not be parsed into the expected message.
    ///
    /// Malformed JSON, a missing field, or an unknown `type` tag.
    #[cfg(feature = "json")]
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// The message parsed but breaks a protocol rule (for example a room
    /// code that is empty or absurdly long).
    #[error("invalid message: {0}")]
    InvalidMessage(String),
}
