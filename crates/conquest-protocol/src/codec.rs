//! Codec trait and the JSON implementation.
//!
//! The server never calls `serde_json` directly: the connection handler
//! holds a [`Codec`] and asks it to turn frames into [`ClientFrame`]s and
//! [`ServerMessage`]s into frames. Browsers speak JSON, so [`JsonCodec`]
//! is the only implementation today.
//!
//! [`ClientFrame`]: crate::ClientFrame
//! [`ServerMessage`]: crate::ServerMessage

use serde::{Serialize, de::DeserializeOwned};

use crate::ProtocolError;

/// Converts wire values to and from bytes.
///
/// `Send + Sync + 'static` because one codec instance is shared by every
/// connection task for the lifetime of the server.
pub trait Codec: Send + Sync + 'static {
    /// Serializes a value into a frame.
    ///
    /// # Errors
    /// Returns `ProtocolError::Encode` if the value cannot be represented.
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError>;

    /// Parses a frame into a value.
    ///
    /// # Errors
    /// Returns `ProtocolError::Decode` if the bytes are malformed or do not
    /// match `T`.
    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError>;
}

/// A [`Codec`] backed by `serde_json`.
///
/// ```rust
/// use conquest_protocol::{ClientFrame, Codec, Command, JsonCodec};
///
/// let codec = JsonCodec;
/// let frame: ClientFrame = codec
///     .decode(br#"{"id":3,"command":{"type":"room:create","name":"Friday quiz"}}"#)
///     .unwrap();
/// assert_eq!(frame.id, 3);
/// assert!(matches!(frame.command, Command::CreateRoom { .. }));
/// ```
#[cfg(feature = "json")]
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

#[cfg(feature = "json")]
impl Codec for JsonCodec {
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError> {
        serde_json::to_vec(value).map_err(ProtocolError::Encode)
    }

    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError> {
        serde_json::from_slice(data).map_err(ProtocolError::Decode)
    }
}

#[cfg(all(test, feature = "json"))]
mod tests {
    use super::*;
    use crate::{PlayerId, ServerMessage};

    #[test]
    fn test_encode_produces_utf8_json() {
        let bytes = JsonCodec
            .encode(&ServerMessage::Welcome {
                player_id: PlayerId(9),
                server_time: 1,
            })
            .unwrap();
        let text = std::str::from_utf8(&bytes).expect("json is utf-8");
        assert!(text.contains(r#""type":"welcome""#));
    }

    #[test]
    fn test_decode_garbage_is_decode_error() {
        let result: Result<crate::ClientFrame, _> = JsonCodec.decode(b"not json");
        assert!(matches!(result, Err(ProtocolError::Decode(_))));
    }
}
