//! Codec trait and implementations for serializing/deserializing messages.
//!
//! The gateway doesn't care how messages are serialized; it only needs
//! something that implements [`Codec`]. Frames are text, so encoding
//! produces a `String`.

use serde::{Serialize, de::DeserializeOwned};

use crate::ProtocolError;

/// Converts between Rust values and text frames.
pub trait Codec: Send + Sync + 'static {
    /// Serializes a value into a text frame.
    ///
    /// # Errors
    /// Returns `ProtocolError::Encode` if serialization fails.
    fn encode<T: Serialize>(&self, value: &T) -> Result<String, ProtocolError>;

    /// Deserializes a received frame.
    ///
    /// # Errors
    /// Returns `ProtocolError::Decode` if the bytes are malformed or don't
    /// match the expected type.
    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError>;
}

// ---------------------------------------------------------------------------
// JsonCodec
// ---------------------------------------------------------------------------

/// A [`Codec`] that uses JSON (via `serde_json`).
///
/// ## Example
///
/// ```rust
/// use bingo_protocol::{ClientMessage, Codec, JsonCodec, ServerEvent};
///
/// let codec = JsonCodec;
///
/// let text = codec.encode(&ServerEvent::Pong).unwrap();
/// assert_eq!(text, r#"{"event":"pong"}"#);
///
/// let msg: ClientMessage = codec.decode(br#"{"event":"ping"}"#).unwrap();
/// assert_eq!(msg, ClientMessage::Ping);
/// ```
#[cfg(feature = "json")]
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

#[cfg(feature = "json")]
impl Codec for JsonCodec {
    fn encode<T: Serialize>(&self, value: &T) -> Result<String, ProtocolError> {
        serde_json::to_string(value).map_err(ProtocolError::Encode)
    }

    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError> {
        serde_json::from_slice(data).map_err(ProtocolError::Decode)
    }
}

#[cfg(all(test, feature = "json"))]
mod tests {
    use super::*;
    use crate::{ClientMessage, GameCode, ServerEvent};

    #[test]
    fn test_json_codec_encode_error_event() {
        let text = JsonCodec
            .encode(&ServerEvent::Error {
                message: "Game not found".into(),
            })
            .unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["event"], "error");
        assert_eq!(value["data"]["message"], "Game not found");
    }

    #[test]
    fn test_json_codec_decode_client_message() {
        let msg: ClientMessage = JsonCodec
            .decode(br#"{"event":"start-game","data":{"gameId":"abcd1234"}}"#)
            .unwrap();
        assert_eq!(
            msg,
            ClientMessage::StartGame {
                game_id: GameCode::new("ABCD1234")
            }
        );
    }

    #[test]
    fn test_json_codec_decode_garbage_returns_error() {
        let result: Result<ClientMessage, _> = JsonCodec.decode(b"not json at all");
        assert!(matches!(result, Err(ProtocolError::Decode(_))));
    }
}
