//! Codec trait and implementations for serializing/deserializing messages.
//!
//! A "codec" (coder/decoder) converts between Rust types and raw frames.
//! The signaling client doesn't care HOW requests and responses are
//! serialized; it only needs something that implements [`Codec`].
//!
//! Currently we provide [`JsonCodec`]. A binary codec can be added later
//! without touching the client.

use serde::{de::DeserializeOwned, Serialize};

use crate::ProtocolError;

/// A codec that can encode Rust types to bytes and decode bytes back.
///
/// ## Trait bounds
///
/// - `Send + Sync` → the codec is shared between the client handle (which
///   encodes requests) and the connection task (which decodes responses).
/// - `Clone` → each side keeps its own copy.
/// - `'static` → it owns everything it needs.
pub trait Codec: Clone + Send + Sync + 'static {
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
    /// Returns `ProtocolError::Decode` if the bytes are malformed,
    /// incomplete, or don't match the expected type.
    fn decode<T: DeserializeOwned>(
        &self,
        data: &[u8],
    ) -> Result<T, ProtocolError>;
}

// ---------------------------------------------------------------------------
// JsonCodec
// ---------------------------------------------------------------------------

/// A [`Codec`] that uses JSON (via `serde_json`).
///
/// ## Example
///
/// ```rust
/// use signalforge_protocol::{Codec, JsonCodec, SignalRequest, MuteTrackRequest, TrackSid};
///
/// let codec = JsonCodec;
///
/// let request = SignalRequest::Mute(MuteTrackRequest {
///     sid: TrackSid::from("TR_audio"),
///     muted: true,
/// });
///
/// let bytes = codec.encode(&request).unwrap();
/// let decoded: SignalRequest = codec.decode(&bytes).unwrap();
/// assert_eq!(request, decoded);
/// ```
#[cfg(feature = "json")]
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

#[cfg(feature = "json")]
impl Codec for JsonCodec {
    fn encode<T: Serialize>(
        &self,
        value: &T,
    ) -> Result<Vec<u8>, ProtocolError> {
        serde_json::to_vec(value).map_err(ProtocolError::Encode)
    }

    fn decode<T: DeserializeOwned>(
        &self,
        data: &[u8],
    ) -> Result<T, ProtocolError> {
        serde_json::from_slice(data).map_err(ProtocolError::Decode)
    }
}

#[cfg(all(test, feature = "json"))]
mod tests {
    use super::*;
    use crate::{Pong, SignalResponse};

    #[test]
    fn test_decode_response_frame() {
        let frame = br#"{"pong":{"last_ping_timestamp":10,"timestamp":12}}"#;
        let decoded: SignalResponse = JsonCodec.decode(frame).unwrap();
        assert_eq!(
            decoded,
            SignalResponse::Pong(Pong {
                last_ping_timestamp: 10,
                timestamp: 12,
            })
        );
    }

    #[test]
    fn test_decode_garbage_is_decode_error() {
        let result: Result<SignalResponse, _> = JsonCodec.decode(b"\x00\x01");
        assert!(matches!(result, Err(ProtocolError::Decode(_))));
    }

    #[test]
    fn test_encode_non_string_map_key_is_encode_error() {
        // JSON objects need string keys.
        let mut map = std::collections::BTreeMap::new();
        map.insert(vec![1u8], 2u8);
        let result = JsonCodec.encode(&map);
        assert!(matches!(result, Err(ProtocolError::Encode(_))));
    }
}
