//! Error types for the protocol layer.
//!
//! Each crate in Signalforge defines its own error enum. When you see a
//! `ProtocolError`, you know the problem is in turning messages into bytes
//! (or back), or in building a connect URL, not in networking.

/// Errors that can occur in the protocol layer.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed (turning a request into bytes).
    ///
    /// The inner `serde_json::Error` is kept so callers can see exactly
    /// which field could not be represented.
    #[cfg(feature = "json")]
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserialization failed (turning bytes into a response).
    ///
    /// Common causes: malformed JSON, a response kind this client does not
    /// know, or a truncated frame.
    #[cfg(feature = "json")]
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// The message is invalid at the protocol level.
    ///
    /// For logical errors that pass deserialization but violate protocol
    /// rules, such as a frame that carries no message at all.
    #[error("invalid message: {0}")]
    InvalidMessage(String),

    /// The server URL could not be turned into a signal connect URL.
    #[error("invalid server url {url:?}: {reason}")]
    InvalidUrl { url: String, reason: String },
}
