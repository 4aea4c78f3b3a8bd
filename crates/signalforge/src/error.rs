//! Unified error type for the Signalforge client.

use std::time::Duration;

use signalforge_protocol::ProtocolError;
use signalforge_session::{HandshakeKind, SessionError};
use signalforge_transport::TransportError;

/// Top-level error that wraps all crate-specific errors.
///
/// When using the `signalforge` meta-crate, you deal with this single
/// error type instead of importing errors from each sub-crate.
/// The `#[from]` attribute on each variant auto-generates `From` impls,
/// so the `?` operator converts sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum SignalError {
    /// A transport-level error (connect, send, receive).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A protocol-level error (encode, decode, connect URL).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A session-level error (handshake slot misuse or abandonment).
    #[error(transparent)]
    Session(#[from] SessionError),

    /// `join` or `reconnect` was called while another handshake was still
    /// waiting for its response.
    #[error("a {0} handshake is already in progress")]
    HandshakeInProgress(HandshakeKind),

    /// The server did not answer the handshake in time.
    #[error("no {kind} response within {after:?}")]
    HandshakeTimeout { kind: HandshakeKind, after: Duration },

    /// The server closed the connection before the handshake completed.
    #[error("connection closed ({code}): {reason}")]
    ConnectionClosed { code: u16, reason: String },

    /// `close()` was called while the handshake was pending.
    #[error("client closed")]
    Closed,

    /// The command channel to the connection task is full. Nothing was
    /// queued; retry once the task has caught up.
    #[error("signal client is busy, command buffer full")]
    Busy,

    /// The connection task is no longer running.
    #[error("signal client stopped")]
    ClientStopped,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_transport_error() {
        let err = TransportError::ConnectionClosed("gone".into());
        let signal_err: SignalError = err.into();
        assert!(matches!(signal_err, SignalError::Transport(_)));
        assert!(signal_err.to_string().contains("gone"));
    }

    #[test]
    fn test_from_protocol_error() {
        let err = ProtocolError::InvalidMessage("bad".into());
        let signal_err: SignalError = err.into();
        assert!(matches!(signal_err, SignalError::Protocol(_)));
    }

    #[test]
    fn test_from_session_error() {
        let err = SessionError::Abandoned(HandshakeKind::Join);
        let signal_err: SignalError = err.into();
        assert!(matches!(signal_err, SignalError::Session(_)));
        assert!(signal_err.to_string().contains("join"));
    }

    #[test]
    fn test_timeout_message_names_kind() {
        let err = SignalError::HandshakeTimeout {
            kind: HandshakeKind::Reconnect,
            after: Duration::from_secs(10),
        };
        assert_eq!(err.to_string(), "no reconnect response within 10s");
    }
}
