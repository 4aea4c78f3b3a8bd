//! Error types for the session layer.

use crate::HandshakeKind;

/// Errors raised by the session state machines.
///
/// These are programming or lifecycle errors: a handshake resolved twice, a
/// handshake abandoned before it produced a result.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The handshake already produced its single result.
    #[error("{0} handshake was already resolved")]
    AlreadyResolved(HandshakeKind),

    /// The handshake slot was dropped without a result, e.g. because the
    /// connection task stopped.
    #[error("{0} handshake was abandoned before it completed")]
    Abandoned(HandshakeKind),

    /// The caller stopped waiting for the handshake result.
    #[error("nobody is waiting for the {0} handshake any more")]
    CallerGone(HandshakeKind),
}
