//! The pending handshake: a one-shot result slot for join and reconnect.
//!
//! The connection task owns the [`PendingHandshake`]; the caller of `join`
//! or `reconnect` holds the matching [`HandshakeFuture`]. The slot resolves
//! exactly once. Dropping it unresolved wakes the caller with
//! [`SessionError::Abandoned`], so a caller can never wait forever.

use std::fmt;

use tokio::sync::oneshot;

use crate::SessionError;

/// Which handshake is pending.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakeKind {
    Join,
    Reconnect,
}

impl fmt::Display for HandshakeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Join => f.write_str("join"),
            Self::Reconnect => f.write_str("reconnect"),
        }
    }
}

/// Resolving side of a handshake.
pub struct PendingHandshake<T, E> {
    kind: HandshakeKind,
    tx: Option<oneshot::Sender<Result<T, E>>>,
}

impl<T, E> PendingHandshake<T, E> {
    /// Creates a slot and the future its caller awaits.
    pub fn new(kind: HandshakeKind) -> (Self, HandshakeFuture<T, E>) {
        let (tx, rx) = oneshot::channel();
        (
            Self { kind, tx: Some(tx) },
            HandshakeFuture { kind, rx },
        )
    }

    pub fn kind(&self) -> HandshakeKind {
        self.kind
    }

    /// Whether the single result has already been delivered.
    pub fn is_resolved(&self) -> bool {
        self.tx.is_none()
    }

    /// Completes the handshake successfully.
    ///
    /// # Errors
    /// - [`SessionError::AlreadyResolved`] on a second resolution attempt;
    ///   the value is discarded and the first result stands.
    /// - [`SessionError::CallerGone`] if the caller stopped waiting. The slot
    ///   still counts as resolved.
    pub fn resolve(&mut self, value: T) -> Result<(), SessionError> {
        self.complete(Ok(value))
    }

    /// Completes the handshake with a failure.
    ///
    /// # Errors
    /// Same as [`resolve`](Self::resolve).
    pub fn fail(&mut self, error: E) -> Result<(), SessionError> {
        self.complete(Err(error))
    }

    fn complete(&mut self, result: Result<T, E>) -> Result<(), SessionError> {
        let tx = self
            .tx
            .take()
            .ok_or(SessionError::AlreadyResolved(self.kind))?;
        tx.send(result).map_err(|_| SessionError::CallerGone(self.kind))
    }
}

impl<T, E> fmt::Debug for PendingHandshake<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingHandshake")
            .field("kind", &self.kind)
            .field("resolved", &self.is_resolved())
            .finish()
    }
}

/// Awaiting side of a handshake.
#[derive(Debug)]
pub struct HandshakeFuture<T, E> {
    kind: HandshakeKind,
    rx: oneshot::Receiver<Result<T, E>>,
}

impl<T, E: From<SessionError>> HandshakeFuture<T, E> {
    pub fn kind(&self) -> HandshakeKind {
        self.kind
    }

    /// Waits for the handshake result.
    ///
    /// A slot dropped without a result yields [`SessionError::Abandoned`]
    /// converted into `E`.
    pub async fn wait(self) -> Result<T, E> {
        match self.rx.await {
            Ok(result) => result,
            Err(_) => Err(SessionError::Abandoned(self.kind).into()),
        }
    }
}
