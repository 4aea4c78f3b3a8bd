//! Connection state: where one logical signaling connection is in its life.

use std::fmt;

/// The current state of the signaling connection.
///
/// ```text
///   Disconnected ──(join)──────→ Connecting ───(join response)──────→ Connected
///        ↑   └───(reconnect)───→ Reconnecting ─(reconnect response)─↗     │
///        │                                                                │
///        └──────────────(close / transport closed / failed / ping timeout)┘
/// ```
///
/// Any state can fall back to `Disconnected`; a new handshake can start from
/// any state and replaces the previous transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    /// No transport, or the last one is gone.
    #[default]
    Disconnected,
    /// A join handshake is in flight.
    Connecting,
    /// A handshake completed; the transport carries signal traffic.
    Connected,
    /// A reconnect handshake is in flight.
    Reconnecting,
}

impl ConnectionState {
    /// Whether a handshake has completed on the current transport.
    pub fn is_connected(self) -> bool {
        matches!(self, Self::Connected)
    }

    /// Whether a join or reconnect handshake is in flight.
    pub fn is_handshaking(self) -> bool {
        matches!(self, Self::Connecting | Self::Reconnecting)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Reconnecting => "reconnecting",
        };
        f.write_str(s)
    }
}
