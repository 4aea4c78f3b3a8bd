//! Transport abstraction layer for Signalforge.
//!
//! Provides the [`Connector`] and [`Connection`] traits that abstract over
//! the byte-stream connection to the signaling server. Connections are
//! callback-driven: progress (opened, message, closed, failed) is reported
//! as [`TransportEvent`]s through an [`EventSink`], tagged with the
//! [`ConnectionId`] of the connection that produced them.
//!
//! # Feature Flags
//!
//! - `websocket` (default): WebSocket client connector via `tokio-tungstenite`

mod error;
#[cfg(feature = "websocket")]
mod websocket;

pub use error::TransportError;
#[cfg(feature = "websocket")]
pub use websocket::{WebSocketConnection, WebSocketConnector};

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::mpsc;

/// Counter for generating unique connection IDs.
static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

/// Close code for a normal, intentional closure.
pub const CLOSE_NORMAL: u16 = 1000;

/// Close code reported when the stream ended without a close frame.
pub const CLOSE_ABNORMAL: u16 = 1006;

/// Opaque identifier for a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Creates a new `ConnectionId` from a raw `u64`.
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Allocates the next process-unique `ConnectionId`.
    pub fn next() -> Self {
        Self(NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Returns the underlying `u64` value.
    pub fn into_inner(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Status line and headers of the HTTP exchange that opened (or failed to
/// open) a connection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HttpMetadata {
    /// HTTP status code of the upgrade response.
    pub status: u16,
    /// Response headers, in the order the server sent them.
    pub headers: Vec<(String, String)>,
}

impl HttpMetadata {
    /// Returns the first header value with the given (case-insensitive) name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Something that happened on a connection.
///
/// A connection emits at most one `Opened`, any number of `Message`s, and
/// then `Closed` and/or `Failed`. Consumers must tolerate `Failed` without a
/// following `Closed` as well as both arriving for the same connection.
#[derive(Debug)]
pub enum TransportEvent {
    /// The connection is open and can carry messages.
    Opened(HttpMetadata),
    /// A complete message arrived from the server.
    Message(Vec<u8>),
    /// The connection was closed, by either side.
    Closed { code: u16, reason: String },
    /// The connection failed.
    Failed {
        cause: TransportError,
        response: Option<HttpMetadata>,
    },
}

impl TransportEvent {
    /// Whether no further events are expected after this one.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Closed { .. } | Self::Failed { .. })
    }
}

/// Receiving half of the event channel shared by every connection a client
/// opens.
pub type EventStream = mpsc::UnboundedReceiver<(ConnectionId, TransportEvent)>;

/// Sending half of the event channel, bound to one connection.
///
/// Cloning is cheap. Events sent through one sink arrive in order.
#[derive(Debug, Clone)]
pub struct EventSink {
    id: ConnectionId,
    tx: mpsc::UnboundedSender<(ConnectionId, TransportEvent)>,
}

impl EventSink {
    /// The connection this sink reports for.
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Delivers an event. Returns `false` if the receiver is gone.
    pub fn emit(&self, event: TransportEvent) -> bool {
        self.tx.send((self.id, event)).is_ok()
    }
}

/// Creates the channel transport events are delivered on.
///
/// Returns a factory for per-connection sinks and the shared stream.
pub fn event_channel() -> (EventSinkFactory, EventStream) {
    let (tx, rx) = mpsc::unbounded_channel();
    (EventSinkFactory { tx }, rx)
}

/// Hands out [`EventSink`]s that all feed the same [`EventStream`].
#[derive(Debug, Clone)]
pub struct EventSinkFactory {
    tx: mpsc::UnboundedSender<(ConnectionId, TransportEvent)>,
}

impl EventSinkFactory {
    /// Creates a sink for a freshly allocated connection.
    pub fn sink(&self) -> EventSink {
        self.sink_for(ConnectionId::next())
    }

    /// Creates a sink for a specific connection.
    pub fn sink_for(&self, id: ConnectionId) -> EventSink {
        EventSink {
            id,
            tx: self.tx.clone(),
        }
    }
}

/// Opens outbound connections to a signaling server.
pub trait Connector: Send + Sync + 'static {
    /// The connection type produced by this connector.
    type Connection: Connection;

    /// Starts opening a connection to `url`.
    ///
    /// Returns immediately; the outcome is reported through `events`. The
    /// returned connection must use `events.id()` as its id.
    fn open(&self, url: &str, events: EventSink) -> Self::Connection;
}

/// A single connection that can send bytes and be closed.
pub trait Connection: Send + 'static {
    /// Queues data for delivery to the remote peer. Never blocks.
    fn send(&self, data: Vec<u8>) -> Result<(), TransportError>;

    /// Starts a graceful close with the given code and reason.
    fn close(&self, code: u16, reason: &str);

    /// Returns the unique identifier for this connection.
    fn id(&self) -> ConnectionId;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_id_new_and_into_inner() {
        let id = ConnectionId::new(42);
        assert_eq!(id.into_inner(), 42);
    }

    #[test]
    fn test_connection_id_display() {
        let id = ConnectionId::new(7);
        assert_eq!(id.to_string(), "conn-7");
    }

    #[test]
    fn test_connection_id_next_is_unique() {
        let a = ConnectionId::next();
        let b = ConnectionId::next();
        assert_ne!(a, b);
        assert!(b.into_inner() > a.into_inner());
    }

    #[test]
    fn test_sink_tags_events_with_its_connection() {
        let (factory, mut stream) = event_channel();
        let first = factory.sink_for(ConnectionId::new(1));
        let second = factory.sink_for(ConnectionId::new(2));

        assert!(first.emit(TransportEvent::Message(b"a".to_vec())));
        assert!(second.emit(TransportEvent::Message(b"b".to_vec())));

        let (id, event) = stream.try_recv().unwrap();
        assert_eq!(id, ConnectionId::new(1));
        assert!(matches!(event, TransportEvent::Message(ref d) if d == b"a"));
        let (id, _) = stream.try_recv().unwrap();
        assert_eq!(id, ConnectionId::new(2));
    }

    #[test]
    fn test_emit_reports_dropped_receiver() {
        let (factory, stream) = event_channel();
        let sink = factory.sink();
        drop(stream);
        assert!(!sink.emit(TransportEvent::Message(vec![])));
    }

    #[test]
    fn test_terminal_events() {
        assert!(TransportEvent::Closed { code: 1000, reason: String::new() }.is_terminal());
        assert!(
            TransportEvent::Failed {
                cause: TransportError::ConnectionClosed("x".into()),
                response: None,
            }
            .is_terminal()
        );
        assert!(!TransportEvent::Opened(HttpMetadata::default()).is_terminal());
        assert!(!TransportEvent::Message(vec![1]).is_terminal());
    }

    #[test]
    fn test_header_lookup_is_case_insensitive() {
        let meta = HttpMetadata {
            status: 101,
            headers: vec![("Sec-WebSocket-Protocol".into(), "signal".into())],
        };
        assert_eq!(meta.header("sec-websocket-protocol"), Some("signal"));
        assert_eq!(meta.header("missing"), None);
    }
}
