//! # Signalforge
//!
//! Signaling client for real-time sessions.
//!
//! Signalforge keeps one persistent connection to a session-coordination
//! server and takes care of the parts that are easy to get wrong:
//!
//! - **Handshakes**: [`SignalClient::join`] and [`SignalClient::reconnect`]
//!   resolve exactly once, with the server's response or with the reason the
//!   connection could not be established.
//! - **Outbound gating**: requests sent before the connection is usable are
//!   queued and flushed in order. After a reconnect they wait for
//!   [`SignalClient::on_peer_connection_established`].
//! - **Inbound gating**: responses are buffered until
//!   [`SignalClient::on_ready_for_responses`], then delivered in arrival
//!   order to a [`SignalListener`].
//! - **Heartbeat**: pings on the interval the server announces and closes
//!   the connection when pongs stop.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use signalforge::prelude::*;
//!
//! # async fn run() -> Result<(), SignalError> {
//! let (listener, mut events) = ChannelListener::new();
//! let client = SignalClient::start(
//!     WebSocketConnector::new(),
//!     JsonCodec,
//!     listener,
//!     ClientConfig::default(),
//! );
//!
//! client.join("wss://sfu.example.com", "access-token").await?;
//! client.on_ready_for_responses().await?;
//! while let Some(event) = events.recv().await {
//!     println!("{event:?}");
//! }
//! # Ok(())
//! # }
//! ```

mod actor;
mod client;
mod config;
mod error;
mod listener;

pub use actor::CLOSE_PING_TIMEOUT;
pub use client::SignalClient;
pub use config::ClientConfig;
pub use error::SignalError;
pub use listener::{ChannelListener, CloseReason, SignalEvent, SignalListener};

pub use signalforge_heartbeat as heartbeat;
pub use signalforge_protocol as protocol;
pub use signalforge_session as session;
pub use signalforge_transport as transport;

/// Everything needed to run a client, in one import.
pub mod prelude {
    pub use crate::{
        CLOSE_PING_TIMEOUT, ChannelListener, ClientConfig, CloseReason,
        SignalClient, SignalError, SignalEvent, SignalListener,
    };
    pub use signalforge_protocol::*;
    pub use signalforge_session::{ConnectionState, HandshakeKind};
    #[cfg(feature = "websocket")]
    pub use signalforge_transport::WebSocketConnector;
    pub use signalforge_transport::{
        CLOSE_NORMAL, Connection, ConnectionId, Connector, EventSink,
        HttpMetadata, TransportError, TransportEvent,
    };
}
