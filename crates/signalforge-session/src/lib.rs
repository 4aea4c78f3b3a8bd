//! Connection state machines for the Signalforge client.
//!
//! This crate holds the pieces of a signaling connection that are pure
//! state, with no I/O of their own:
//!
//! 1. **Connection state**: where the connection is in its life
//!    ([`ConnectionState`])
//! 2. **Pending handshake**: the one-shot result of a join or reconnect
//!    ([`PendingHandshake`], [`HandshakeFuture`])
//! 3. **Request dispatch**: send now or queue until the gate opens
//!    ([`RequestDispatcher`])
//! 4. **Response gate**: hold inbound responses until the consumer is
//!    ready ([`ResponseGate`])
//!
//! # Concurrency note
//!
//! None of these types are thread-safe by themselves. They are owned by a
//! single task (the client's connection task) and mutated only from there.
//!
//! # How it fits in the stack
//!
//! ```text
//! Client (above)  ← drives these machines from transport events and calls
//!     ↕
//! Session (this crate)  ← ordering, gating, single resolution
//!     ↕
//! Protocol (below)  ← SignalResponse
//! ```

mod dispatcher;
mod error;
mod gate;
mod handshake;
mod state;

pub use dispatcher::{Dispatch, OutboundQueue, QueuedRequest, RequestDispatcher};
pub use error::SessionError;
pub use gate::{InboundBuffer, ResponseGate};
pub use handshake::{HandshakeFuture, HandshakeKind, PendingHandshake};
pub use state::ConnectionState;
