//! Wire protocol for Signalforge.
//!
//! This crate defines the "language" the signaling client and the
//! session-coordination server speak:
//!
//! - **Types** ([`SignalRequest`], [`SignalResponse`], payload structs):
//!   the messages that travel on the signaling socket.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]): how those messages are
//!   converted to/from bytes.
//! - **Connect URLs** ([`ConnectOptions`], [`ConnectMode`]): where a join
//!   or reconnect handshake connects to.
//! - **Errors** ([`ProtocolError`]).
//!
//! # Architecture
//!
//! ```text
//! Transport (bytes) → Protocol (SignalResponse) → Client (gating, ordering)
//! ```
//!
//! The protocol layer doesn't know about connections or handshakes; it only
//! knows how to serialize and deserialize messages.

mod codec;
mod connect;
mod error;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use connect::{ConnectMode, ConnectOptions, PROTOCOL_VERSION};
pub use error::ProtocolError;
pub use types::{
    AddTrackRequest, ConnectionQuality, ConnectionQualityInfo,
    ConnectionQualityUpdate, IceServer, JoinResponse, LeaveRequest,
    MuteTrackRequest, ParticipantInfo, ParticipantSid, ParticipantUpdate,
    PingRequest, Pong, ReconnectResponse, Room, RoomUpdate,
    SessionDescription, SignalRequest, SignalResponse, SignalTarget,
    SimulateScenario, SpeakerInfo, SpeakersChanged, StreamState,
    StreamStateInfo, StreamStateUpdate, SubscriptionPermission,
    SubscriptionPermissionUpdate, SyncState, TrackInfo, TrackKind,
    TrackPublishedResponse, TrackSid, TrackUnpublishedResponse,
    TrickleRequest, UpdateParticipantMetadata, UpdateSubscription,
    UpdateTrackSettings,
};
