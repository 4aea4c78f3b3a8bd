//! Signal message types: everything that travels on the signaling socket.
//!
//! Every frame carries exactly one [`SignalRequest`] (client → server) or
//! one [`SignalResponse`] (server → client). Both are Rust enums, so "exactly
//! one field populated" is guaranteed by construction.
//!
//! The enums are externally tagged with snake_case names, so a pong looks
//! like `{ "pong": { "last_ping_timestamp": 1, "timestamp": 2 } }`.

use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// Server-assigned identifier of a participant (`PA_…`).
///
/// Newtype wrapper so a track sid can never be passed where a participant
/// sid is expected. `#[serde(transparent)]` keeps it a plain string on the
/// wire.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParticipantSid(pub String);

impl fmt::Display for ParticipantSid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ParticipantSid {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// Server-assigned identifier of a published track (`TR_…`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TrackSid(pub String);

impl fmt::Display for TrackSid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TrackSid {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

// ---------------------------------------------------------------------------
// Shared payloads
// ---------------------------------------------------------------------------

/// An SDP offer or answer. Opaque to the signaling client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionDescription {
    /// `"offer"` or `"answer"`.
    #[serde(rename = "type")]
    pub sdp_type: String,
    pub sdp: String,
}

/// Which of the two peer connections a message concerns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalTarget {
    #[default]
    Publisher,
    Subscriber,
}

/// An ICE candidate, in either direction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrickleRequest {
    /// JSON-encoded `RTCIceCandidateInit`.
    pub candidate_init: String,
    #[serde(default)]
    pub target: SignalTarget,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackKind {
    Audio,
    Video,
    Data,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackInfo {
    pub sid: TrackSid,
    #[serde(default)]
    pub name: String,
    pub kind: TrackKind,
    #[serde(default)]
    pub muted: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ParticipantInfo {
    pub sid: ParticipantSid,
    pub identity: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub metadata: String,
    #[serde(default)]
    pub tracks: Vec<TrackInfo>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Room {
    pub sid: String,
    pub name: String,
    #[serde(default)]
    pub metadata: String,
    #[serde(default)]
    pub num_participants: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct IceServer {
    pub urls: Vec<String>,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub credential: String,
}

/// Either direction: a track was muted or unmuted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MuteTrackRequest {
    pub sid: TrackSid,
    pub muted: bool,
}

/// Either direction: the participant is leaving (or being removed).
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LeaveRequest {
    /// Server → client: whether resuming the session is allowed.
    #[serde(default)]
    pub can_reconnect: bool,
    #[serde(default)]
    pub reason: String,
}

// ---------------------------------------------------------------------------
// Responses (server → client)
// ---------------------------------------------------------------------------

/// Answer to a join: the session now exists.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct JoinResponse {
    pub room: Room,
    pub participant: ParticipantInfo,
    #[serde(default)]
    pub other_participants: Vec<ParticipantInfo>,
    #[serde(default)]
    pub server_version: String,
    #[serde(default)]
    pub ice_servers: Vec<IceServer>,
    /// Whether the subscriber peer connection is the primary one.
    #[serde(default)]
    pub subscriber_primary: bool,
    /// Seconds between heartbeat pings. 0 disables the heartbeat.
    #[serde(default)]
    pub ping_interval: u32,
    /// Seconds without a pong before the connection is considered dead.
    #[serde(default)]
    pub ping_timeout: u32,
}

/// Answer to a reconnect: the existing session was resumed.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ReconnectResponse {
    #[serde(default)]
    pub ice_servers: Vec<IceServer>,
    /// 0 means "keep the interval from the join".
    #[serde(default)]
    pub ping_interval: u32,
    /// 0 means "keep the timeout from the join".
    #[serde(default)]
    pub ping_timeout: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ParticipantUpdate {
    pub participants: Vec<ParticipantInfo>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RoomUpdate {
    pub room: Room,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeakerInfo {
    pub sid: ParticipantSid,
    /// Audio level, 0.0 (silent) to 1.0 (loudest).
    pub level: f32,
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SpeakersChanged {
    pub speakers: Vec<SpeakerInfo>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionQuality {
    Poor,
    Good,
    Excellent,
    Lost,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionQualityInfo {
    pub participant_sid: ParticipantSid,
    pub quality: ConnectionQuality,
    #[serde(default)]
    pub score: f32,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ConnectionQualityUpdate {
    pub updates: Vec<ConnectionQualityInfo>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamState {
    Active,
    Paused,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamStateInfo {
    pub participant_sid: ParticipantSid,
    pub track_sid: TrackSid,
    pub state: StreamState,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StreamStateUpdate {
    pub stream_states: Vec<StreamStateInfo>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionPermissionUpdate {
    pub participant_sid: ParticipantSid,
    pub track_sid: TrackSid,
    pub allowed: bool,
}

/// The server accepted a track announced with [`AddTrackRequest`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackPublishedResponse {
    /// Client-chosen id from the add-track request.
    pub cid: String,
    pub track: TrackInfo,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackUnpublishedResponse {
    pub track_sid: TrackSid,
}

/// Heartbeat answer. Echoes the timestamp of the ping it answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Pong {
    /// Timestamp (unix millis) carried by the ping being answered.
    pub last_ping_timestamp: i64,
    /// Server time (unix millis) when the pong was sent.
    pub timestamp: i64,
}

/// Everything the server can send.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalResponse {
    Join(JoinResponse),
    Reconnect(ReconnectResponse),
    Offer(SessionDescription),
    Answer(SessionDescription),
    Trickle(TrickleRequest),
    Update(ParticipantUpdate),
    RoomUpdate(RoomUpdate),
    SpeakersChanged(SpeakersChanged),
    ConnectionQuality(ConnectionQualityUpdate),
    StreamStateUpdate(StreamStateUpdate),
    SubscriptionPermissionUpdate(SubscriptionPermissionUpdate),
    RefreshToken(String),
    Mute(MuteTrackRequest),
    TrackPublished(TrackPublishedResponse),
    TrackUnpublished(TrackUnpublishedResponse),
    Leave(LeaveRequest),
    Pong(Pong),
}

impl SignalResponse {
    /// Short name of the populated variant, for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Join(_) => "join",
            Self::Reconnect(_) => "reconnect",
            Self::Offer(_) => "offer",
            Self::Answer(_) => "answer",
            Self::Trickle(_) => "trickle",
            Self::Update(_) => "update",
            Self::RoomUpdate(_) => "room_update",
            Self::SpeakersChanged(_) => "speakers_changed",
            Self::ConnectionQuality(_) => "connection_quality",
            Self::StreamStateUpdate(_) => "stream_state_update",
            Self::SubscriptionPermissionUpdate(_) => "subscription_permission_update",
            Self::RefreshToken(_) => "refresh_token",
            Self::Mute(_) => "mute",
            Self::TrackPublished(_) => "track_published",
            Self::TrackUnpublished(_) => "track_unpublished",
            Self::Leave(_) => "leave",
            Self::Pong(_) => "pong",
        }
    }
}

// ---------------------------------------------------------------------------
// Requests (client → server)
// ---------------------------------------------------------------------------

/// Announces a local track before it is published.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddTrackRequest {
    /// Client-chosen id, echoed in [`TrackPublishedResponse`].
    pub cid: String,
    pub name: String,
    pub kind: TrackKind,
    #[serde(default)]
    pub muted: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateSubscription {
    pub track_sids: Vec<TrackSid>,
    pub subscribe: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateTrackSettings {
    pub track_sids: Vec<TrackSid>,
    #[serde(default)]
    pub disabled: bool,
    #[serde(default)]
    pub width: u32,
    #[serde(default)]
    pub height: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct UpdateParticipantMetadata {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub metadata: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SubscriptionPermission {
    /// When true, every participant may subscribe to every local track.
    pub all_participants: bool,
    #[serde(default)]
    pub allowed_participants: Vec<ParticipantSid>,
}

/// State replay sent after a resume so the server can reconcile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncState {
    pub answer: Option<SessionDescription>,
    pub subscription: UpdateSubscription,
    #[serde(default)]
    pub publish_tracks: Vec<TrackPublishedResponse>,
}

/// Asks the server to simulate a failure, for testing recovery paths.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SimulateScenario {
    SpeakerUpdate(u32),
    NodeFailure,
    Migration,
    ServerLeave,
}

/// Heartbeat ping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PingRequest {
    /// Client time (unix millis); echoed back in [`Pong::last_ping_timestamp`].
    pub timestamp: i64,
    /// Last measured round-trip time in milliseconds, 0 if unknown.
    pub rtt: i64,
}

/// Everything the client can send.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalRequest {
    Offer(SessionDescription),
    Answer(SessionDescription),
    Trickle(TrickleRequest),
    AddTrack(AddTrackRequest),
    Mute(MuteTrackRequest),
    Subscription(UpdateSubscription),
    TrackSetting(UpdateTrackSettings),
    Leave(LeaveRequest),
    UpdateMetadata(UpdateParticipantMetadata),
    SubscriptionPermission(SubscriptionPermission),
    SyncState(SyncState),
    Simulate(SimulateScenario),
    Ping(PingRequest),
}

impl SignalRequest {
    /// Short name of the populated variant, for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Offer(_) => "offer",
            Self::Answer(_) => "answer",
            Self::Trickle(_) => "trickle",
            Self::AddTrack(_) => "add_track",
            Self::Mute(_) => "mute",
            Self::Subscription(_) => "subscription",
            Self::TrackSetting(_) => "track_setting",
            Self::Leave(_) => "leave",
            Self::UpdateMetadata(_) => "update_metadata",
            Self::SubscriptionPermission(_) => "subscription_permission",
            Self::SyncState(_) => "sync_state",
            Self::Simulate(_) => "simulate",
            Self::Ping(_) => "ping",
        }
    }

    /// Whether this request skips the outbound queue once a handshake has
    /// completed.
    ///
    /// Negotiation and liveness traffic has to reach the server while a
    /// resumed session waits for its peer connection, or that peer
    /// connection can never come up.
    pub fn bypasses_queue(&self) -> bool {
        matches!(
            self,
            Self::Offer(_)
                | Self::Answer(_)
                | Self::Trickle(_)
                | Self::SyncState(_)
                | Self::Simulate(_)
                | Self::Ping(_)
        )
    }
}

// =========================================================================
// Tests
// =========================================================================
