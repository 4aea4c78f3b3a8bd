//! The consumer side: how decoded responses and close notifications leave
//! the client.

use std::fmt;

use signalforge_protocol::{
    ConnectionQualityUpdate, LeaveRequest, MuteTrackRequest, ParticipantUpdate,
    RoomUpdate, SessionDescription, SignalResponse, SpeakersChanged,
    StreamStateUpdate, SubscriptionPermissionUpdate, TrackPublishedResponse,
    TrackUnpublishedResponse, TrickleRequest,
};
use signalforge_transport::{CLOSE_NORMAL, TransportError};
use tokio::sync::mpsc;

/// Why an established connection ended.
#[derive(Debug)]
pub enum CloseReason {
    /// The server closed the connection.
    ServerClosed { code: u16, reason: String },
    /// The transport failed underneath the connection.
    TransportFailure(TransportError),
    /// No pong arrived within the ping timeout.
    PingTimeout,
}

impl CloseReason {
    /// Whether resuming the session with `reconnect` makes sense.
    ///
    /// Only a normal closure by the server ends the session for good.
    pub fn can_reconnect(&self) -> bool {
        match self {
            Self::ServerClosed { code, .. } => *code != CLOSE_NORMAL,
            Self::TransportFailure(_) | Self::PingTimeout => true,
        }
    }
}

impl fmt::Display for CloseReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ServerClosed { code, reason } => {
                write!(f, "closed by server ({code}): {reason}")
            }
            Self::TransportFailure(e) => write!(f, "transport failure: {e}"),
            Self::PingTimeout => f.write_str("ping timeout"),
        }
    }
}

/// Receives what the server sends once the handshake is done.
///
/// Every method except [`on_close`](Self::on_close) has an empty default, so
/// implementors only override what they care about. Methods are called from
/// the client's connection task, one at a time, in arrival order.
///
/// ## Example
///
/// ```rust
/// use signalforge::prelude::*;
///
/// struct Logger;
///
/// impl SignalListener for Logger {
///     fn on_room_update(&mut self, update: RoomUpdate) {
///         println!("room is now {}", update.room.name);
///     }
///
///     fn on_close(&mut self, reason: CloseReason, can_reconnect: bool) {
///         println!("closed: {reason} (reconnect: {can_reconnect})");
///     }
/// }
/// ```
#[allow(unused_variables)]
pub trait SignalListener: Send + 'static {
    /// Entry point for every delivered response.
    ///
    /// The default routes each kind to its own method. Override this to
    /// receive responses unsplit.
    fn on_response(&mut self, response: SignalResponse) {
        match response {
            SignalResponse::Offer(offer) => self.on_offer(offer),
            SignalResponse::Answer(answer) => self.on_answer(answer),
            SignalResponse::Trickle(trickle) => self.on_trickle(trickle),
            SignalResponse::Update(update) => self.on_participant_update(update),
            SignalResponse::RoomUpdate(update) => self.on_room_update(update),
            SignalResponse::SpeakersChanged(speakers) => self.on_speakers_changed(speakers),
            SignalResponse::ConnectionQuality(update) => self.on_connection_quality(update),
            SignalResponse::StreamStateUpdate(update) => self.on_stream_state_update(update),
            SignalResponse::SubscriptionPermissionUpdate(update) => {
                self.on_subscription_permission_update(update);
            }
            SignalResponse::RefreshToken(token) => self.on_refresh_token(token),
            SignalResponse::Mute(mute) => self.on_remote_mute(mute),
            SignalResponse::TrackPublished(published) => self.on_track_published(published),
            SignalResponse::TrackUnpublished(unpublished) => {
                self.on_track_unpublished(unpublished);
            }
            SignalResponse::Leave(leave) => self.on_leave(leave),
            SignalResponse::Join(_) | SignalResponse::Reconnect(_) | SignalResponse::Pong(_) => {
                tracing::trace!(kind = response.kind(), "not a listener response");
            }
        }
    }

    fn on_offer(&mut self, offer: SessionDescription) {}

    fn on_answer(&mut self, answer: SessionDescription) {}

    fn on_trickle(&mut self, trickle: TrickleRequest) {}

    fn on_participant_update(&mut self, update: ParticipantUpdate) {}

    fn on_room_update(&mut self, update: RoomUpdate) {}

    fn on_speakers_changed(&mut self, speakers: SpeakersChanged) {}

    fn on_connection_quality(&mut self, update: ConnectionQualityUpdate) {}

    fn on_stream_state_update(&mut self, update: StreamStateUpdate) {}

    fn on_subscription_permission_update(&mut self, update: SubscriptionPermissionUpdate) {}

    /// The server issued a fresh access token for future reconnects.
    fn on_refresh_token(&mut self, token: String) {}

    /// The server muted one of our tracks.
    fn on_remote_mute(&mut self, mute: MuteTrackRequest) {}

    fn on_track_published(&mut self, response: TrackPublishedResponse) {}

    fn on_track_unpublished(&mut self, response: TrackUnpublishedResponse) {}

    /// The server asked us to leave.
    fn on_leave(&mut self, leave: LeaveRequest) {}

    /// An established connection ended. Called at most once per connection,
    /// and never for a connection the caller closed.
    fn on_close(&mut self, reason: CloseReason, can_reconnect: bool);
}

// ---------------------------------------------------------------------------
// ChannelListener
// ---------------------------------------------------------------------------

/// Everything a [`ChannelListener`] forwards.
#[derive(Debug)]
pub enum SignalEvent {
    Response(SignalResponse),
    Closed {
        reason: CloseReason,
        can_reconnect: bool,
    },
}

/// A listener that forwards everything into an unbounded channel, for
/// consumers that prefer `recv().await` over callbacks.
#[derive(Debug, Clone)]
pub struct ChannelListener {
    tx: mpsc::UnboundedSender<SignalEvent>,
}

impl ChannelListener {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<SignalEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    fn forward(&self, event: SignalEvent) {
        if self.tx.send(event).is_err() {
            tracing::trace!("signal event receiver dropped");
        }
    }
}

impl SignalListener for ChannelListener {
    fn on_response(&mut self, response: SignalResponse) {
        self.forward(SignalEvent::Response(response));
    }

    fn on_close(&mut self, reason: CloseReason, can_reconnect: bool) {
        self.forward(SignalEvent::Closed {
            reason,
            can_reconnect,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use signalforge_protocol::{Room, RoomUpdate};

    #[derive(Default)]
    struct Recorder {
        seen: Vec<&'static str>,
    }

    impl SignalListener for Recorder {
        fn on_offer(&mut self, _offer: SessionDescription) {
            self.seen.push("offer");
        }

        fn on_room_update(&mut self, _update: RoomUpdate) {
            self.seen.push("room_update");
        }

        fn on_close(&mut self, _reason: CloseReason, _can_reconnect: bool) {
            self.seen.push("close");
        }
    }

    #[test]
    fn test_default_on_response_routes_by_kind() {
        let mut r = Recorder::default();
        r.on_response(SignalResponse::RoomUpdate(RoomUpdate { room: Room::default() }));
        r.on_response(SignalResponse::Offer(SessionDescription {
            sdp_type: "offer".into(),
            sdp: String::new(),
        }));
        r.on_response(SignalResponse::RefreshToken("t".into()));
        assert_eq!(r.seen, vec!["room_update", "offer"]);
    }

    #[test]
    fn test_can_reconnect_rules() {
        let normal = CloseReason::ServerClosed {
            code: CLOSE_NORMAL,
            reason: String::new(),
        };
        let going_away = CloseReason::ServerClosed {
            code: 1001,
            reason: "restart".into(),
        };
        let failure = CloseReason::TransportFailure(TransportError::ConnectionClosed("reset".into()));

        assert!(!normal.can_reconnect());
        assert!(going_away.can_reconnect());
        assert!(failure.can_reconnect());
        assert!(CloseReason::PingTimeout.can_reconnect());
    }

    #[test]
    fn test_channel_listener_forwards() {
        let (mut listener, mut rx) = ChannelListener::new();
        listener.on_response(SignalResponse::RefreshToken("abc".into()));
        listener.on_close(CloseReason::PingTimeout, true);

        assert!(matches!(
            rx.try_recv(),
            Ok(SignalEvent::Response(SignalResponse::RefreshToken(t))) if t == "abc"
        ));
        assert!(matches!(
            rx.try_recv(),
            Ok(SignalEvent::Closed { reason: CloseReason::PingTimeout, can_reconnect: true })
        ));
    }
}
