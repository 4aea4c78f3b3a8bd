//! Inbound response gate.
//!
//! The consumer may still be building its own session objects from the join
//! response when the next updates arrive. Until it calls
//! [`ResponseGate::set_ready`], responses are buffered in arrival order.

use std::collections::VecDeque;

use signalforge_protocol::SignalResponse;

/// FIFO of responses received before the consumer was ready.
#[derive(Debug, Default)]
pub struct InboundBuffer {
    responses: VecDeque<SignalResponse>,
}

impl InboundBuffer {
    pub fn len(&self) -> usize {
        self.responses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.responses.is_empty()
    }
}

/// Holds responses back until the consumer is ready, then passes them
/// through.
#[derive(Debug, Default)]
pub struct ResponseGate {
    ready: bool,
    buffer: InboundBuffer,
}

impl ResponseGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Offers a decoded response to the gate.
    ///
    /// Returns it back when it must be delivered now, or `None` when it was
    /// buffered. Join and reconnect responses belong to the handshake and are
    /// dropped here.
    pub fn offer(&mut self, response: SignalResponse) -> Option<SignalResponse> {
        if matches!(
            response,
            SignalResponse::Join(_) | SignalResponse::Reconnect(_)
        ) {
            tracing::warn!(
                kind = response.kind(),
                "handshake response offered to the response gate, dropping"
            );
            return None;
        }
        if self.ready {
            return Some(response);
        }
        self.buffer.responses.push_back(response);
        None
    }

    /// Marks the consumer ready.
    ///
    /// The first call returns everything buffered, oldest first; later calls
    /// return nothing.
    pub fn set_ready(&mut self) -> Vec<SignalResponse> {
        if self.ready {
            return Vec::new();
        }
        self.ready = true;
        self.buffer.responses.drain(..).collect()
    }

    /// Starts a new logical connection: not ready, nothing buffered.
    pub fn reset(&mut self) {
        self.ready = false;
        self.buffer.responses.clear();
    }

    pub fn is_ready(&self) -> bool {
        self.ready
    }

    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use signalforge_protocol::{
        JoinResponse, Room, RoomUpdate, SessionDescription,
    };

    fn offer() -> SignalResponse {
        SignalResponse::Offer(SessionDescription {
            sdp_type: "offer".into(),
            sdp: "v=0".into(),
        })
    }

    fn room_update(name: &str) -> SignalResponse {
        SignalResponse::RoomUpdate(RoomUpdate {
            room: Room {
                name: name.into(),
                ..Room::default()
            },
        })
    }

    #[test]
    fn test_buffers_until_ready_then_drains_in_order() {
        let mut gate = ResponseGate::new();
        assert!(gate.offer(offer()).is_none());
        assert!(gate.offer(room_update("a")).is_none());
        assert!(gate.offer(room_update("b")).is_none());
        assert_eq!(gate.buffered(), 3);

        let drained = gate.set_ready();
        assert_eq!(drained, vec![offer(), room_update("a"), room_update("b")]);
        assert!(gate.is_ready());
        assert_eq!(gate.buffered(), 0);
    }

    #[test]
    fn test_passes_through_after_ready() {
        let mut gate = ResponseGate::new();
        gate.set_ready();
        assert_eq!(gate.offer(room_update("x")), Some(room_update("x")));
        assert_eq!(gate.buffered(), 0);
    }

    #[test]
    fn test_set_ready_is_idempotent() {
        let mut gate = ResponseGate::new();
        gate.offer(offer());
        assert_eq!(gate.set_ready().len(), 1);
        assert!(gate.set_ready().is_empty());
        assert!(gate.is_ready());
    }

    #[test]
    fn test_handshake_responses_never_enter() {
        let mut gate = ResponseGate::new();
        assert!(gate.offer(SignalResponse::Join(JoinResponse::default())).is_none());
        assert_eq!(gate.buffered(), 0);

        gate.set_ready();
        assert!(gate.offer(SignalResponse::Join(JoinResponse::default())).is_none());
    }

    #[test]
    fn test_reset_starts_over() {
        let mut gate = ResponseGate::new();
        gate.offer(offer());
        gate.set_ready();
        gate.reset();

        assert!(!gate.is_ready());
        assert!(gate.offer(room_update("late")).is_none());
        assert_eq!(gate.set_ready(), vec![room_update("late")]);
    }
}
