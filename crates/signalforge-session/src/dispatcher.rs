//! Outbound request dispatch: send now, or queue until the connection is
//! usable.
//!
//! The dispatcher never touches the transport itself. It answers "send this
//! frame now?" and hands back queued frames, in submission order, when the
//! outbound gate opens. The connection task does the writing.
//!
//! # Gate rules
//!
//! ```text
//! handshake started ─→ gate closed (everything queues)
//! join resolved     ─→ gate open, queue drained
//! reconnect resolved ─→ gate stays closed; queued bypass kinds released, later ones flow
//! peer connection established (after a resolved handshake) ─→ gate open, queue drained
//! disconnected      ─→ gate closed, queue kept
//! ```

use std::collections::VecDeque;

/// One encoded request waiting for the gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueuedRequest {
    /// Request kind, for logs.
    pub kind: &'static str,
    /// Encoded frame, ready for the transport.
    pub frame: Vec<u8>,
    /// May go out before the gate opens once a handshake completed.
    pub bypass: bool,
}

/// What to do with a submitted request.
#[derive(Debug, PartialEq, Eq)]
pub enum Dispatch {
    /// Write this frame to the current transport now.
    SendNow(Vec<u8>),
    /// The request was appended to the outbound queue.
    Queued,
}

/// FIFO of requests submitted while the gate was closed.
#[derive(Debug, Default)]
pub struct OutboundQueue {
    requests: VecDeque<QueuedRequest>,
}

impl OutboundQueue {
    fn push(&mut self, request: QueuedRequest) {
        self.requests.push_back(request);
    }

    fn drain(&mut self) -> Vec<QueuedRequest> {
        self.requests.drain(..).collect()
    }

    /// Removes the bypass requests, keeping both halves in submission order.
    fn take_bypass(&mut self) -> Vec<QueuedRequest> {
        let (bypass, held): (VecDeque<_>, VecDeque<_>) =
            self.requests.drain(..).partition(|r| r.bypass);
        self.requests = held;
        bypass.into()
    }

    pub fn len(&self) -> usize {
        self.requests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }
}

/// Decides whether outbound requests go out now or wait in the queue.
#[derive(Debug, Default)]
pub struct RequestDispatcher {
    queue: OutboundQueue,
    /// Open once queued traffic may flow.
    gate_open: bool,
    /// A handshake completed on the current transport.
    handshake_done: bool,
}

impl RequestDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Submits an encoded request.
    ///
    /// Sent now when the gate is open, or when `bypass` is set and a
    /// handshake has completed on the current transport. Otherwise queued.
    pub fn submit(
        &mut self,
        kind: &'static str,
        frame: Vec<u8>,
        bypass: bool,
    ) -> Dispatch {
        if self.gate_open || (bypass && self.handshake_done) {
            return Dispatch::SendNow(frame);
        }
        self.queue.push(QueuedRequest {
            kind,
            frame,
            bypass,
        });
        tracing::trace!(kind, queued = self.queue.len(), "request queued");
        Dispatch::Queued
    }

    /// A new join or reconnect handshake began on a fresh transport.
    pub fn handshake_started(&mut self) {
        self.gate_open = false;
        self.handshake_done = false;
    }

    /// The join handshake completed: open the gate and flush.
    pub fn join_resolved(&mut self) -> Vec<QueuedRequest> {
        self.handshake_done = true;
        self.open_and_drain()
    }

    /// The reconnect handshake completed. The gate stays closed until
    /// [`peer_connection_established`](Self::peer_connection_established).
    ///
    /// Returns the queued bypass requests, to be written before any bypass
    /// request submitted from now on.
    pub fn reconnect_resolved(&mut self) -> Vec<QueuedRequest> {
        self.handshake_done = true;
        self.queue.take_bypass()
    }

    /// The media layer reports its peer connection is up.
    ///
    /// Returns the queued requests to flush, or `None` if no handshake has
    /// completed on the current transport (nothing to flush over yet).
    pub fn peer_connection_established(&mut self) -> Option<Vec<QueuedRequest>> {
        if !self.handshake_done {
            return None;
        }
        Some(self.open_and_drain())
    }

    /// The transport went away. Queued requests are kept for the next
    /// connection.
    pub fn disconnected(&mut self) {
        self.gate_open = false;
        self.handshake_done = false;
    }

    /// Drops every queued request.
    pub fn clear(&mut self) -> usize {
        let dropped = self.queue.len();
        self.queue.drain();
        dropped
    }

    pub fn is_open(&self) -> bool {
        self.gate_open
    }

    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    fn open_and_drain(&mut self) -> Vec<QueuedRequest> {
        self.gate_open = true;
        self.queue.drain()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn submit(d: &mut RequestDispatcher, n: u8) -> Dispatch {
        d.submit("mute", vec![n], false)
    }

    fn frames(requests: Vec<QueuedRequest>) -> Vec<Vec<u8>> {
        requests.into_iter().map(|r| r.frame).collect()
    }

    #[test]
    fn test_queues_while_closed() {
        let mut d = RequestDispatcher::new();
        assert_eq!(submit(&mut d, 1), Dispatch::Queued);
        assert_eq!(submit(&mut d, 2), Dispatch::Queued);
        assert_eq!(d.queued(), 2);
        assert!(!d.is_open());
    }

    #[test]
    fn test_join_drains_fifo_then_sends_directly() {
        let mut d = RequestDispatcher::new();
        d.handshake_started();
        for n in 1..=3 {
            submit(&mut d, n);
        }

        let flushed = d.join_resolved();
        assert_eq!(frames(flushed), vec![vec![1], vec![2], vec![3]]);
        assert!(d.is_open());
        assert_eq!(submit(&mut d, 4), Dispatch::SendNow(vec![4]));
        assert_eq!(d.queued(), 0);
    }

    #[test]
    fn test_reconnect_holds_queue_until_peer_connection() {
        let mut d = RequestDispatcher::new();
        for n in 1..=3 {
            submit(&mut d, n);
        }
        d.handshake_started();
        assert!(d.reconnect_resolved().is_empty());

        assert!(!d.is_open());
        assert_eq!(submit(&mut d, 4), Dispatch::Queued);
        assert_eq!(d.queued(), 4);

        let flushed = d.peer_connection_established().unwrap();
        assert_eq!(
            frames(flushed),
            vec![vec![1], vec![2], vec![3], vec![4]]
        );
        assert!(d.is_open());
    }

    #[test]
    fn test_bypass_needs_completed_handshake() {
        let mut d = RequestDispatcher::new();
        d.handshake_started();
        assert_eq!(d.submit("trickle", vec![9], true), Dispatch::Queued);

        let released = d.reconnect_resolved();
        assert_eq!(frames(released), vec![vec![9]]);
        assert_eq!(
            d.submit("trickle", vec![10], true),
            Dispatch::SendNow(vec![10])
        );
        assert_eq!(d.queued(), 0);
    }

    #[test]
    fn test_reconnect_releases_bypass_in_order_and_holds_the_rest() {
        let mut d = RequestDispatcher::new();
        d.submit("trickle", vec![1], true);
        submit(&mut d, 2);
        d.submit("offer", vec![3], true);
        submit(&mut d, 4);
        d.handshake_started();

        assert_eq!(frames(d.reconnect_resolved()), vec![vec![1], vec![3]]);
        assert_eq!(d.queued(), 2);
        assert_eq!(
            frames(d.peer_connection_established().unwrap()),
            vec![vec![2], vec![4]]
        );
    }

    #[test]
    fn test_peer_connection_before_handshake_is_ignored() {
        let mut d = RequestDispatcher::new();
        submit(&mut d, 1);
        d.handshake_started();
        assert!(d.peer_connection_established().is_none());
        assert_eq!(d.queued(), 1);
        assert!(!d.is_open());
    }

    #[test]
    fn test_disconnect_keeps_queue_and_closes_gate() {
        let mut d = RequestDispatcher::new();
        d.handshake_started();
        d.join_resolved();
        d.disconnected();

        assert!(!d.is_open());
        assert_eq!(submit(&mut d, 5), Dispatch::Queued);
        assert_eq!(d.submit("offer", vec![6], true), Dispatch::Queued);

        d.handshake_started();
        assert_eq!(frames(d.join_resolved()), vec![vec![5], vec![6]]);
    }

    #[test]
    fn test_clear_drops_everything() {
        let mut d = RequestDispatcher::new();
        submit(&mut d, 1);
        submit(&mut d, 2);
        assert_eq!(d.clear(), 2);
        assert_eq!(d.queued(), 0);
    }
}
