//! Connection actor: one Tokio task that owns a signaling connection.
//!
//! The task owns the transport handle, the pending handshake, the outbound
//! dispatcher, the response gate and the heartbeat monitor. Nothing else
//! touches them; the outside world talks to it through [`Command`]s and the
//! transport through `(ConnectionId, TransportEvent)` pairs.
//!
//! Each loop iteration waits on four sources:
//!
//! 1. handle commands
//! 2. transport events (for any connection ever opened; stale ones are
//!    dropped by id)
//! 3. the heartbeat monitor
//! 4. the handshake deadline
//!
//! Handlers never await, so a caller suspended in `join` cannot hold up
//! event delivery.

use std::time::Duration;

use signalforge_heartbeat::{HeartbeatConfig, HeartbeatEvent, HeartbeatMonitor};
use signalforge_protocol::{
    Codec, ConnectMode, JoinResponse, ReconnectResponse, SignalRequest,
    SignalResponse,
};
use signalforge_session::{
    ConnectionState, Dispatch, HandshakeKind, PendingHandshake, QueuedRequest,
    RequestDispatcher, ResponseGate,
};
use signalforge_transport::{
    CLOSE_NORMAL, Connection, ConnectionId, Connector, EventSinkFactory,
    EventStream, TransportError, TransportEvent, event_channel,
};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant};

use crate::client::Command;
use crate::{ClientConfig, CloseReason, SignalError, SignalListener};

/// Close code sent when the heartbeat gives up on a connection.
pub const CLOSE_PING_TIMEOUT: u16 = 4000;

/// Spawns a connection actor as a Tokio task.
///
/// Returns the command sender, the state receiver and the task handle.
pub(crate) fn spawn_connection<K, C, L>(
    connector: K,
    codec: C,
    listener: L,
    config: ClientConfig,
) -> (
    mpsc::Sender<Command>,
    watch::Receiver<ConnectionState>,
    JoinHandle<()>,
)
where
    K: Connector,
    C: Codec,
    L: SignalListener,
{
    let (tx, rx) = mpsc::channel(config.command_buffer);
    let (state_tx, state_rx) = watch::channel(ConnectionState::Disconnected);
    let (sinks, events) = event_channel();

    let actor = ConnectionActor {
        connector,
        codec,
        listener,
        config,
        commands: rx,
        sinks,
        events,
        transport: None,
        pending: None,
        handshake_deadline: None,
        state: ConnectionState::Disconnected,
        state_tx,
        dispatcher: RequestDispatcher::new(),
        gate: ResponseGate::new(),
        heartbeat: HeartbeatMonitor::new(),
        session_heartbeat: HeartbeatConfig::default(),
    };

    let task = tokio::spawn(actor.run());
    (tx, state_rx, task)
}

/// The handshake currently waiting for its response.
enum Pending {
    Join(PendingHandshake<JoinResponse, SignalError>),
    Reconnect(PendingHandshake<ReconnectResponse, SignalError>),
}

impl Pending {
    fn kind(&self) -> HandshakeKind {
        match self {
            Self::Join(h) => h.kind(),
            Self::Reconnect(h) => h.kind(),
        }
    }

    fn fail(self, error: SignalError) {
        let kind = self.kind();
        let delivered = match self {
            Self::Join(mut h) => h.fail(error),
            Self::Reconnect(mut h) => h.fail(error),
        };
        if let Err(e) = delivered {
            tracing::debug!(%kind, error = %e, "handshake failure not delivered");
        }
    }
}

/// How a transport ended.
enum Ending {
    Closed { code: u16, reason: String },
    Failed(TransportError),
}

/// The internal connection state. Runs inside a Tokio task.
struct ConnectionActor<K: Connector, C: Codec, L: SignalListener> {
    connector: K,
    codec: C,
    listener: L,
    config: ClientConfig,
    commands: mpsc::Receiver<Command>,
    sinks: EventSinkFactory,
    events: EventStream,
    /// The current transport. Events from any other connection are stale.
    transport: Option<K::Connection>,
    pending: Option<Pending>,
    handshake_deadline: Option<Instant>,
    state: ConnectionState,
    state_tx: watch::Sender<ConnectionState>,
    dispatcher: RequestDispatcher,
    gate: ResponseGate,
    heartbeat: HeartbeatMonitor,
    /// Heartbeat settings from the last join, reused by reconnects that do
    /// not announce their own.
    session_heartbeat: HeartbeatConfig,
}

impl<K: Connector, C: Codec, L: SignalListener> ConnectionActor<K, C, L> {
    /// Runs the actor loop until the handle goes away.
    async fn run(mut self) {
        tracing::debug!("signal connection task started");

        loop {
            let deadline = self.handshake_deadline;
            tokio::select! {
                cmd = self.commands.recv() => match cmd {
                    Some(cmd) => self.handle_command(cmd),
                    None => break,
                },
                Some((id, event)) = self.events.recv() => {
                    self.handle_transport_event(id, event);
                }
                event = self.heartbeat.next_event() => {
                    self.handle_heartbeat(event);
                }
                () = wait_until(deadline) => {
                    self.handle_handshake_timeout();
                }
            }
        }

        if let Some(transport) = self.transport.take() {
            transport.close(CLOSE_NORMAL, "client dropped");
        }
        tracing::debug!("signal connection task stopped");
    }

    // -----------------------------------------------------------------------
    // Commands
    // -----------------------------------------------------------------------

    fn handle_command(&mut self, cmd: Command) {
        match cmd {
            Command::Join {
                url,
                token,
                handshake,
            } => self.start_handshake(&url, &token, ConnectMode::Join, Pending::Join(handshake)),
            Command::Reconnect {
                url,
                token,
                participant_sid,
                handshake,
            } => self.start_handshake(
                &url,
                &token,
                ConnectMode::Reconnect { participant_sid },
                Pending::Reconnect(handshake),
            ),
            Command::Send {
                kind,
                frame,
                bypass,
            } => match self.dispatcher.submit(kind, frame, bypass) {
                Dispatch::SendNow(frame) => self.write(kind, frame),
                Dispatch::Queued => {
                    tracing::debug!(kind, queued = self.dispatcher.queued(), "request queued");
                }
            },
            Command::ReadyForResponses { reply } => {
                for response in self.gate.set_ready() {
                    self.listener.on_response(response);
                }
                let _ = reply.send(());
            }
            Command::PeerConnectionEstablished { reply } => {
                self.handle_peer_connection_established();
                let _ = reply.send(());
            }
            Command::Close { reply } => {
                self.close_by_caller();
                let _ = reply.send(());
            }
        }
    }

    fn start_handshake(
        &mut self,
        server: &str,
        token: &str,
        mode: ConnectMode,
        handshake: Pending,
    ) {
        if let Some(current) = &self.pending {
            handshake.fail(SignalError::HandshakeInProgress(current.kind()));
            return;
        }

        let url = match self.config.connect.signal_url(server, token, &mode) {
            Ok(url) => url,
            Err(e) => {
                handshake.fail(e.into());
                return;
            }
        };

        // A new handshake replaces whatever was there, silently.
        if let Some(old) = self.transport.take() {
            tracing::debug!(conn_id = %old.id(), "replacing previous connection");
            old.close(CLOSE_NORMAL, "replaced");
        }
        self.heartbeat.stop();
        self.dispatcher.handshake_started();

        let (state, kind) = match &mode {
            ConnectMode::Join => {
                // A join starts a new logical connection.
                self.gate.reset();
                (ConnectionState::Connecting, HandshakeKind::Join)
            }
            ConnectMode::Reconnect { .. } => (ConnectionState::Reconnecting, HandshakeKind::Reconnect),
        };

        let sink = self.sinks.sink();
        let conn_id = sink.id();
        self.transport = Some(self.connector.open(&url, sink));
        self.pending = Some(handshake);
        self.handshake_deadline = self.config.handshake_timeout.map(|t| Instant::now() + t);
        self.set_state(state);

        tracing::info!(%conn_id, %kind, server, "handshake started");
    }

    fn handle_peer_connection_established(&mut self) {
        if self.state != ConnectionState::Connected {
            tracing::debug!(state = %self.state, "peer connection established while not connected, ignoring");
            return;
        }
        match self.dispatcher.peer_connection_established() {
            Some(flushed) => self.flush(flushed),
            None => tracing::debug!("no completed handshake to flush over"),
        }
    }

    fn close_by_caller(&mut self) {
        if let Some(pending) = self.pending.take() {
            pending.fail(SignalError::Closed);
        }
        self.handshake_deadline = None;
        self.heartbeat.stop();
        if let Some(transport) = self.transport.take() {
            transport.close(CLOSE_NORMAL, "normal closure");
        }
        let dropped = self.dispatcher.clear();
        self.dispatcher.disconnected();
        self.set_state(ConnectionState::Disconnected);
        tracing::info!(dropped, "signal connection closed by caller");
    }

    // -----------------------------------------------------------------------
    // Transport events
    // -----------------------------------------------------------------------

    fn handle_transport_event(&mut self, id: ConnectionId, event: TransportEvent) {
        if self.transport.as_ref().map(Connection::id) != Some(id) {
            tracing::trace!(conn_id = %id, ?event, "event from stale connection, ignoring");
            return;
        }

        match event {
            TransportEvent::Opened(response) => {
                tracing::debug!(conn_id = %id, status = response.status, "transport open");
            }
            TransportEvent::Message(data) => self.handle_message(id, &data),
            TransportEvent::Closed { code, reason } => {
                self.handle_ending(id, Ending::Closed { code, reason });
            }
            TransportEvent::Failed { cause, response } => {
                tracing::debug!(
                    conn_id = %id,
                    status = ?response.map(|r| r.status),
                    "transport failed"
                );
                self.handle_ending(id, Ending::Failed(cause));
            }
        }
    }

    fn handle_message(&mut self, id: ConnectionId, data: &[u8]) {
        let response: SignalResponse = match self.codec.decode(data) {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(conn_id = %id, error = %e, "dropping undecodable message");
                return;
            }
        };

        match response {
            SignalResponse::Pong(pong) => self.heartbeat.record_pong(&pong),
            SignalResponse::Join(join) => match self.pending.take() {
                Some(Pending::Join(handshake)) => self.resolve_join(handshake, join),
                other => {
                    self.pending = other;
                    tracing::warn!(conn_id = %id, "unexpected join response, dropping");
                }
            },
            SignalResponse::Reconnect(reconnect) => match self.pending.take() {
                Some(Pending::Reconnect(handshake)) => self.resolve_reconnect(handshake, reconnect),
                other => {
                    self.pending = other;
                    tracing::warn!(conn_id = %id, "unexpected reconnect response, dropping");
                }
            },
            other => {
                if let Some(response) = self.gate.offer(other) {
                    self.listener.on_response(response);
                }
            }
        }
    }

    fn resolve_join(
        &mut self,
        mut handshake: PendingHandshake<JoinResponse, SignalError>,
        join: JoinResponse,
    ) {
        self.handshake_deadline = None;
        self.set_state(ConnectionState::Connected);

        self.session_heartbeat = HeartbeatConfig::from_secs(join.ping_interval, join.ping_timeout)
            .with_jitter(self.config.first_ping_jitter);
        self.heartbeat.start(self.session_heartbeat.clone());

        let flushed = self.dispatcher.join_resolved();
        self.flush(flushed);

        tracing::info!(
            room = %join.room.name,
            participant = %join.participant.sid,
            server_version = %join.server_version,
            "joined"
        );
        if let Err(e) = handshake.resolve(join) {
            tracing::debug!(error = %e, "join response not delivered");
        }
    }

    fn resolve_reconnect(
        &mut self,
        mut handshake: PendingHandshake<ReconnectResponse, SignalError>,
        reconnect: ReconnectResponse,
    ) {
        self.handshake_deadline = None;
        self.set_state(ConnectionState::Connected);

        let announced = HeartbeatConfig::from_secs(reconnect.ping_interval, reconnect.ping_timeout);
        let config = HeartbeatConfig {
            ping_interval: announced.ping_interval.or(self.session_heartbeat.ping_interval),
            ping_timeout: announced.ping_timeout.or(self.session_heartbeat.ping_timeout),
            first_ping_jitter: self.config.first_ping_jitter,
        };
        self.heartbeat.start(config);

        // Negotiation requests go out now; the rest waits for the peer
        // connection.
        let released = self.dispatcher.reconnect_resolved();
        self.flush(released);

        tracing::info!(queued = self.dispatcher.queued(), "reconnected");
        if let Err(e) = handshake.resolve(reconnect) {
            tracing::debug!(error = %e, "reconnect response not delivered");
        }
    }

    fn handle_ending(&mut self, id: ConnectionId, ending: Ending) {
        self.transport = None;
        self.handshake_deadline = None;
        self.heartbeat.stop();
        self.dispatcher.disconnected();
        self.set_state(ConnectionState::Disconnected);

        if let Some(pending) = self.pending.take() {
            tracing::info!(conn_id = %id, kind = %pending.kind(), "connection ended during handshake");
            pending.fail(match ending {
                Ending::Closed { code, reason } => SignalError::ConnectionClosed { code, reason },
                Ending::Failed(cause) => SignalError::Transport(cause),
            });
            return;
        }

        let reason = match ending {
            Ending::Closed { code, reason } => CloseReason::ServerClosed { code, reason },
            Ending::Failed(cause) => CloseReason::TransportFailure(cause),
        };
        self.notify_close(id, reason);
    }

    // -----------------------------------------------------------------------
    // Timers
    // -----------------------------------------------------------------------

    fn handle_heartbeat(&mut self, event: HeartbeatEvent) {
        match event {
            HeartbeatEvent::Ping(ping) => match self.codec.encode(&SignalRequest::Ping(ping)) {
                Ok(frame) => self.write("ping", frame),
                Err(e) => tracing::warn!(error = %e, "failed to encode ping"),
            },
            HeartbeatEvent::TimedOut { since_last_pong } => {
                let Some(transport) = self.transport.take() else {
                    self.heartbeat.stop();
                    return;
                };
                let id = transport.id();
                tracing::warn!(conn_id = %id, ?since_last_pong, "ping timeout, closing connection");
                transport.close(CLOSE_PING_TIMEOUT, "ping timeout");

                self.heartbeat.stop();
                self.dispatcher.disconnected();
                self.set_state(ConnectionState::Disconnected);
                self.notify_close(id, CloseReason::PingTimeout);
            }
        }
    }

    fn handle_handshake_timeout(&mut self) {
        self.handshake_deadline = None;
        let Some(pending) = self.pending.take() else {
            return;
        };
        let after = self.config.handshake_timeout.unwrap_or(Duration::ZERO);
        let kind = pending.kind();
        tracing::warn!(%kind, ?after, "handshake timed out");

        if let Some(transport) = self.transport.take() {
            transport.close(CLOSE_NORMAL, "handshake timeout");
        }
        self.dispatcher.disconnected();
        self.set_state(ConnectionState::Disconnected);
        pending.fail(SignalError::HandshakeTimeout { kind, after });
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    fn flush(&mut self, requests: Vec<QueuedRequest>) {
        if !requests.is_empty() {
            tracing::debug!(count = requests.len(), "flushing queued requests");
        }
        for request in requests {
            self.write(request.kind, request.frame);
        }
    }

    fn write(&self, kind: &'static str, frame: Vec<u8>) {
        let Some(transport) = &self.transport else {
            tracing::warn!(kind, "no transport for outbound request, dropping");
            return;
        };
        match transport.send(frame) {
            Ok(()) => tracing::trace!(conn_id = %transport.id(), kind, "request sent"),
            // The transport reports its own failure through the event stream.
            Err(e) => tracing::warn!(conn_id = %transport.id(), kind, error = %e, "send failed"),
        }
    }

    fn notify_close(&mut self, id: ConnectionId, reason: CloseReason) {
        let can_reconnect = reason.can_reconnect();
        tracing::info!(conn_id = %id, %reason, can_reconnect, "signal connection closed");
        self.listener.on_close(reason, can_reconnect);
    }

    fn set_state(&mut self, state: ConnectionState) {
        if self.state != state {
            tracing::debug!(from = %self.state, to = %state, "connection state changed");
        }
        self.state = state;
        self.state_tx.send_replace(state);
    }
}

/// Sleeps until `deadline`, or forever without one.
async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
