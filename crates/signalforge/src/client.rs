//! `SignalClient`: the handle applications hold.
//!
//! The handle is thin. Every operation becomes a [`Command`] for the
//! connection task (see [`crate::actor`]), which owns all connection state.

use signalforge_protocol::{
    Codec, JoinResponse, ParticipantSid, ReconnectResponse, SignalRequest,
};
use signalforge_session::{ConnectionState, HandshakeKind, PendingHandshake};
use signalforge_transport::Connector;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;

use crate::actor::spawn_connection;
use crate::{ClientConfig, SignalError, SignalListener};

/// Commands sent to the connection task through its channel.
///
/// Handshakes carry their own result slot; the other variants that need an
/// answer carry a `oneshot::Sender` reply channel.
pub(crate) enum Command {
    Join {
        url: String,
        token: String,
        handshake: PendingHandshake<JoinResponse, SignalError>,
    },
    Reconnect {
        url: String,
        token: String,
        participant_sid: ParticipantSid,
        handshake: PendingHandshake<ReconnectResponse, SignalError>,
    },
    /// An already-encoded request (fire-and-forget).
    Send {
        kind: &'static str,
        frame: Vec<u8>,
        bypass: bool,
    },
    ReadyForResponses {
        reply: oneshot::Sender<()>,
    },
    PeerConnectionEstablished {
        reply: oneshot::Sender<()>,
    },
    Close {
        reply: oneshot::Sender<()>,
    },
}

/// Handle to a running signaling client.
///
/// Dropping the handle stops the connection task. In-flight handshakes then
/// fail with [`SessionError::Abandoned`](signalforge_session::SessionError::Abandoned).
///
/// ## Example
///
/// ```rust,no_run
/// use signalforge::prelude::*;
///
/// # async fn run() -> Result<(), SignalError> {
/// let (listener, mut events) = ChannelListener::new();
/// let client = SignalClient::start(
///     WebSocketConnector::new(),
///     JsonCodec,
///     listener,
///     ClientConfig::default(),
/// );
///
/// let join = client.join("https://sfu.example.com", "token").await?;
/// println!("joined {} as {}", join.room.name, join.participant.sid);
/// client.on_ready_for_responses().await?;
///
/// while let Some(event) = events.recv().await {
///     println!("{event:?}");
/// }
/// # Ok(())
/// # }
/// ```
pub struct SignalClient<C: Codec> {
    commands: mpsc::Sender<Command>,
    codec: C,
    state: watch::Receiver<ConnectionState>,
    task: JoinHandle<()>,
}

impl<C: Codec> SignalClient<C> {
    /// Spawns the connection task and returns its handle.
    ///
    /// Must be called from within a Tokio runtime. Nothing connects until
    /// [`join`](Self::join) or [`reconnect`](Self::reconnect).
    pub fn start<K, L>(connector: K, codec: C, listener: L, config: ClientConfig) -> Self
    where
        K: Connector,
        L: SignalListener,
    {
        let config = config.validated();
        let (commands, state, task) =
            spawn_connection(connector, codec.clone(), listener, config);
        Self {
            commands,
            codec,
            state,
            task,
        }
    }

    /// Opens a new session and waits for the server's join response.
    ///
    /// Any previous connection is dropped without a close notification.
    /// Requests queued earlier are sent right after the join response.
    ///
    /// # Errors
    /// - [`SignalError::HandshakeInProgress`] if another handshake is pending.
    /// - [`SignalError::Protocol`] if `url` is not a usable server URL.
    /// - [`SignalError::Transport`] / [`SignalError::ConnectionClosed`] if the
    ///   connection fails or closes before the response.
    /// - [`SignalError::HandshakeTimeout`] if the response does not arrive in
    ///   time.
    /// - [`SignalError::Closed`] if [`close`](Self::close) is called meanwhile.
    pub async fn join(&self, url: &str, token: &str) -> Result<JoinResponse, SignalError> {
        let (handshake, response) = PendingHandshake::new(HandshakeKind::Join);
        self.command(Command::Join {
            url: url.to_owned(),
            token: token.to_owned(),
            handshake,
        })
        .await?;
        response.wait().await
    }

    /// Resumes the session of `participant_sid` and waits for the server's
    /// reconnect response.
    ///
    /// Queued requests stay queued until
    /// [`on_peer_connection_established`](Self::on_peer_connection_established).
    ///
    /// # Errors
    /// Same as [`join`](Self::join).
    pub async fn reconnect(
        &self,
        url: &str,
        token: &str,
        participant_sid: impl Into<ParticipantSid>,
    ) -> Result<ReconnectResponse, SignalError> {
        let (handshake, response) = PendingHandshake::new(HandshakeKind::Reconnect);
        self.command(Command::Reconnect {
            url: url.to_owned(),
            token: token.to_owned(),
            participant_sid: participant_sid.into(),
            handshake,
        })
        .await?;
        response.wait().await
    }

    /// Sends a request, or queues it until the connection is usable.
    ///
    /// Never waits: the request is handed to the connection task or
    /// rejected on the spot.
    ///
    /// # Errors
    /// - [`SignalError::Protocol`] if encoding fails. Nothing is queued and
    ///   later requests are unaffected.
    /// - [`SignalError::Busy`] if the command buffer is full.
    /// - [`SignalError::ClientStopped`] if the connection task is gone.
    pub fn send(&self, request: SignalRequest) -> Result<(), SignalError> {
        let frame = self.codec.encode(&request)?;
        let kind = request.kind();
        self.commands
            .try_send(Command::Send {
                kind,
                frame,
                bypass: request.bypasses_queue(),
            })
            .map_err(|e| match e {
                mpsc::error::TrySendError::Full(_) => {
                    tracing::warn!(kind, "command buffer full, request rejected");
                    SignalError::Busy
                }
                mpsc::error::TrySendError::Closed(_) => SignalError::ClientStopped,
            })
    }

    /// Tells the client the consumer is ready: responses buffered so far are
    /// delivered in arrival order, later ones as they arrive.
    pub async fn on_ready_for_responses(&self) -> Result<(), SignalError> {
        let (reply, done) = oneshot::channel();
        self.command(Command::ReadyForResponses { reply }).await?;
        done.await.map_err(|_| SignalError::ClientStopped)
    }

    /// Tells the client the media peer connection is up. After a reconnect
    /// this releases the queued requests.
    pub async fn on_peer_connection_established(&self) -> Result<(), SignalError> {
        let (reply, done) = oneshot::channel();
        self.command(Command::PeerConnectionEstablished { reply }).await?;
        done.await.map_err(|_| SignalError::ClientStopped)
    }

    /// Closes the connection and drops queued requests.
    ///
    /// A pending handshake fails with [`SignalError::Closed`]. The listener is
    /// not notified. Returns once the connection task has applied it.
    pub async fn close(&self) -> Result<(), SignalError> {
        let (reply, done) = oneshot::channel();
        self.command(Command::Close { reply }).await?;
        done.await.map_err(|_| SignalError::ClientStopped)
    }

    /// The current connection state.
    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    /// A receiver that observes every state change.
    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.state.clone()
    }

    async fn command(&self, command: Command) -> Result<(), SignalError> {
        self.commands
            .send(command)
            .await
            .map_err(|_| SignalError::ClientStopped)
    }
}

impl<C: Codec> Drop for SignalClient<C> {
    fn drop(&mut self) {
        self.task.abort();
    }
}
