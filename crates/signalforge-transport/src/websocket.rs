//! WebSocket client connector using `tokio-tungstenite`.

use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::{self, Message};

use crate::{
    Connection, ConnectionId, Connector, EventSink, HttpMetadata,
    TransportError, TransportEvent, CLOSE_ABNORMAL,
};

/// Work queued for a connection's socket task.
enum Outbound {
    Frame(Vec<u8>),
    Close { code: u16, reason: String },
}

/// A [`Connector`] that opens WebSocket connections.
///
/// Each connection runs on its own Tokio task, so [`Connector::open`] must be
/// called from within a Tokio runtime.
#[derive(Debug, Clone, Copy, Default)]
pub struct WebSocketConnector;

impl WebSocketConnector {
    /// Creates a new connector.
    pub fn new() -> Self {
        Self
    }
}

impl Connector for WebSocketConnector {
    type Connection = WebSocketConnection;

    fn open(&self, url: &str, events: EventSink) -> Self::Connection {
        let id = events.id();
        let (tx, rx) = mpsc::unbounded_channel();
        tracing::debug!(%id, url, "opening WebSocket connection");
        tokio::spawn(run_socket(url.to_owned(), rx, events));
        WebSocketConnection { id, outbound: tx }
    }
}

/// Handle to a single WebSocket connection.
///
/// Dropping the handle closes the socket without a close frame.
#[derive(Debug)]
pub struct WebSocketConnection {
    id: ConnectionId,
    outbound: mpsc::UnboundedSender<Outbound>,
}

impl Connection for WebSocketConnection {
    fn send(&self, data: Vec<u8>) -> Result<(), TransportError> {
        self.outbound.send(Outbound::Frame(data)).map_err(|_| {
            TransportError::ConnectionClosed("socket task has exited".into())
        })
    }

    fn close(&self, code: u16, reason: &str) {
        let _ = self.outbound.send(Outbound::Close {
            code,
            reason: reason.to_owned(),
        });
    }

    fn id(&self) -> ConnectionId {
        self.id
    }
}

/// Drives one socket: connect, then pump frames both ways until closed.
async fn run_socket(
    url: String,
    mut outbound: mpsc::UnboundedReceiver<Outbound>,
    events: EventSink,
) {
    let id = events.id();
    let (ws, response) = match tokio_tungstenite::connect_async(url.as_str()).await {
        Ok(pair) => pair,
        Err(e) => {
            tracing::debug!(%id, error = %e, "WebSocket connect failed");
            let (cause, response) = connect_failure(e);
            events.emit(TransportEvent::Failed { cause, response });
            return;
        }
    };

    events.emit(TransportEvent::Opened(metadata(
        response.status(),
        response.headers(),
    )));
    let (mut sink, mut stream) = ws.split();

    loop {
        tokio::select! {
            cmd = outbound.recv() => match cmd {
                Some(Outbound::Frame(data)) => {
                    if let Err(e) = sink.send(Message::Binary(data.into())).await {
                        events.emit(TransportEvent::Failed {
                            cause: TransportError::SendFailed(io_error(
                                std::io::ErrorKind::BrokenPipe,
                                e,
                            )),
                            response: None,
                        });
                        return;
                    }
                }
                Some(Outbound::Close { code, reason }) => {
                    let frame = CloseFrame {
                        code: CloseCode::from(code),
                        reason: reason.clone().into(),
                    };
                    let _ = sink.send(Message::Close(Some(frame))).await;
                    tracing::debug!(%id, code, %reason, "WebSocket closed locally");
                    events.emit(TransportEvent::Closed { code, reason });
                    return;
                }
                // Handle dropped.
                None => {
                    let _ = sink.close().await;
                    return;
                }
            },
            msg = stream.next() => match msg {
                Some(Ok(Message::Binary(data))) => {
                    events.emit(TransportEvent::Message(data.into()));
                }
                Some(Ok(Message::Text(text))) => {
                    events.emit(TransportEvent::Message(text.as_bytes().to_vec()));
                }
                Some(Ok(Message::Close(frame))) => {
                    let (code, reason) = match frame {
                        Some(f) => (u16::from(f.code), f.reason.as_str().to_owned()),
                        None => (CLOSE_ABNORMAL, String::new()),
                    };
                    tracing::debug!(%id, code, %reason, "WebSocket closed by server");
                    events.emit(TransportEvent::Closed { code, reason });
                    return;
                }
                Some(Ok(_)) => {} // skip ping/pong/frame
                Some(Err(e)) => {
                    events.emit(TransportEvent::Failed {
                        cause: TransportError::ReceiveFailed(io_error(
                            std::io::ErrorKind::ConnectionReset,
                            e,
                        )),
                        response: None,
                    });
                    return;
                }
                None => {
                    events.emit(TransportEvent::Closed {
                        code: CLOSE_ABNORMAL,
                        reason: "stream ended".into(),
                    });
                    return;
                }
            },
        }
    }
}

fn connect_failure(
    e: tungstenite::Error,
) -> (TransportError, Option<HttpMetadata>) {
    match e {
        tungstenite::Error::Http(response) => {
            let meta = metadata(response.status(), response.headers());
            (TransportError::Rejected(meta.status), Some(meta))
        }
        other => (
            TransportError::ConnectFailed(io_error(
                std::io::ErrorKind::ConnectionRefused,
                other,
            )),
            None,
        ),
    }
}

fn metadata(
    status: tungstenite::http::StatusCode,
    headers: &tungstenite::http::HeaderMap,
) -> HttpMetadata {
    HttpMetadata {
        status: status.as_u16(),
        headers: headers
            .iter()
            .map(|(k, v)| {
                (
                    k.as_str().to_owned(),
                    v.to_str().unwrap_or_default().to_owned(),
                )
            })
            .collect(),
    }
}

fn io_error(kind: std::io::ErrorKind, e: tungstenite::Error) -> std::io::Error {
    std::io::Error::new(kind, e)
}
