//! Joins a room over WebSocket and logs everything the server sends.
//!
//! ```text
//! RUST_LOG=debug cargo run -p signal-probe -- wss://sfu.example.com <token>
//! ```
//!
//! Reconnects when the server drops the connection in a resumable way and
//! exits on Ctrl-C or a final close.

use signalforge::prelude::*;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new("info,signalforge=debug,signal_probe=debug")
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut args = std::env::args().skip(1);
    let (Some(url), Some(token)) = (args.next(), args.next()) else {
        eprintln!("usage: signal-probe <server-url> <access-token>");
        std::process::exit(2);
    };

    let (listener, mut events) = ChannelListener::new();
    let client = SignalClient::start(
        WebSocketConnector::new(),
        JsonCodec,
        listener,
        ClientConfig::default(),
    );

    let join = client.join(&url, &token).await?;
    let participant = join.participant.sid.clone();
    tracing::info!(
        room = %join.room.name,
        %participant,
        others = join.other_participants.len(),
        ping_interval = join.ping_interval,
        "joined"
    );
    client.on_ready_for_responses().await?;

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("interrupted, leaving");
                client.send(SignalRequest::Leave(LeaveRequest::default()))?;
                client.close().await?;
                break;
            }
            event = events.recv() => match event {
                Some(SignalEvent::Response(response)) => {
                    tracing::info!(kind = response.kind(), "{response:?}");
                }
                Some(SignalEvent::Closed { reason, can_reconnect: true }) => {
                    tracing::warn!(%reason, "connection lost, reconnecting");
                    client.reconnect(&url, &token, participant.clone()).await?;
                    // No media layer here, so the peer connection is "up" at once.
                    client.on_peer_connection_established().await?;
                }
                Some(SignalEvent::Closed { reason, can_reconnect: false }) => {
                    tracing::info!(%reason, "session ended");
                    break;
                }
                None => break,
            },
        }
    }

    Ok(())
}
