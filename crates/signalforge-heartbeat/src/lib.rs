//! Application-level ping/pong liveness monitor for Signalforge.
//!
//! The transport does not notice every dead connection (half-open sockets
//! stay "open" forever). The server therefore announces a ping interval and
//! a ping timeout in its join response, and the client pings on that interval
//! and gives up when no pong has arrived for a full timeout.
//!
//! # Disabled mode
//!
//! When either value is absent or zero the monitor stays
//! [`HeartbeatState::Idle`] and [`HeartbeatMonitor::next_event`] pends
//! forever.
//!
//! # Integration
//!
//! The monitor sits inside the connection task's `tokio::select!` loop:
//!
//! ```ignore
//! loop {
//!     tokio::select! {
//!         Some(cmd) = cmd_rx.recv() => { /* handle commands */ }
//!         event = heartbeat.next_event() => match event {
//!             HeartbeatEvent::Ping(ping) => { /* send it */ }
//!             HeartbeatEvent::TimedOut { .. } => { /* force-close */ }
//!         }
//!     }
//! }
//! ```

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use rand::Rng;
use signalforge_protocol::{PingRequest, Pong};
use tokio::time::{self, Instant};
use tracing::{debug, trace, warn};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Heartbeat parameters for one connection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeartbeatConfig {
    /// Time between pings. `None` disables the heartbeat.
    pub ping_interval: Option<Duration>,
    /// Time without a pong after which the connection is dead. `None`
    /// disables the heartbeat.
    pub ping_timeout: Option<Duration>,
    /// Upper bound of random delay added to the first ping. Zero by default.
    pub first_ping_jitter: Duration,
}

impl HeartbeatConfig {
    /// Builds a config from the whole-second values servers send, where 0
    /// means "not configured".
    pub fn from_secs(ping_interval: u32, ping_timeout: u32) -> Self {
        Self {
            ping_interval: Some(Duration::from_secs(u64::from(ping_interval))),
            ping_timeout: Some(Duration::from_secs(u64::from(ping_timeout))),
            first_ping_jitter: Duration::ZERO,
        }
        .validated()
    }

    pub fn with_jitter(mut self, jitter: Duration) -> Self {
        self.first_ping_jitter = jitter;
        self
    }

    /// Normalizes zero durations to `None`.
    ///
    /// Called automatically by [`HeartbeatMonitor::start`].
    pub fn validated(mut self) -> Self {
        self.ping_interval = self.ping_interval.filter(|d| !d.is_zero());
        self.ping_timeout = self.ping_timeout.filter(|d| !d.is_zero());
        if let (Some(interval), Some(timeout)) = (self.ping_interval, self.ping_timeout) {
            if timeout < interval {
                warn!(
                    ?interval,
                    ?timeout,
                    "ping timeout shorter than ping interval, connection will time out between pings"
                );
            }
        }
        self
    }

    /// Whether both values are present.
    pub fn is_enabled(&self) -> bool {
        self.ping_interval.is_some() && self.ping_timeout.is_some()
    }
}

// ---------------------------------------------------------------------------
// State and events
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HeartbeatState {
    /// Not monitoring: never started, stopped, or disabled by config.
    #[default]
    Idle,
    /// Pinging and watching for pongs.
    Active,
    /// No pong within the timeout. Terminal until the next `start`.
    TimedOut,
}

/// What the monitor wants the connection task to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeartbeatEvent {
    /// Send this ping on the current transport.
    Ping(PingRequest),
    /// The connection is considered dead.
    TimedOut {
        /// Time since the last pong (or since the monitor was armed).
        since_last_pong: Duration,
    },
}

// ---------------------------------------------------------------------------
// Monitor
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
struct Armed {
    interval: Duration,
    timeout: Duration,
}

#[derive(Debug, Clone, Copy)]
struct SentPing {
    timestamp: i64,
    at: Instant,
}

/// Ping scheduler and pong deadline for one connection.
#[derive(Debug, Default)]
pub struct HeartbeatMonitor {
    state: HeartbeatState,
    armed: Option<Armed>,
    next_ping: Option<Instant>,
    last_pong: Option<Instant>,
    last_ping: Option<SentPing>,
    rtt: Option<Duration>,
    pings_sent: u64,
}

impl HeartbeatMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arms the monitor for a freshly established connection.
    ///
    /// Replaces any previous schedule. The pong deadline is measured from
    /// now; the first ping is due one interval from now plus jitter.
    pub fn start(&mut self, config: HeartbeatConfig) {
        let config = config.validated();
        self.stop();

        let (Some(interval), Some(timeout)) = (config.ping_interval, config.ping_timeout)
        else {
            debug!("heartbeat disabled for this connection");
            return;
        };

        let jitter = if config.first_ping_jitter.is_zero() {
            Duration::ZERO
        } else {
            let max = config.first_ping_jitter.as_millis() as u64;
            Duration::from_millis(rand::rng().random_range(0..=max))
        };

        let now = Instant::now();
        self.armed = Some(Armed { interval, timeout });
        self.next_ping = Some(now + interval + jitter);
        self.last_pong = Some(now);
        self.state = HeartbeatState::Active;

        debug!(?interval, ?timeout, ?jitter, "heartbeat started");
    }

    /// Cancels monitoring. Idempotent.
    pub fn stop(&mut self) {
        if self.state == HeartbeatState::Active {
            debug!(pings = self.pings_sent, "heartbeat stopped");
        }
        self.state = HeartbeatState::Idle;
        self.armed = None;
        self.next_ping = None;
        self.last_pong = None;
        self.last_ping = None;
    }

    /// Waits for the next heartbeat action.
    ///
    /// Pends forever unless [`HeartbeatState::Active`]. Cancel-safe: no state
    /// changes until the sleep has completed.
    pub async fn next_event(&mut self) -> HeartbeatEvent {
        let (armed, next_ping, last_pong) = match (self.armed, self.next_ping, self.last_pong) {
            (Some(armed), Some(next), Some(pong)) if self.state == HeartbeatState::Active => {
                (armed, next, pong)
            }
            _ => {
                std::future::pending::<()>().await;
                unreachable!()
            }
        };

        let deadline = last_pong + armed.timeout;
        time::sleep_until(deadline.min(next_ping)).await;

        let now = Instant::now();
        if now >= deadline {
            let since_last_pong = now.saturating_duration_since(last_pong);
            self.state = HeartbeatState::TimedOut;
            self.next_ping = None;
            warn!(?since_last_pong, timeout = ?armed.timeout, "no pong within timeout");
            return HeartbeatEvent::TimedOut { since_last_pong };
        }

        let timestamp = unix_millis();
        self.next_ping = Some(next_ping + armed.interval);
        self.last_ping = Some(SentPing { timestamp, at: now });
        self.pings_sent += 1;
        trace!(timestamp, ping = self.pings_sent, "ping due");

        HeartbeatEvent::Ping(PingRequest {
            timestamp,
            rtt: self.rtt.map_or(0, |d| d.as_millis() as i64),
        })
    }

    /// Records a pong from the server. Ignored unless active.
    pub fn record_pong(&mut self, pong: &Pong) {
        if self.state != HeartbeatState::Active {
            trace!("pong while heartbeat inactive, ignoring");
            return;
        }
        let now = Instant::now();
        self.last_pong = Some(now);

        if let Some(sent) = self.last_ping {
            if sent.timestamp == pong.last_ping_timestamp {
                let rtt = now.saturating_duration_since(sent.at);
                self.rtt = Some(rtt);
                trace!(?rtt, "pong");
            }
        }
    }

    pub fn state(&self) -> HeartbeatState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.state == HeartbeatState::Active
    }

    /// Last measured round-trip time, if any pong echoed a ping we sent.
    pub fn rtt(&self) -> Option<Duration> {
        self.rtt
    }

    /// Total pings produced over the monitor's lifetime.
    pub fn pings_sent(&self) -> u64 {
        self.pings_sent
    }
}

fn unix_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_millis() as i64)
}
