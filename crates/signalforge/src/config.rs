//! Client configuration.

use std::time::Duration;

use signalforge_protocol::ConnectOptions;

/// Configuration for a [`SignalClient`](crate::SignalClient).
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Capabilities sent in every connect URL.
    pub connect: ConnectOptions,

    /// How long `join`/`reconnect` wait for the server's answer. `None`
    /// waits until the transport closes.
    pub handshake_timeout: Option<Duration>,

    /// Upper bound of random delay added to the first heartbeat ping, to
    /// spread out clients that connect at the same instant. Zero disables.
    pub first_ping_jitter: Duration,

    /// Capacity of the command channel between handle and connection task.
    pub command_buffer: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            connect: ConnectOptions::default(),
            handshake_timeout: Some(Duration::from_secs(10)),
            first_ping_jitter: Duration::ZERO,
            command_buffer: 64,
        }
    }
}

impl ClientConfig {
    pub fn with_connect_options(mut self, connect: ConnectOptions) -> Self {
        self.connect = connect;
        self
    }

    pub fn with_handshake_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.handshake_timeout = timeout;
        self
    }

    pub fn with_first_ping_jitter(mut self, jitter: Duration) -> Self {
        self.first_ping_jitter = jitter;
        self
    }

    pub fn with_command_buffer(mut self, size: usize) -> Self {
        self.command_buffer = size;
        self
    }

    /// Fixes values that would make the client unusable.
    ///
    /// Called automatically by [`SignalClient::start`](crate::SignalClient::start).
    pub fn validated(mut self) -> Self {
        if self.command_buffer == 0 {
            tracing::warn!("command_buffer of 0 is not allowed, using 1");
            self.command_buffer = 1;
        }
        if self.handshake_timeout.is_some_and(|t| t.is_zero()) {
            tracing::warn!("zero handshake timeout disables the timeout");
            self.handshake_timeout = None;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = ClientConfig::default();
        assert_eq!(cfg.handshake_timeout, Some(Duration::from_secs(10)));
        assert_eq!(cfg.first_ping_jitter, Duration::ZERO);
        assert!(cfg.connect.auto_subscribe);
    }

    #[test]
    fn test_validated_fixes_zero_values() {
        let cfg = ClientConfig::default()
            .with_command_buffer(0)
            .with_handshake_timeout(Some(Duration::ZERO))
            .validated();
        assert_eq!(cfg.command_buffer, 1);
        assert_eq!(cfg.handshake_timeout, None);
    }
}
