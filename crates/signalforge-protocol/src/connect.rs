//! Signal connect URLs.
//!
//! Joining and resuming both open a WebSocket to `<server>/rtc`; the mode and
//! client capabilities travel as query parameters next to the access token.

use url::Url;

use crate::{ParticipantSid, ProtocolError};

/// Signal protocol revision this client speaks.
pub const PROTOCOL_VERSION: u32 = 9;

/// Which handshake a connect URL is for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectMode {
    /// Start a new session.
    Join,
    /// Resume the session of an existing participant.
    Reconnect { participant_sid: ParticipantSid },
}

/// Client capabilities sent with every connect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectOptions {
    /// Subscribe to every published track automatically.
    pub auto_subscribe: bool,
    /// Let the server adapt stream quality to the rendered size.
    pub adaptive_stream: bool,
    /// Protocol revision; defaults to [`PROTOCOL_VERSION`].
    pub protocol_version: u32,
    /// SDK name reported to the server.
    pub sdk: String,
    /// SDK version reported to the server.
    pub sdk_version: String,
}

impl Default for ConnectOptions {
    fn default() -> Self {
        Self {
            auto_subscribe: true,
            adaptive_stream: false,
            protocol_version: PROTOCOL_VERSION,
            sdk: "rust".to_owned(),
            sdk_version: env!("CARGO_PKG_VERSION").to_owned(),
        }
    }
}

impl ConnectOptions {
    #[must_use]
    pub fn with_auto_subscribe(mut self, auto_subscribe: bool) -> Self {
        self.auto_subscribe = auto_subscribe;
        self
    }

    #[must_use]
    pub fn with_adaptive_stream(mut self, adaptive_stream: bool) -> Self {
        self.adaptive_stream = adaptive_stream;
        self
    }

    #[must_use]
    pub fn with_sdk(
        mut self,
        sdk: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        self.sdk = sdk.into();
        self.sdk_version = version.into();
        self
    }

    /// Builds the WebSocket URL for a handshake.
    ///
    /// `http`/`https` servers are mapped to `ws`/`wss`. Any path on the
    /// server URL is kept and `/rtc` is appended to it.
    ///
    /// # Errors
    /// Returns [`ProtocolError::InvalidUrl`] if `server` does not parse or
    /// uses a scheme other than http(s)/ws(s).
    pub fn signal_url(
        &self,
        server: &str,
        token: &str,
        mode: &ConnectMode,
    ) -> Result<String, ProtocolError> {
        let invalid = |reason: &str| ProtocolError::InvalidUrl {
            url: server.to_owned(),
            reason: reason.to_owned(),
        };

        let mut url = Url::parse(server).map_err(|e| invalid(&e.to_string()))?;
        let scheme = match url.scheme() {
            "http" | "ws" => "ws",
            "https" | "wss" => "wss",
            _ => return Err(invalid("scheme must be http, https, ws or wss")),
        };
        url.set_scheme(scheme)
            .map_err(|()| invalid("cannot change scheme"))?;

        let path = format!("{}/rtc", url.path().trim_end_matches('/'));
        url.set_path(&path);
        url.set_query(None);

        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("access_token", token)
                .append_pair("auto_subscribe", flag(self.auto_subscribe))
                .append_pair("adaptive_stream", flag(self.adaptive_stream))
                .append_pair("protocol", &self.protocol_version.to_string())
                .append_pair("sdk", &self.sdk)
                .append_pair("version", &self.sdk_version);
            if let ConnectMode::Reconnect { participant_sid } = mode {
                query
                    .append_pair("reconnect", "1")
                    .append_pair("sid", &participant_sid.0);
            }
        }

        Ok(url.into())
    }
}

fn flag(value: bool) -> &'static str {
    if value { "1" } else { "0" }
}
