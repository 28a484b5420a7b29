//! Types exchanged with the reactor when a request is promoted to a websocket.
//!
//! The frame codec lives outside this crate. The core only decides whether to upgrade and
//! hands the reactor an application [`WebSocket`] together with the negotiated settings.

use std::fmt;
use std::time::Duration;

use bytes::Bytes;
use http::HeaderMap;
use serde::Deserialize;

use crate::handler::HandlerError;

/// Outbound side of an established websocket, provided by the frame codec.
pub trait WebSocketSession: Send {
    fn send_text(&mut self, message: &str) -> Result<(), HandlerError>;

    fn send_binary(&mut self, message: Bytes) -> Result<(), HandlerError>;

    fn close(&mut self, code: u16, reason: &str) -> Result<(), HandlerError>;
}

/// Application callbacks for a websocket connection.
///
/// Every callback has a no-op default so implementors only override what they use.
pub trait WebSocket: Send {
    fn on_connect(&mut self, _session: Box<dyn WebSocketSession>) -> Result<(), HandlerError> {
        Ok(())
    }

    fn on_text(&mut self, _message: &str) -> Result<(), HandlerError> {
        Ok(())
    }

    fn on_binary(&mut self, _message: Bytes) -> Result<(), HandlerError> {
        Ok(())
    }

    fn on_close(&mut self, _code: u16, _reason: &str) -> Result<(), HandlerError> {
        Ok(())
    }

    fn on_error(&mut self, _cause: HandlerError) {}
}

const DEFAULT_IDLE_READ_TIMEOUT_MS: u64 = 5 * 60 * 1000;
const DEFAULT_PING_INTERVAL_MS: u64 = 30 * 1000;
const DEFAULT_MAX_FRAME_PAYLOAD_LENGTH: usize = 65536;

/// Connection settings applied by the frame codec after the handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct WebSocketSettings {
    idle_read_timeout_ms: u64,
    ping_interval_ms: u64,
    max_frame_payload_length: usize,
}

impl Default for WebSocketSettings {
    fn default() -> Self {
        Self {
            idle_read_timeout_ms: DEFAULT_IDLE_READ_TIMEOUT_MS,
            ping_interval_ms: DEFAULT_PING_INTERVAL_MS,
            max_frame_payload_length: DEFAULT_MAX_FRAME_PAYLOAD_LENGTH,
        }
    }
}

impl WebSocketSettings {
    /// Closes the connection if no frame arrives in this window
    pub fn idle_read_timeout(&self) -> Duration {
        Duration::from_millis(self.idle_read_timeout_ms)
    }

    /// Sends a ping after this long without outbound frames
    pub fn ping_interval(&self) -> Duration {
        Duration::from_millis(self.ping_interval_ms)
    }

    pub fn max_frame_payload_length(&self) -> usize {
        self.max_frame_payload_length
    }

    #[must_use]
    pub fn with_idle_read_timeout(mut self, timeout: Duration) -> Self {
        self.idle_read_timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    #[must_use]
    pub fn with_ping_interval(mut self, interval: Duration) -> Self {
        self.ping_interval_ms = u64::try_from(interval.as_millis()).unwrap_or(u64::MAX);
        self
    }

    #[must_use]
    pub fn with_max_frame_payload_length(mut self, length: usize) -> Self {
        self.max_frame_payload_length = length;
        self
    }
}

/// Everything the reactor needs to switch a connection into websocket mode.
pub struct WebSocketUpgrade {
    pub socket: Box<dyn WebSocket>,
    pub headers: HeaderMap,
    pub settings: WebSocketSettings,
}

impl fmt::Debug for WebSocketUpgrade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WebSocketUpgrade").field("headers", &self.headers).field("settings", &self.settings).finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settings_load_from_json() {
        let settings: WebSocketSettings = serde_json::from_str(r#"{"ping_interval_ms": 1000}"#).unwrap();
        assert_eq!(settings.ping_interval(), Duration::from_secs(1));
        assert_eq!(settings.idle_read_timeout(), Duration::from_secs(300));
        assert_eq!(settings.max_frame_payload_length(), 65536);
    }
}
