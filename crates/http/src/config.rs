//! Runtime configuration for the execution bridge.
//!
//! Every field has a default, so a partial JSON or TOML document is enough:
//!
//! ```
//! use weft_http::config::BridgeConfig;
//!
//! let config = BridgeConfig::default().with_max_in_flight(64);
//! assert_eq!(config.max_in_flight(), 64);
//! ```

use std::time::Duration;

use serde::Deserialize;

use crate::protocol::body::ChannelConfig;

const DEFAULT_MAX_IN_FLIGHT: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    body: ChannelConfig,
    max_in_flight: usize,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self { body: ChannelConfig::default(), max_in_flight: DEFAULT_MAX_IN_FLIGHT }
    }
}

impl BridgeConfig {
    /// Limits applied to each request body channel.
    pub fn body(&self) -> ChannelConfig {
        self.body
    }

    /// Jobs allowed to run or wait for a worker before new requests are rejected.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight
    }

    #[must_use]
    pub fn with_body(mut self, body: ChannelConfig) -> Self {
        self.body = body;
        self
    }

    #[must_use]
    pub fn with_idle_timeout(mut self, timeout: Duration) -> Self {
        self.body = self.body.with_idle_timeout(timeout);
        self
    }

    #[must_use]
    pub fn with_max_queued_bytes(mut self, max_queued_bytes: usize) -> Self {
        self.body = self.body.with_max_queued_bytes(max_queued_bytes);
        self
    }

    #[must_use]
    pub fn with_max_in_flight(mut self, max_in_flight: usize) -> Self {
        self.max_in_flight = max_in_flight.max(1);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = BridgeConfig::default();
        assert_eq!(config.max_in_flight(), 256);
        assert_eq!(config.body().idle_timeout(), Duration::from_secs(120));
        assert_eq!(config.body().max_queued_bytes(), 8 * 1024 * 1024);
    }

    #[test]
    fn partial_document() {
        let config: BridgeConfig = serde_json::from_str(r#"{"max_in_flight": 8, "body": {"idle_timeout_ms": 500}}"#).unwrap();
        assert_eq!(config.max_in_flight(), 8);
        assert_eq!(config.body().idle_timeout(), Duration::from_millis(500));
        assert_eq!(config.body().max_queued_bytes(), 8 * 1024 * 1024);
    }

    #[test]
    fn setters() {
        let config = BridgeConfig::default().with_idle_timeout(Duration::from_secs(1)).with_max_queued_bytes(16).with_max_in_flight(0);
        assert_eq!(config.body().idle_timeout(), Duration::from_secs(1));
        assert_eq!(config.body().max_queued_bytes(), 16);
        assert_eq!(config.max_in_flight(), 1);
    }
}
