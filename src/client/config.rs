//! Client channel configuration.

use std::time::Duration;

/// Configuration for the client connection manager.
///
/// Covers the endpoint, the credential, the reconnection backoff, and the
/// heartbeat period — the only timers in the subsystem.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// WebSocket endpoint URL.
    pub url: String,

    /// Bearer credential re-announced on every (re)connection.
    pub credential: String,

    /// Connection timeout in milliseconds.
    pub connect_timeout_ms: u64,

    /// Maximum number of reconnection attempts before giving up.
    pub max_reconnect_attempts: u32,

    /// Initial reconnection delay in milliseconds.
    pub reconnect_base_delay_ms: u64,

    /// Maximum reconnection delay in milliseconds.
    pub reconnect_max_delay_ms: u64,

    /// Growth factor for exponential backoff.
    pub backoff_multiplier: f64,

    /// Heartbeat period in milliseconds.
    pub heartbeat_interval_ms: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            credential: String::new(),
            connect_timeout_ms: 10_000,
            max_reconnect_attempts: 10,
            reconnect_base_delay_ms: 1_000,
            reconnect_max_delay_ms: 30_000,
            backoff_multiplier: 2.0,
            heartbeat_interval_ms: 25_000,
        }
    }
}

impl ClientConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_millis(self.heartbeat_interval_ms)
    }

    /// Delay before reconnection attempt number `attempt + 1`:
    /// `min(cap, base * multiplier^attempt)`.
    pub fn reconnect_delay_for(&self, attempt: u32) -> Duration {
        let delay = self.reconnect_base_delay_ms as f64 * self.backoff_multiplier.powi(attempt as i32);
        let capped = delay.min(self.reconnect_max_delay_ms as f64) as u64;
        Duration::from_millis(capped)
    }

    /// Whether another reconnection attempt is allowed.
    pub fn should_reconnect(&self, attempt: u32) -> bool {
        attempt < self.max_reconnect_attempts
    }
}
