//! Live channel and dashboard refresh configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::default_true;

/// Live WebSocket channel configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RealtimeConfig {
    /// Disable to run on REST polling only.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Explicit WebSocket origin (e.g. `wss://fleet.example.com`).
    /// Derived from `api.base_url` when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ws_url: Option<String>,

    #[serde(default = "default_max_reconnect_attempts")]
    pub max_reconnect_attempts: u32,

    /// Delay before the first retry; doubles on each further retry.
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,

    /// Bound on one connect attempt, handshake included. Expiry counts as a
    /// failed attempt.
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ws_url: None,
            max_reconnect_attempts: default_max_reconnect_attempts(),
            base_delay_ms: default_base_delay_ms(),
            connect_timeout_ms: default_connect_timeout_ms(),
        }
    }
}

impl RealtimeConfig {
    pub fn base_delay(&self) -> Duration {
        Duration::from_millis(self.base_delay_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }
}

fn default_max_reconnect_attempts() -> u32 {
    5
}

fn default_base_delay_ms() -> u64 {
    1000
}

fn default_connect_timeout_ms() -> u64 {
    10_000
}

/// Driver dashboard configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriverConfig {
    #[serde(default = "default_report_interval")]
    pub report_interval_seconds: u64,

    #[serde(default = "default_history_limit")]
    pub history_limit: usize,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            report_interval_seconds: default_report_interval(),
            history_limit: default_history_limit(),
        }
    }
}

impl DriverConfig {
    pub fn report_interval(&self) -> Duration {
        Duration::from_secs(self.report_interval_seconds)
    }
}

/// Admin dashboard configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminConfig {
    /// Polling period used while the live channel is down.
    #[serde(default = "default_poll_interval")]
    pub poll_interval_seconds: u64,

    #[serde(default = "default_history_limit")]
    pub history_limit: usize,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            poll_interval_seconds: default_poll_interval(),
            history_limit: default_history_limit(),
        }
    }
}

impl AdminConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_seconds)
    }
}

fn default_report_interval() -> u64 {
    5
}

fn default_poll_interval() -> u64 {
    10
}

fn default_history_limit() -> usize {
    20
}
