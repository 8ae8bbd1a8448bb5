use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Shortest grace period before a finished progress indicator is hidden
pub const MIN_HIDE_GRACE_PERIOD_MS: u64 = 2_000;

/// Longest grace period before a finished progress indicator is hidden
pub const MAX_HIDE_GRACE_PERIOD_MS: u64 = 5_000;

/// Tunables of the client core, loaded from `core.yaml`
///
/// These are local to the client; the persisted media settings live in the
/// backend and are described by [`crate::models::Configuration`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    /// How many progress queries to issue per second while polling
    pub poll_rate_hz: u32,

    /// Delay between job completion and hiding the progress indicator
    pub hide_grace_period_ms: u64,

    pub log_dir: String,
    pub log_prefix: String,
    pub debug_mode: bool,
    pub console_logging: bool,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            poll_rate_hz: 60,
            hide_grace_period_ms: MIN_HIDE_GRACE_PERIOD_MS,
            log_dir: "logs".to_string(),
            log_prefix: "add-logo-processor".to_string(),
            debug_mode: false,
            console_logging: false,
        }
    }
}

impl CoreConfig {
    /// Interval between progress queries
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(1) / self.poll_rate_hz.max(1)
    }

    /// Grace period clamped to the supported band
    pub fn hide_grace_period(&self) -> Duration {
        Duration::from_millis(
            self.hide_grace_period_ms
                .clamp(MIN_HIDE_GRACE_PERIOD_MS, MAX_HIDE_GRACE_PERIOD_MS),
        )
    }
}
