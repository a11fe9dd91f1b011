//! # Delivery Queue Configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Delivery queue configuration.
///
/// Delays are in milliseconds so the section reads naturally in TOML.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeliveryConfig {
    /// Retries after the first attempt before a message is failed.
    pub max_retries: u32,

    /// Delay before the first retry; doubles on each further retry.
    pub base_delay_ms: u64,

    /// Ceiling on the doubled delay.
    pub max_delay_ms: u64,

    /// Upper bound of the uniform random delay added to each wait.
    pub jitter_ms: u64,

    /// Timeout for a single transport attempt.
    pub request_timeout_ms: u64,
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            max_retries: 5,
            base_delay_ms: 1_000,
            max_delay_ms: 60_000,
            jitter_ms: 250,
            request_timeout_ms: 30_000,
        }
    }
}

impl DeliveryConfig {
    /// Deterministic schedule for tests: no jitter.
    pub fn for_testing() -> Self {
        Self {
            jitter_ms: 0,
            ..Self::default()
        }
    }

    /// Base retry delay.
    pub fn base_delay(&self) -> Duration {
        Duration::from_millis(self.base_delay_ms)
    }

    /// Maximum retry delay before jitter.
    pub fn max_delay(&self) -> Duration {
        Duration::from_millis(self.max_delay_ms)
    }

    /// Per-attempt transport timeout.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}
