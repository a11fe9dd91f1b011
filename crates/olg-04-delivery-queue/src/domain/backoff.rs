//! # Retry Backoff
//!
//! `delay(n) = min(base × 2^(n-1), cap) + U(0, jitter)` for the n-th retry,
//! so the default schedule is 1s, 2s, 4s, 8s, 16s.

use crate::config::DeliveryConfig;
use rand::Rng;
use std::time::Duration;

/// Exponential backoff with a cap and additive jitter.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BackoffPolicy {
    base: Duration,
    cap: Duration,
    jitter: Duration,
}

impl BackoffPolicy {
    /// Build a policy.
    pub fn new(base: Duration, cap: Duration, jitter: Duration) -> Self {
        Self { base, cap, jitter }
    }

    /// Policy described by a delivery config.
    pub fn from_config(config: &DeliveryConfig) -> Self {
        Self::new(
            config.base_delay(),
            config.max_delay(),
            Duration::from_millis(config.jitter_ms),
        )
    }

    /// Delay before the exponential term is jittered.
    pub fn base_delay(&self, retry: u32) -> Duration {
        let exponent = retry.saturating_sub(1).min(31);
        self.base
            .checked_mul(1u32 << exponent)
            .map_or(self.cap, |d| d.min(self.cap))
    }

    /// Wait before the `retry`-th retry (1-based).
    pub fn delay(&self, retry: u32) -> Duration {
        let base = self.base_delay(retry);
        if self.jitter.is_zero() {
            return base;
        }
        let jitter_ms = rand::thread_rng().gen_range(0..=self.jitter.as_millis() as u64);
        base + Duration::from_millis(jitter_ms)
    }
}
