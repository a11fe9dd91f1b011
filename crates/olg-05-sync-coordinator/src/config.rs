//! # Sync Coordinator Configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Sync coordinator and inbound processor configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Records requested per page, and the most served per inbound page.
    pub batch_size: u32,

    /// How long a session waits for one page's response, including the
    /// delivery queue's retries.
    pub response_timeout_secs: u64,

    /// Only sync with instances a moderator marked trusted.
    pub require_trusted_peers: bool,

    /// Oldest inbound envelope accepted, by `created_at`.
    pub replay_max_age_secs: u64,

    /// How far in the future an inbound `created_at` may be.
    pub replay_future_skew_secs: u64,

    /// Seconds between scheduled incremental syncs with every active
    /// peer. `0` leaves syncing to explicit calls.
    pub interval_secs: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            batch_size: 100,
            response_timeout_secs: 300,
            require_trusted_peers: false,
            replay_max_age_secs: 600,
            replay_future_skew_secs: 30,
            interval_secs: 0,
        }
    }
}

impl SyncConfig {
    /// Small pages so paging paths run in tests.
    pub fn for_testing() -> Self {
        Self {
            batch_size: 2,
            ..Self::default()
        }
    }

    /// Per-page response timeout.
    pub fn response_timeout(&self) -> Duration {
        Duration::from_secs(self.response_timeout_secs)
    }

    /// Period of scheduled syncs, if enabled.
    pub fn schedule_interval(&self) -> Option<Duration> {
        (self.interval_secs > 0).then(|| Duration::from_secs(self.interval_secs))
    }
}
