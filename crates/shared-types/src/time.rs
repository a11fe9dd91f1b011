//! # Time Source
//!
//! Lifecycle timestamps (`created_at`, `last_seen`, `started_at`, ...) are
//! stamped through this port instead of reading the clock directly.

use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;

/// UTC timestamp used across the federation domain.
pub type Timestamp = DateTime<Utc>;

/// Abstract interface for time.
pub trait TimeSource: Send + Sync {
    /// Get the current timestamp.
    fn now(&self) -> Timestamp;
}

/// Wall-clock time source.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemTimeSource;

impl TimeSource for SystemTimeSource {
    fn now(&self) -> Timestamp {
        Utc::now()
    }
}

/// Manually driven clock for tests and replays.
#[derive(Debug)]
pub struct ManualTimeSource {
    now: RwLock<Timestamp>,
}

impl ManualTimeSource {
    /// Create a clock frozen at `start`.
    pub fn new(start: Timestamp) -> Self {
        Self {
            now: RwLock::new(start),
        }
    }

    /// Move the clock to `at`.
    pub fn set(&self, at: Timestamp) {
        *self.now.write() = at;
    }

    /// Advance the clock by `by`.
    pub fn advance(&self, by: Duration) {
        let mut now = self.now.write();
        *now += by;
    }
}

impl TimeSource for ManualTimeSource {
    fn now(&self) -> Timestamp {
        *self.now.read()
    }
}
