//! # Time-Bounded Replay Guard
//!
//! Inbound envelopes are accepted only if `created_at` falls inside
//! `[now - max_age, now + future_skew]` and the envelope id has not been
//! seen within that window. Ids are forgotten once they could no longer
//! pass the timestamp check, which bounds memory.
//!
//! The timestamp check runs first so a stale envelope never touches the
//! id cache.

use chrono::Duration;
use parking_lot::Mutex;
use shared_types::{MessageId, Timestamp};
use std::collections::HashMap;
use thiserror::Error;

/// Replay rejections.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ReplayError {
    /// Envelope id already accepted.
    #[error("Envelope {0} was already processed")]
    Reused(MessageId),

    /// `created_at` is older than the window.
    #[error("Envelope created at {created_at} is older than {threshold}")]
    TooOld {
        /// Envelope timestamp.
        created_at: Timestamp,
        /// Oldest accepted timestamp.
        threshold: Timestamp,
    },

    /// `created_at` is too far in the future.
    #[error("Envelope created at {created_at} is later than {threshold}")]
    FromFuture {
        /// Envelope timestamp.
        created_at: Timestamp,
        /// Latest accepted timestamp.
        threshold: Timestamp,
    },
}

struct SeenIds {
    ids: HashMap<MessageId, Timestamp>,
    last_gc: Option<Timestamp>,
}

/// Cache of recently accepted envelope ids.
pub struct ReplayGuard {
    seen: Mutex<SeenIds>,
    max_age: Duration,
    future_skew: Duration,
    gc_interval: Duration,
}

impl ReplayGuard {
    /// Garbage-collection interval.
    pub const GC_INTERVAL_SECS: i64 = 30;

    /// Create a guard with the given window, in seconds.
    pub fn new(max_age_secs: u64, future_skew_secs: u64) -> Self {
        Self {
            seen: Mutex::new(SeenIds {
                ids: HashMap::new(),
                last_gc: None,
            }),
            max_age: Duration::seconds(max_age_secs as i64),
            future_skew: Duration::seconds(future_skew_secs as i64),
            gc_interval: Duration::seconds(Self::GC_INTERVAL_SECS),
        }
    }

    /// Validate the timestamp, then check and record the id atomically.
    pub fn check_and_record(
        &self,
        id: MessageId,
        created_at: Timestamp,
        now: Timestamp,
    ) -> Result<(), ReplayError> {
        let oldest = now - self.max_age;
        let latest = now + self.future_skew;
        if created_at < oldest {
            return Err(ReplayError::TooOld {
                created_at,
                threshold: oldest,
            });
        }
        if created_at > latest {
            return Err(ReplayError::FromFuture {
                created_at,
                threshold: latest,
            });
        }

        let mut seen = self.seen.lock();
        if seen.last_gc.map_or(true, |at| now - at > self.gc_interval) {
            seen.ids.retain(|_, at| *at >= oldest);
            seen.last_gc = Some(now);
        }

        if seen.ids.contains_key(&id) {
            return Err(ReplayError::Reused(id));
        }
        seen.ids.insert(id, created_at);
        Ok(())
    }

    /// Drop an id recorded by an attempt that failed before it was
    /// handled, so the sender's retry is accepted.
    pub fn forget(&self, id: MessageId) {
        self.seen.lock().ids.remove(&id);
    }

    /// Ids currently remembered.
    pub fn len(&self) -> usize {
        self.seen.lock().ids.len()
    }

    /// Whether no id is remembered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
