//! # Outbound Ports (Driven Ports / SPI)
//!
//! - [`RecordSource`]: local records to serve or push
//! - [`RecordSink`]: applies records received from peers
//! - [`SessionStore`]: sync session persistence

use async_trait::async_trait;
use shared_types::{InstanceId, SessionId, SyncRecord, SyncSession, SyncType, Timestamp};
use thiserror::Error;

/// Record or session persistence failure.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SyncStoreError {
    /// Continuation token is not one this store issued.
    #[error("invalid cursor '{0}'")]
    InvalidCursor(String),

    /// Record cannot be stored.
    #[error("invalid record: {0}")]
    InvalidRecord(String),

    /// Backend failure.
    #[error("backend error: {0}")]
    Backend(String),
}

/// One page of records in `(updated_at, kind, id)` order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RecordPage {
    /// Records of this page.
    pub records: Vec<SyncRecord>,
    /// Token for the next page; `None` when exhausted.
    pub next_cursor: Option<String>,
}

/// Result of applying one incoming record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// Stored: new, or newer than the local copy.
    Applied,
    /// Local copy is as new or newer; nothing changed.
    Skipped,
}

/// Source of local records.
#[async_trait]
pub trait RecordSource: Send + Sync {
    /// Records with `updated_at > since` (all if `None`), resuming after
    /// `cursor`, at most `limit` of them.
    async fn changed_since(
        &self,
        since: Option<Timestamp>,
        cursor: Option<&str>,
        limit: usize,
    ) -> Result<RecordPage, SyncStoreError>;
}

/// Destination for records received from peers.
#[async_trait]
pub trait RecordSink: Send + Sync {
    /// Apply with last-writer-wins on `updated_at`.
    async fn apply(&self, record: SyncRecord) -> Result<ApplyOutcome, SyncStoreError>;
}

/// Sync session persistence.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Insert or replace by session id.
    async fn save(&self, session: &SyncSession) -> Result<(), SyncStoreError>;

    /// Fetch by id.
    async fn get(&self, id: SessionId) -> Result<Option<SyncSession>, SyncStoreError>;

    /// Most recent `completed` session for an instance, by `started_at`,
    /// optionally restricted to one sync type.
    async fn last_completed(
        &self,
        instance: InstanceId,
        sync_type: Option<SyncType>,
    ) -> Result<Option<SyncSession>, SyncStoreError>;

    /// Sessions for an instance, newest first.
    async fn list_for_instance(&self, instance: InstanceId) -> Result<Vec<SyncSession>, SyncStoreError>;
}
