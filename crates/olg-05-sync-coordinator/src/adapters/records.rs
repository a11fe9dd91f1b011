//! In-memory record store with one table per entity kind.
//!
//! Cursors are `"<updated_at rfc3339>|<kind>|<id>"`, the sort key of the
//! last record on the previous page. Paging is by key, so records written
//! between pages do not shift later pages.

use crate::ports::outbound::{ApplyOutcome, RecordPage, RecordSink, RecordSource, SyncStoreError};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use parking_lot::RwLock;
use shared_types::{EntityKind, EntityRef, SyncRecord, Timestamp};
use std::collections::{BTreeMap, HashMap};

type SortKey = (Timestamp, EntityKind, String);

fn sort_key(record: &SyncRecord) -> SortKey {
    (record.updated_at, record.entity.kind, record.entity.id.clone())
}

fn encode_cursor(key: &SortKey) -> String {
    format!(
        "{}|{}|{}",
        key.0.to_rfc3339_opts(SecondsFormat::AutoSi, true),
        key.1,
        key.2
    )
}

fn decode_cursor(cursor: &str) -> Result<SortKey, SyncStoreError> {
    let invalid = || SyncStoreError::InvalidCursor(cursor.to_string());
    let mut parts = cursor.splitn(3, '|');
    let (Some(at), Some(kind), Some(id)) = (parts.next(), parts.next(), parts.next()) else {
        return Err(invalid());
    };
    let at = DateTime::parse_from_rfc3339(at)
        .map_err(|_| invalid())?
        .with_timezone(&Utc);
    let kind = kind.parse::<EntityKind>().map_err(|_| invalid())?;
    Ok((at, kind, id.to_string()))
}

/// Records keyed by kind, then id.
#[derive(Default)]
pub struct InMemoryRecordStore {
    tables: RwLock<BTreeMap<EntityKind, HashMap<String, SyncRecord>>>,
}

impl InMemoryRecordStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Write a local change unconditionally.
    pub fn upsert(&self, record: SyncRecord) {
        self.tables
            .write()
            .entry(record.entity.kind)
            .or_default()
            .insert(record.entity.id.clone(), record);
    }

    /// Look up one record.
    pub fn get(&self, entity: &EntityRef) -> Option<SyncRecord> {
        self.tables
            .read()
            .get(&entity.kind)
            .and_then(|table| table.get(&entity.id))
            .cloned()
    }

    /// Records of one kind.
    pub fn count(&self, kind: EntityKind) -> usize {
        self.tables.read().get(&kind).map_or(0, HashMap::len)
    }

    /// Total records.
    pub fn len(&self) -> usize {
        self.tables.read().values().map(HashMap::len).sum()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl RecordSource for InMemoryRecordStore {
    async fn changed_since(
        &self,
        since: Option<Timestamp>,
        cursor: Option<&str>,
        limit: usize,
    ) -> Result<RecordPage, SyncStoreError> {
        let after = cursor.map(decode_cursor).transpose()?;
        let limit = limit.max(1);

        let mut matching: Vec<SyncRecord> = self
            .tables
            .read()
            .values()
            .flat_map(HashMap::values)
            .filter(|r| since.map_or(true, |s| r.updated_at > s))
            .filter(|r| after.as_ref().map_or(true, |a| sort_key(r) > *a))
            .cloned()
            .collect();
        matching.sort_by_key(sort_key);

        let has_more = matching.len() > limit;
        matching.truncate(limit);
        let next_cursor = if has_more {
            matching.last().map(|r| encode_cursor(&sort_key(r)))
        } else {
            None
        };
        Ok(RecordPage {
            records: matching,
            next_cursor,
        })
    }
}

#[async_trait]
impl RecordSink for InMemoryRecordStore {
    async fn apply(&self, record: SyncRecord) -> Result<ApplyOutcome, SyncStoreError> {
        if !record.data.is_object() {
            return Err(SyncStoreError::InvalidRecord(format!(
                "{}: data must be a JSON object",
                record.entity
            )));
        }
        if record.entity.id.trim().is_empty() {
            return Err(SyncStoreError::InvalidRecord("record id is empty".into()));
        }

        let mut tables = self.tables.write();
        let table = tables.entry(record.entity.kind).or_default();
        if let Some(existing) = table.get(&record.entity.id) {
            if existing.updated_at >= record.updated_at {
                return Ok(ApplyOutcome::Skipped);
            }
        }
        table.insert(record.entity.id.clone(), record);
        Ok(ApplyOutcome::Applied)
    }
}
