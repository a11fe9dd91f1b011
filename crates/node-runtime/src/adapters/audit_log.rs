//! Append-only audit trail.

use parking_lot::RwLock;
use shared_types::{AuditRecord, EntityRef};

/// In-memory audit trail. Entries are never modified or removed.
#[derive(Debug, Default)]
pub struct InMemoryAuditLog {
    entries: RwLock<Vec<AuditRecord>>,
}

impl InMemoryAuditLog {
    /// Create an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one entry.
    pub fn append(&self, record: AuditRecord) {
        self.entries.write().push(record);
    }

    /// All entries, oldest first.
    pub fn entries(&self) -> Vec<AuditRecord> {
        self.entries.read().clone()
    }

    /// Entries about one entity, oldest first.
    pub fn for_subject(&self, subject: &EntityRef) -> Vec<AuditRecord> {
        self.entries
            .read()
            .iter()
            .filter(|r| &r.subject == subject)
            .cloned()
            .collect()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Whether the log is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}
