//! # Entity References
//!
//! Audit entries, moderation reports and sync records point at arbitrary
//! domain objects. Instead of an open "content type + object id" pair the
//! federation engine uses a closed set of kinds, so every reference can be
//! resolved through a per-kind lookup table.

use crate::time::Timestamp;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Kinds of domain objects that can be referenced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    /// A platform user.
    User,
    /// A course.
    Course,
    /// A user's enrollment in a course.
    Enrollment,
    /// A learning material attached to a course.
    Material,
    /// A moderation report.
    Report,
    /// A moderation ban.
    Ban,
    /// An appeal against a moderation decision.
    Appeal,
    /// A user notification.
    Notification,
    /// An audit log entry.
    AuditLog,
    /// A federated instance.
    Instance,
    /// A federation message.
    FederationMessage,
    /// A sync session.
    SyncSession,
}

impl EntityKind {
    /// All kinds, in table order.
    pub const ALL: [EntityKind; 12] = [
        EntityKind::User,
        EntityKind::Course,
        EntityKind::Enrollment,
        EntityKind::Material,
        EntityKind::Report,
        EntityKind::Ban,
        EntityKind::Appeal,
        EntityKind::Notification,
        EntityKind::AuditLog,
        EntityKind::Instance,
        EntityKind::FederationMessage,
        EntityKind::SyncSession,
    ];

    /// Stable wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::User => "user",
            EntityKind::Course => "course",
            EntityKind::Enrollment => "enrollment",
            EntityKind::Material => "material",
            EntityKind::Report => "report",
            EntityKind::Ban => "ban",
            EntityKind::Appeal => "appeal",
            EntityKind::Notification => "notification",
            EntityKind::AuditLog => "audit_log",
            EntityKind::Instance => "instance",
            EntityKind::FederationMessage => "federation_message",
            EntityKind::SyncSession => "sync_session",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EntityKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| format!("unknown entity kind '{s}'"))
    }
}

/// Reference to one domain object.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityRef {
    /// What kind of object this is.
    pub kind: EntityKind,
    /// The object's identifier within its kind.
    pub id: String,
}

impl EntityRef {
    /// Create a new reference.
    pub fn new(kind: EntityKind, id: impl Into<String>) -> Self {
        Self {
            kind,
            id: id.into(),
        }
    }
}

impl fmt::Display for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.id)
    }
}

/// One replicated record exchanged by sync sessions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncRecord {
    /// The object this record describes.
    pub entity: EntityRef,
    /// Object fields as a JSON object.
    pub data: serde_json::Value,
    /// Last modification time at the origin; drives last-writer-wins.
    pub updated_at: Timestamp,
}

impl SyncRecord {
    /// Create a new record.
    pub fn new(entity: EntityRef, data: serde_json::Value, updated_at: Timestamp) -> Self {
        Self {
            entity,
            data,
            updated_at,
        }
    }
}

/// Append-only audit entry about a change to some entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditRecord {
    /// Entry id.
    pub id: Uuid,
    /// The entity that changed.
    pub subject: EntityRef,
    /// What happened (`status_changed`, `sync_completed`, ...).
    pub action: String,
    /// Value before the change.
    pub old_value: Option<serde_json::Value>,
    /// Value after the change.
    pub new_value: Option<serde_json::Value>,
    /// When the entry was written.
    pub recorded_at: Timestamp,
}

impl AuditRecord {
    /// Create a new audit entry.
    pub fn new(
        subject: EntityRef,
        action: impl Into<String>,
        old_value: Option<serde_json::Value>,
        new_value: Option<serde_json::Value>,
        recorded_at: Timestamp,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            subject,
            action: action.into(),
            old_value,
            new_value,
            recorded_at,
        }
    }
}
