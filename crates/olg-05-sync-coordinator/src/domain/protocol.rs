//! # Sync Wire Protocol
//!
//! Payloads carried in `sync_request` / `sync_response` envelopes.
//!
//! A pull asks the peer for one page of records changed after `since`,
//! continuing from `cursor`. A push carries one page of local records; the
//! peer applies them and reports what it accepted. Each page is one signed
//! request and one signed response.

use serde::{Deserialize, Serialize};
use shared_types::{EntityRef, SessionId, SyncRecord, SyncType, Timestamp};

/// Envelope subject of pull requests.
pub const SUBJECT_PULL: &str = "sync.pull";

/// Envelope subject of push requests.
pub const SUBJECT_PUSH: &str = "sync.push";

/// Direction of a sync page, from the initiator's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncDirection {
    /// Initiator receives records.
    Pull,
    /// Initiator sends records.
    Push,
}

impl SyncDirection {
    /// Key under `data_synced` and envelope subject.
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncDirection::Pull => "pull",
            SyncDirection::Push => "push",
        }
    }

    /// Envelope subject for requests in this direction.
    pub fn subject(&self) -> &'static str {
        match self {
            SyncDirection::Pull => SUBJECT_PULL,
            SyncDirection::Push => SUBJECT_PUSH,
        }
    }
}

/// Payload of a `sync_request`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncRequestPayload {
    /// Initiator's session id, echoed in the response.
    pub session_id: SessionId,
    /// Session type, informational for the peer.
    pub sync_type: SyncType,
    /// Pull or push.
    pub direction: SyncDirection,
    /// Only records with `updated_at` after this; `None` replays everything.
    #[serde(default)]
    pub since: Option<Timestamp>,
    /// Opaque continuation token from the previous page.
    #[serde(default)]
    pub cursor: Option<String>,
    /// Page size the initiator wants.
    pub limit: u32,
    /// Records being pushed; empty for pulls.
    #[serde(default)]
    pub records: Vec<SyncRecord>,
}

/// A pushed record the receiver could not apply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordRejection {
    /// The record.
    pub entity: EntityRef,
    /// Why it was refused.
    pub reason: String,
}

/// Payload of a `sync_response`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct SyncResponsePayload {
    /// Session id from the request.
    pub session_id: SessionId,
    /// Pulled records.
    #[serde(default)]
    pub records: Vec<SyncRecord>,
    /// Continuation token; `None` on the last page.
    #[serde(default)]
    pub next_cursor: Option<String>,
    /// Pushed records applied by the receiver.
    #[serde(default)]
    pub accepted: u64,
    /// Pushed records the receiver already had in a newer version.
    #[serde(default)]
    pub skipped: u64,
    /// Pushed records the receiver refused.
    #[serde(default)]
    pub rejected: Vec<RecordRejection>,
}
