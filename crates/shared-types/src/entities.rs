//! # Domain Entities
//!
//! Instances, federation messages and sync sessions, with the lifecycle
//! rules each one enforces.

use crate::entity_ref::EntityRef;
use crate::envelope::Envelope;
use crate::errors::TransitionError;
use crate::time::Timestamp;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            /// Generate a fresh random id.
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(s).map(Self)
            }
        }
    };
}

uuid_id!(
    /// Registry identifier of an instance.
    InstanceId
);
uuid_id!(
    /// Identifier of a federation message.
    MessageId
);
uuid_id!(
    /// Identifier of a sync session.
    SessionId
);

/// Normalize a domain for storage and comparison.
pub fn normalize_domain(domain: &str) -> String {
    domain.trim().trim_end_matches('.').to_ascii_lowercase()
}

// =============================================================================
// INSTANCES
// =============================================================================

/// Moderated lifecycle status of an instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstanceStatus {
    /// Registered, awaiting moderator approval.
    #[default]
    Pending,
    /// Approved; may exchange messages.
    Active,
    /// Retired by a moderator.
    Inactive,
    /// Temporarily blocked by a moderator.
    Suspended,
}

impl InstanceStatus {
    /// Allowed moves: pending→active, active→suspended, active→inactive,
    /// suspended→active.
    pub fn can_transition_to(self, next: InstanceStatus) -> bool {
        use InstanceStatus::*;
        matches!(
            (self, next),
            (Pending, Active) | (Active, Suspended) | (Active, Inactive) | (Suspended, Active)
        )
    }

    /// Stable wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            InstanceStatus::Pending => "pending",
            InstanceStatus::Active => "active",
            InstanceStatus::Inactive => "inactive",
            InstanceStatus::Suspended => "suspended",
        }
    }
}

impl fmt::Display for InstanceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Data supplied when registering a peer instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceRegistration {
    /// Unique display name.
    pub name: String,
    /// Unique domain, e.g. `peer.example.edu`.
    pub domain: String,
    /// Base URL of the peer's federation API.
    pub api_url: String,
    /// Hex-encoded Ed25519 public key.
    pub public_key: String,
    /// Free-form description.
    #[serde(default)]
    pub description: String,
    /// Credential the peer issued to this node for outbound calls.
    #[serde(default)]
    pub outbound_api_key: Option<String>,
}

/// Identity record for a peer instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instance {
    /// Registry id.
    pub id: InstanceId,
    /// Unique display name.
    pub name: String,
    /// Unique, normalized domain.
    pub domain: String,
    /// Base URL of the peer's federation API.
    pub api_url: String,
    /// Free-form description.
    pub description: String,
    /// Hex-encoded Ed25519 public key.
    pub public_key: String,
    /// Credential this node issued to the peer; checked on inbound calls.
    pub api_key: String,
    /// Credential the peer issued to this node; sent on outbound calls.
    pub outbound_api_key: Option<String>,
    /// Moderated status.
    pub status: InstanceStatus,
    /// Trust flag set by moderators.
    pub is_trusted: bool,
    /// Last successful contact.
    pub last_seen: Option<Timestamp>,
    /// Registration time.
    pub created_at: Timestamp,
    /// Last modification time.
    pub updated_at: Timestamp,
    /// Optimistic concurrency counter, bumped by the store on every write.
    pub version: u64,
}

impl Instance {
    /// Create a pending instance from a registration.
    pub fn new(registration: InstanceRegistration, api_key: String, now: Timestamp) -> Self {
        Self {
            id: InstanceId::new(),
            name: registration.name.trim().to_string(),
            domain: normalize_domain(&registration.domain),
            api_url: registration.api_url.trim().trim_end_matches('/').to_string(),
            description: registration.description,
            public_key: registration.public_key.trim().to_ascii_lowercase(),
            api_key,
            outbound_api_key: registration.outbound_api_key,
            status: InstanceStatus::Pending,
            is_trusted: false,
            last_seen: None,
            created_at: now,
            updated_at: now,
            version: 0,
        }
    }

    /// Whether the instance may exchange messages.
    pub fn is_active(&self) -> bool {
        self.status == InstanceStatus::Active
    }

    /// Move to `next` if the lifecycle allows it.
    pub fn transition(&mut self, next: InstanceStatus, now: Timestamp) -> Result<(), TransitionError> {
        if !self.status.can_transition_to(next) {
            return Err(TransitionError::new("instance", self.status, next));
        }
        self.status = next;
        self.updated_at = now;
        Ok(())
    }

    /// Record a successful contact.
    pub fn touch(&mut self, now: Timestamp) {
        self.last_seen = Some(now);
        self.updated_at = now;
    }
}

// =============================================================================
// MESSAGES
// =============================================================================

/// Kind of federation message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageType {
    /// Ask a peer for records, or push records to it.
    SyncRequest,
    /// Answer to a sync request.
    SyncResponse,
    /// Ad-hoc query.
    Query,
    /// One-way notification.
    Notification,
    /// Error report.
    Error,
}

impl MessageType {
    /// All message types.
    pub const ALL: [MessageType; 5] = [
        MessageType::SyncRequest,
        MessageType::SyncResponse,
        MessageType::Query,
        MessageType::Notification,
        MessageType::Error,
    ];

    /// Stable wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageType::SyncRequest => "sync_request",
            MessageType::SyncResponse => "sync_response",
            MessageType::Query => "query",
            MessageType::Notification => "notification",
            MessageType::Error => "error",
        }
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MessageType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MessageType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| format!("unknown message type '{s}'"))
    }
}

/// Delivery status of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageStatus {
    /// Created, not yet accepted by the peer.
    #[default]
    Pending,
    /// Accepted by the peer's transport.
    Sent,
    /// Acknowledged by the peer.
    Delivered,
    /// Given up.
    Failed,
}

impl MessageStatus {
    /// Forward-only moves: pending→sent, pending→failed, sent→delivered,
    /// sent→failed.
    pub fn can_transition_to(self, next: MessageStatus) -> bool {
        use MessageStatus::*;
        matches!(
            (self, next),
            (Pending, Sent) | (Pending, Failed) | (Sent, Delivered) | (Sent, Failed)
        )
    }

    /// Delivered and failed are final.
    pub fn is_terminal(self) -> bool {
        matches!(self, MessageStatus::Delivered | MessageStatus::Failed)
    }

    /// Stable wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageStatus::Pending => "pending",
            MessageStatus::Sent => "sent",
            MessageStatus::Delivered => "delivered",
            MessageStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for MessageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether a message was produced here or received from a peer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Sent by this node.
    Outbound,
    /// Received from a peer.
    Inbound,
}

/// A federation message tracked by this node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FederationMessage {
    /// The wire envelope.
    pub envelope: Envelope,
    /// Registry id of the remote instance.
    pub peer: InstanceId,
    /// Outbound or inbound.
    pub direction: Direction,
    /// Delivery status.
    pub status: MessageStatus,
    /// Delivery retries performed so far.
    pub retry_count: u32,
    /// Reason of the last failure.
    pub error_message: Option<String>,
    /// When the peer accepted the message.
    pub sent_at: Option<Timestamp>,
    /// When the peer acknowledged the message.
    pub delivered_at: Option<Timestamp>,
}

impl FederationMessage {
    /// A pending outbound message to `peer`.
    pub fn outbound(envelope: Envelope, peer: InstanceId) -> Self {
        Self {
            envelope,
            peer,
            direction: Direction::Outbound,
            status: MessageStatus::Pending,
            retry_count: 0,
            error_message: None,
            sent_at: None,
            delivered_at: None,
        }
    }

    /// A message received from `peer`; it is delivered on arrival.
    pub fn inbound(envelope: Envelope, peer: InstanceId, now: Timestamp) -> Self {
        Self {
            envelope,
            peer,
            direction: Direction::Inbound,
            status: MessageStatus::Delivered,
            retry_count: 0,
            error_message: None,
            sent_at: Some(now),
            delivered_at: Some(now),
        }
    }

    /// Message id.
    pub fn id(&self) -> MessageId {
        self.envelope.id
    }

    /// Move to `next`, stamping `sent_at` / `delivered_at`.
    pub fn transition(&mut self, next: MessageStatus, now: Timestamp) -> Result<(), TransitionError> {
        if !self.status.can_transition_to(next) {
            return Err(TransitionError::new("message", self.status, next));
        }
        match next {
            MessageStatus::Sent => self.sent_at = Some(now),
            MessageStatus::Delivered => self.delivered_at = Some(now),
            MessageStatus::Pending | MessageStatus::Failed => {}
        }
        self.status = next;
        Ok(())
    }

    /// Move to failed with a reason.
    pub fn fail(&mut self, reason: impl Into<String>, now: Timestamp) -> Result<(), TransitionError> {
        self.transition(MessageStatus::Failed, now)?;
        self.error_message = Some(reason.into());
        Ok(())
    }
}

// =============================================================================
// SYNC SESSIONS
// =============================================================================

/// What a sync session replays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncType {
    /// Pull the peer's entire dataset.
    Full,
    /// Pull records changed since the last completed session.
    #[default]
    Incremental,
    /// Incremental pull plus push of local changes.
    Bilateral,
}

impl SyncType {
    /// Stable wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncType::Full => "full",
            SyncType::Incremental => "incremental",
            SyncType::Bilateral => "bilateral",
        }
    }
}

impl fmt::Display for SyncType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status of a sync session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncStatus {
    /// Created, not started.
    #[default]
    Initiated,
    /// Exchanging records.
    InProgress,
    /// Finished without errors.
    Completed,
    /// Finished with no usable result.
    Failed,
    /// Finished with some records and some errors.
    Partial,
}

impl SyncStatus {
    /// Completed, failed and partial are final.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            SyncStatus::Completed | SyncStatus::Failed | SyncStatus::Partial
        )
    }

    /// Outcome of a finished run: completed iff no errors, partial iff
    /// errors and at least one record, otherwise failed.
    pub fn outcome(records_synced: u64, errors_count: u64) -> SyncStatus {
        match (records_synced, errors_count) {
            (_, 0) => SyncStatus::Completed,
            (0, _) => SyncStatus::Failed,
            _ => SyncStatus::Partial,
        }
    }

    /// Stable wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncStatus::Initiated => "initiated",
            SyncStatus::InProgress => "in_progress",
            SyncStatus::Completed => "completed",
            SyncStatus::Failed => "failed",
            SyncStatus::Partial => "partial",
        }
    }
}

impl fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry of a session's error log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncErrorEntry {
    /// When the error was recorded.
    pub at: Timestamp,
    /// The record involved, if any.
    pub entity: Option<EntityRef>,
    /// What went wrong.
    pub message: String,
}

/// A synchronization run against one instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncSession {
    /// Session id.
    pub id: SessionId,
    /// The peer being synchronized with.
    pub instance: InstanceId,
    /// Full, incremental or bilateral.
    pub sync_type: SyncType,
    /// Current status.
    pub status: SyncStatus,
    /// Records applied locally or accepted by the peer.
    pub records_synced: u64,
    /// Errors recorded during the run.
    pub errors_count: u64,
    /// Structured error log.
    pub error_log: Vec<SyncErrorEntry>,
    /// Per-direction summary.
    pub data_synced: serde_json::Value,
    /// Session creation time; the watermark for the next incremental run.
    pub started_at: Timestamp,
    /// Set only once the session is terminal.
    pub completed_at: Option<Timestamp>,
}

impl SyncSession {
    /// A new session in `initiated`.
    pub fn new(instance: InstanceId, sync_type: SyncType, now: Timestamp) -> Self {
        Self {
            id: SessionId::new(),
            instance,
            sync_type,
            status: SyncStatus::Initiated,
            records_synced: 0,
            errors_count: 0,
            error_log: Vec::new(),
            data_synced: serde_json::Value::Object(serde_json::Map::new()),
            started_at: now,
            completed_at: None,
        }
    }

    /// initiated → in_progress.
    pub fn start(&mut self) -> Result<(), TransitionError> {
        if self.status != SyncStatus::Initiated {
            return Err(TransitionError::new("sync session", self.status, SyncStatus::InProgress));
        }
        self.status = SyncStatus::InProgress;
        Ok(())
    }

    /// Count `count` more records as synchronized.
    pub fn record_synced(&mut self, count: u64) {
        self.records_synced += count;
    }

    /// Append an error to the log.
    pub fn record_error(&mut self, message: impl Into<String>, entity: Option<EntityRef>, now: Timestamp) {
        self.errors_count += 1;
        self.error_log.push(SyncErrorEntry {
            at: now,
            entity,
            message: message.into(),
        });
    }

    /// Attach a direction summary under `data_synced[direction]`.
    pub fn set_direction_summary(&mut self, direction: &str, summary: serde_json::Value) {
        if !self.data_synced.is_object() {
            self.data_synced = serde_json::Value::Object(serde_json::Map::new());
        }
        if let Some(map) = self.data_synced.as_object_mut() {
            map.insert(direction.to_string(), summary);
        }
    }

    /// Settle the outcome from the counters and stamp `completed_at`.
    pub fn finalize(&mut self, now: Timestamp) -> Result<SyncStatus, TransitionError> {
        let outcome = SyncStatus::outcome(self.records_synced, self.errors_count);
        self.close(outcome, now)?;
        Ok(outcome)
    }

    /// Force `failed` (cancellation, unrecoverable error), logging `reason`.
    pub fn fail(&mut self, reason: impl Into<String>, now: Timestamp) -> Result<(), TransitionError> {
        if self.status.is_terminal() {
            return Err(TransitionError::new("sync session", self.status, SyncStatus::Failed));
        }
        self.record_error(reason, None, now);
        self.close(SyncStatus::Failed, now)
    }

    /// Whether the session has finished.
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    fn close(&mut self, outcome: SyncStatus, now: Timestamp) -> Result<(), TransitionError> {
        if self.status.is_terminal() {
            return Err(TransitionError::new("sync session", self.status, outcome));
        }
        self.status = outcome;
        self.completed_at = Some(now);
        Ok(())
    }
}
