//! # Federation Events
//!
//! Domain events published by the registry, the delivery queue, the sync
//! coordinator and the inbound processor.
//!
//! | Event | Name | Topic |
//! |-------|------|-------|
//! | `SyncStarted` | `sync.started` | `Sync` |
//! | `SyncCompleted` | `sync.completed` | `Sync` |
//! | `SyncFailed` | `sync.failed` | `Sync` |
//! | `MessageStatusChanged` | `message.status.changed` | `Delivery` |
//! | `InstanceStatusChanged` | `instance.status.changed` | `Registry` |
//! | `InboundRejected` | `inbound.rejected` | `Inbound` |

use serde::{Deserialize, Serialize};
use shared_types::{
    Direction, InstanceId, InstanceStatus, MessageId, MessageStatus, SessionId, SyncStatus,
    SyncType,
};

/// All events that can be published to the event bus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FederationEvent {
    // =========================================================================
    // SYNC COORDINATOR
    // =========================================================================
    /// A sync session moved to `in_progress`.
    SyncStarted {
        /// Session id.
        session_id: SessionId,
        /// Peer instance.
        instance_id: InstanceId,
        /// Full, incremental or bilateral.
        sync_type: SyncType,
    },

    /// A sync session finished as `completed` or `partial`.
    SyncCompleted {
        /// Session id.
        session_id: SessionId,
        /// Peer instance.
        instance_id: InstanceId,
        /// `Completed` or `Partial`.
        status: SyncStatus,
        /// Records synchronized.
        records_synced: u64,
        /// Errors recorded.
        errors_count: u64,
    },

    /// A sync session finished as `failed`.
    SyncFailed {
        /// Session id.
        session_id: SessionId,
        /// Peer instance.
        instance_id: InstanceId,
        /// Last error recorded.
        reason: String,
        /// Records synchronized before the failure.
        records_synced: u64,
        /// Errors recorded.
        errors_count: u64,
    },

    // =========================================================================
    // DELIVERY QUEUE
    // =========================================================================
    /// A message moved between delivery states.
    MessageStatusChanged {
        /// Message id.
        message_id: MessageId,
        /// Peer instance.
        instance_id: InstanceId,
        /// Outbound or inbound.
        direction: Direction,
        /// Previous status.
        from: MessageStatus,
        /// New status.
        to: MessageStatus,
        /// Retries so far.
        retry_count: u32,
        /// Failure reason when `to` is `Failed`.
        error: Option<String>,
    },

    // =========================================================================
    // INSTANCE REGISTRY
    // =========================================================================
    /// A moderator changed an instance's status.
    InstanceStatusChanged {
        /// Instance id.
        instance_id: InstanceId,
        /// Instance domain.
        domain: String,
        /// Previous status.
        from: InstanceStatus,
        /// New status.
        to: InstanceStatus,
    },

    // =========================================================================
    // INBOUND PROCESSOR
    // =========================================================================
    /// An inbound message was refused before its payload was trusted.
    InboundRejected {
        /// Message id, if the envelope could be decoded.
        message_id: Option<MessageId>,
        /// Claimed sender domain, if known.
        sender: Option<String>,
        /// Short machine-readable reason (`signature_invalid`, `replay`, ...).
        reason: String,
        /// Human-readable detail.
        detail: String,
    },
}

impl FederationEvent {
    /// Get the topic for this event.
    pub fn topic(&self) -> EventTopic {
        match self {
            Self::SyncStarted { .. } | Self::SyncCompleted { .. } | Self::SyncFailed { .. } => {
                EventTopic::Sync
            }
            Self::MessageStatusChanged { .. } => EventTopic::Delivery,
            Self::InstanceStatusChanged { .. } => EventTopic::Registry,
            Self::InboundRejected { .. } => EventTopic::Inbound,
        }
    }

    /// Dotted event name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::SyncStarted { .. } => "sync.started",
            Self::SyncCompleted { .. } => "sync.completed",
            Self::SyncFailed { .. } => "sync.failed",
            Self::MessageStatusChanged { .. } => "message.status.changed",
            Self::InstanceStatusChanged { .. } => "instance.status.changed",
            Self::InboundRejected { .. } => "inbound.rejected",
        }
    }

    /// The peer instance the event concerns, when known.
    pub fn instance_id(&self) -> Option<InstanceId> {
        match self {
            Self::SyncStarted { instance_id, .. }
            | Self::SyncCompleted { instance_id, .. }
            | Self::SyncFailed { instance_id, .. }
            | Self::MessageStatusChanged { instance_id, .. }
            | Self::InstanceStatusChanged { instance_id, .. } => Some(*instance_id),
            Self::InboundRejected { .. } => None,
        }
    }
}

/// Event topics for subscription filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventTopic {
    /// `sync.*`
    Sync,
    /// `message.status.changed`
    Delivery,
    /// `instance.status.changed`
    Registry,
    /// `inbound.rejected`
    Inbound,
    /// All events (no filtering).
    All,
}

/// Filter for event subscriptions.
#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    /// Topics to include. Empty means all topics.
    pub topics: Vec<EventTopic>,
    /// Instances to include. Empty means all instances.
    pub instances: Vec<InstanceId>,
}

impl EventFilter {
    /// Create a filter that accepts all events.
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// Create a filter for specific topics.
    #[must_use]
    pub fn topics(topics: Vec<EventTopic>) -> Self {
        Self {
            topics,
            instances: Vec::new(),
        }
    }

    /// Narrow the filter to events about one instance.
    #[must_use]
    pub fn for_instance(mut self, instance: InstanceId) -> Self {
        self.instances.push(instance);
        self
    }

    /// Check if an event matches this filter.
    #[must_use]
    pub fn matches(&self, event: &FederationEvent) -> bool {
        let topic_match = self.topics.is_empty()
            || self.topics.contains(&EventTopic::All)
            || self.topics.contains(&event.topic());

        let instance_match = self.instances.is_empty()
            || event
                .instance_id()
                .is_some_and(|id| self.instances.contains(&id));

        topic_match && instance_match
    }
}
