//! Audit trail fed from domain events.

use crate::adapters::InMemoryAuditLog;
use serde_json::json;
use shared_bus::{EventFilter, EventTopic, FederationEvent, InMemoryEventBus, Subscription};
use shared_types::{AuditRecord, EntityKind, EntityRef, SyncStatus, TimeSource, Timestamp};
use std::sync::Arc;
use tracing::{debug, info};

/// Map an event to the audit entry it produces, if any.
///
/// `sync.started` and `inbound.rejected` are not audited: the first is
/// always followed by a terminal event, the second concerns no stored
/// entity.
pub fn audit_record(event: &FederationEvent, now: Timestamp) -> Option<AuditRecord> {
    match event {
        FederationEvent::MessageStatusChanged {
            message_id,
            from,
            to,
            retry_count,
            error,
            ..
        } => Some(AuditRecord::new(
            EntityRef::new(EntityKind::FederationMessage, message_id.to_string()),
            "status_changed",
            Some(json!({ "status": from.as_str() })),
            Some(json!({
                "status": to.as_str(),
                "retry_count": retry_count,
                "error": error,
            })),
            now,
        )),
        FederationEvent::InstanceStatusChanged {
            instance_id,
            domain,
            from,
            to,
        } => Some(AuditRecord::new(
            EntityRef::new(EntityKind::Instance, instance_id.to_string()),
            "status_changed",
            Some(json!({ "status": from.as_str() })),
            Some(json!({ "status": to.as_str(), "domain": domain })),
            now,
        )),
        FederationEvent::SyncCompleted {
            session_id,
            instance_id,
            status,
            records_synced,
            errors_count,
        } => Some(AuditRecord::new(
            EntityRef::new(EntityKind::SyncSession, session_id.to_string()),
            "sync_completed",
            Some(json!({ "status": SyncStatus::InProgress.as_str() })),
            Some(json!({
                "status": status.as_str(),
                "instance_id": instance_id,
                "records_synced": records_synced,
                "errors_count": errors_count,
            })),
            now,
        )),
        FederationEvent::SyncFailed {
            session_id,
            instance_id,
            reason,
            records_synced,
            errors_count,
        } => Some(AuditRecord::new(
            EntityRef::new(EntityKind::SyncSession, session_id.to_string()),
            "sync_failed",
            Some(json!({ "status": SyncStatus::InProgress.as_str() })),
            Some(json!({
                "status": SyncStatus::Failed.as_str(),
                "instance_id": instance_id,
                "reason": reason,
                "records_synced": records_synced,
                "errors_count": errors_count,
            })),
            now,
        )),
        FederationEvent::SyncStarted { .. } | FederationEvent::InboundRejected { .. } => None,
    }
}

/// Appends audit entries for status changes and finished sessions.
pub struct AuditTrailHandler {
    subscription: Subscription,
    log: Arc<InMemoryAuditLog>,
    time: Arc<dyn TimeSource>,
}

impl AuditTrailHandler {
    /// Subscribe to the audited topics.
    pub fn new(bus: &InMemoryEventBus, log: Arc<InMemoryAuditLog>, time: Arc<dyn TimeSource>) -> Self {
        let filter = EventFilter::topics(vec![EventTopic::Delivery, EventTopic::Registry, EventTopic::Sync]);
        Self {
            subscription: bus.subscribe(filter),
            log,
            time,
        }
    }

    /// Run until the bus closes.
    pub async fn run(mut self) {
        info!("Audit trail handler started");
        while let Some(event) = self.subscription.recv().await {
            if let Some(record) = audit_record(&event, self.time.now()) {
                debug!(
                    event = event.name(),
                    subject = %record.subject,
                    action = %record.action,
                    "Audit entry recorded"
                );
                self.log.append(record);
            }
        }
        info!("Event bus closed, audit trail handler exiting");
    }
}
