//! Prometheus counters fed from domain events.

use shared_bus::{EventFilter, FederationEvent, InMemoryEventBus, Subscription};
use shared_types::SyncStatus;
use tracing::info;

/// Count one event.
pub fn record_event(event: &FederationEvent) {
    match event {
        FederationEvent::MessageStatusChanged { to, .. } => {
            olg_telemetry::record_message_status(to.as_str());
        }
        FederationEvent::SyncCompleted {
            status,
            records_synced,
            ..
        } => olg_telemetry::record_sync_session(status.as_str(), *records_synced),
        FederationEvent::SyncFailed { records_synced, .. } => {
            olg_telemetry::record_sync_session(SyncStatus::Failed.as_str(), *records_synced);
        }
        FederationEvent::InboundRejected { reason, .. } => {
            olg_telemetry::record_inbound_rejected(reason);
        }
        FederationEvent::SyncStarted { .. } | FederationEvent::InstanceStatusChanged { .. } => {}
    }
}

/// Feeds the federation counters.
pub struct MetricsHandler {
    subscription: Subscription,
}

impl MetricsHandler {
    /// Subscribe to every topic.
    pub fn new(bus: &InMemoryEventBus) -> Self {
        Self {
            subscription: bus.subscribe(EventFilter::all()),
        }
    }

    /// Run until the bus closes.
    pub async fn run(mut self) {
        info!("Metrics handler started");
        while let Some(event) = self.subscription.recv().await {
            record_event(&event);
        }
        info!("Event bus closed, metrics handler exiting");
    }
}
