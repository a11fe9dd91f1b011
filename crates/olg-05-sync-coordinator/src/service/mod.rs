//! # Services
//!
//! - [`SyncCoordinator`]: runs sync sessions against peers
//! - [`InboundProcessor`]: handles envelopes peers send to this node
//!
//! Both are built from the same [`FederationServices`] bundle of ports.

mod coordinator;
mod inbound;
#[cfg(test)]
pub(crate) mod testkit;

pub use coordinator::{SyncCoordinator, SyncHandle};
pub use inbound::InboundProcessor;

use crate::config::SyncConfig;
use crate::domain::SyncError;
use crate::ports::outbound::{RecordSink, RecordSource, SessionStore};
use olg_01_instance_registry::RegistryApi;
use olg_02_envelope_codec::EnvelopeCodec;
use olg_03_signature_verification::{LocalIdentity, SignatureVerificationApi};
use olg_04_delivery_queue::{DeliveryQueueApi, MessageStore};
use shared_bus::EventPublisher;
use shared_types::{Instance, InstanceStatus, TimeSource};
use std::sync::Arc;

/// Ports shared by the coordinator and the inbound processor.
#[derive(Clone)]
pub struct FederationServices {
    /// Peer registry.
    pub registry: Arc<dyn RegistryApi>,
    /// Outbound delivery.
    pub queue: Arc<dyn DeliveryQueueApi>,
    /// Envelope signing and verification.
    pub verifier: Arc<dyn SignatureVerificationApi>,
    /// Wire codec.
    pub codec: EnvelopeCodec,
    /// This node's domain and key.
    pub identity: Arc<LocalIdentity>,
    /// Local records to serve and push.
    pub source: Arc<dyn RecordSource>,
    /// Where received records are applied.
    pub sink: Arc<dyn RecordSink>,
    /// Session persistence.
    pub sessions: Arc<dyn SessionStore>,
    /// Message persistence, shared with the delivery queue.
    pub messages: Arc<dyn MessageStore>,
    /// Domain events.
    pub events: Arc<dyn EventPublisher>,
    /// Clock.
    pub time: Arc<dyn TimeSource>,
}

/// A peer may exchange sync traffic only while `active`, and only when
/// trusted if the configuration demands it.
pub(crate) fn check_peer(peer: &Instance, config: &SyncConfig) -> Result<(), SyncError> {
    if peer.status != InstanceStatus::Active {
        return Err(SyncError::PeerNotActive {
            instance: peer.id,
            status: peer.status,
        });
    }
    if config.require_trusted_peers && !peer.is_trusted {
        return Err(SyncError::PeerNotTrusted(peer.id));
    }
    Ok(())
}
