//! # Federation Container
//!
//! Builds every subsystem once, in dependency order, and hands out shared
//! references.
//!
//! ```text
//! identity ─┐
//! registry ─┼─→ delivery queue ─→ FederationServices ─┬─→ SyncCoordinator
//! codec ────┘                                         └─→ InboundProcessor
//! ```

use super::config::{NodeConfig, PeerConfig};
use crate::adapters::InMemoryAuditLog;
use olg_01_instance_registry::{InMemoryInstanceStore, RegistryApi, RegistryError, RegistryService};
use olg_02_envelope_codec::EnvelopeCodec;
use olg_03_signature_verification::{LocalIdentity, SignatureError, SignatureVerifier};
use olg_04_delivery_queue::{
    DeliveryQueue, FederationTransport, HttpTransport, InMemoryMessageStore, TransportError,
};
use olg_05_sync_coordinator::{
    FederationServices, InMemoryRecordStore, InMemorySessionStore, InboundProcessor,
    SyncCoordinator,
};
use shared_bus::InMemoryEventBus;
use shared_types::{Instance, InstanceRegistration, InstanceStatus, SystemTimeSource, TimeSource};
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

use super::config::Environment;

/// Errors while assembling the node.
#[derive(Debug, Error)]
pub enum ContainerError {
    /// The signing seed could not be turned into a key.
    #[error("Invalid signing identity: {0}")]
    Identity(#[from] SignatureError),

    /// No signing seed in production.
    #[error("identity.signing_seed is required in production")]
    MissingSigningSeed,

    /// The HTTP client could not be built.
    #[error("Failed to build federation transport: {0}")]
    Transport(#[from] TransportError),

    /// A configured peer could not be registered.
    #[error("Failed to bootstrap peer '{domain}': {source}")]
    Peer {
        /// Peer domain.
        domain: String,
        /// Registry error.
        source: RegistryError,
    },
}

/// Concrete registry used by the node.
pub type NodeRegistry = RegistryService<InMemoryInstanceStore>;

/// All subsystems of one node.
pub struct FederationContainer {
    /// Configuration the node was built from.
    pub config: NodeConfig,
    /// Domain event bus.
    pub bus: Arc<InMemoryEventBus>,
    /// Clock.
    pub time: Arc<dyn TimeSource>,
    /// This node's domain and signing key.
    pub identity: Arc<LocalIdentity>,
    /// Peer registry (OLG-01).
    pub registry: Arc<NodeRegistry>,
    /// Message records, both directions.
    pub messages: Arc<InMemoryMessageStore>,
    /// Local records served to and received from peers.
    pub records: Arc<InMemoryRecordStore>,
    /// Sync session records.
    pub sessions: Arc<InMemorySessionStore>,
    /// Outbound delivery (OLG-04).
    pub queue: Arc<DeliveryQueue>,
    /// Outbound sessions (OLG-05).
    pub coordinator: Arc<SyncCoordinator>,
    /// Inbound envelopes (OLG-05).
    pub inbound: Arc<InboundProcessor>,
    /// Audit trail.
    pub audit_log: Arc<InMemoryAuditLog>,
}

impl FederationContainer {
    /// Build the node with the reqwest transport and the system clock.
    pub fn new(config: NodeConfig) -> Result<Self, ContainerError> {
        let transport = Arc::new(HttpTransport::new(config.delivery.request_timeout())?);
        Self::with_transport(config, transport, Arc::new(SystemTimeSource))
    }

    /// Build the node with an injected transport and clock.
    pub fn with_transport(
        config: NodeConfig,
        transport: Arc<dyn FederationTransport>,
        time: Arc<dyn TimeSource>,
    ) -> Result<Self, ContainerError> {
        let identity = Arc::new(load_identity(&config)?);
        info!(
            domain = %identity.domain(),
            public_key = %identity.public_key_hex(),
            environment = %config.environment,
            "Initializing federation subsystems"
        );

        let bus = Arc::new(InMemoryEventBus::new());

        // OLG-01
        let registry = Arc::new(RegistryService::new(
            Arc::new(InMemoryInstanceStore::new()),
            bus.clone(),
            time.clone(),
            config.effective_registry(),
        ));

        // OLG-02, OLG-04
        let codec = EnvelopeCodec::new(config.codec.clone());
        let messages = Arc::new(InMemoryMessageStore::new());
        let queue = Arc::new(DeliveryQueue::new(
            transport,
            messages.clone(),
            bus.clone(),
            time.clone(),
            codec.clone(),
            config.delivery.clone(),
        ));

        // OLG-05
        let records = Arc::new(InMemoryRecordStore::new());
        let sessions = Arc::new(InMemorySessionStore::new());
        let services = FederationServices {
            registry: registry.clone(),
            queue: queue.clone(),
            verifier: Arc::new(SignatureVerifier::new(codec.clone())),
            codec,
            identity: identity.clone(),
            source: records.clone(),
            sink: records.clone(),
            sessions: sessions.clone(),
            messages: messages.clone(),
            events: bus.clone(),
            time: time.clone(),
        };
        let coordinator = Arc::new(SyncCoordinator::new(services.clone(), config.sync.clone()));
        let inbound = Arc::new(InboundProcessor::new(services, config.sync.clone()));

        Ok(Self {
            config,
            bus,
            time,
            identity,
            registry,
            messages,
            records,
            sessions,
            queue,
            coordinator,
            inbound,
            audit_log: Arc::new(InMemoryAuditLog::new()),
        })
    }

    /// Register the peers listed in the configuration. Peers whose domain
    /// is already registered are left untouched.
    pub async fn bootstrap_peers(&self) -> Result<Vec<Instance>, ContainerError> {
        let mut registered = Vec::new();
        for peer in &self.config.peers {
            let fail = |source| ContainerError::Peer {
                domain: peer.domain.clone(),
                source,
            };
            match self.registry.lookup_by_domain(&peer.domain).await {
                Ok(existing) => {
                    info!(domain = %existing.domain, "Peer already registered, skipping");
                    continue;
                }
                Err(RegistryError::DomainNotFound(_)) => {}
                Err(e) => return Err(fail(e)),
            }

            let registration = registration_for(peer);
            let mut instance = match &peer.inbound_api_key {
                Some(key) => self.registry.register_with_credential(registration, key.clone()).await,
                None => self.registry.register(registration).await,
            }
            .map_err(fail)?;

            if peer.active {
                instance = self
                    .registry
                    .set_status(instance.id, InstanceStatus::Active)
                    .await
                    .map_err(fail)?;
            }
            if peer.trusted {
                instance = self.registry.mark_trusted(instance.id, true).await.map_err(fail)?;
            }
            if peer.inbound_api_key.is_none() {
                warn!(
                    domain = %instance.domain,
                    "Generated inbound credential for peer; share it out of band"
                );
            }
            info!(
                instance_id = %instance.id,
                domain = %instance.domain,
                status = %instance.status,
                trusted = instance.is_trusted,
                "Bootstrapped peer"
            );
            registered.push(instance);
        }
        Ok(registered)
    }
}

fn registration_for(peer: &PeerConfig) -> InstanceRegistration {
    InstanceRegistration {
        name: if peer.name.trim().is_empty() {
            peer.domain.clone()
        } else {
            peer.name.clone()
        },
        domain: peer.domain.clone(),
        api_url: peer.api_url.clone(),
        public_key: peer.public_key.clone(),
        description: peer.description.clone(),
        outbound_api_key: peer.outbound_api_key.clone(),
    }
}

fn load_identity(config: &NodeConfig) -> Result<LocalIdentity, ContainerError> {
    let domain = config.identity.domain.trim();
    if !config.identity.signing_seed.is_empty() {
        return Ok(LocalIdentity::from_seed_hex(domain, &config.identity.signing_seed)?);
    }
    if config.environment == Environment::Production {
        return Err(ContainerError::MissingSigningSeed);
    }
    warn!(
        domain = %domain,
        "No signing seed configured, generated an ephemeral identity; peers will not recognize it after restart"
    );
    Ok(LocalIdentity::generate(domain))
}
