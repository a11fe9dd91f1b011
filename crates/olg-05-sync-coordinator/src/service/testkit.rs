//! Two in-process nodes joined by a loopback transport.
//!
//! The local node's delivery queue hands envelopes straight to the remote
//! node's inbound processor, so coordinator tests run the full signed
//! request/response path without sockets.

use super::{FederationServices, InboundProcessor};
use crate::adapters::{InMemoryRecordStore, InMemorySessionStore};
use crate::config::SyncConfig;
use crate::ports::inbound::{InboundApi, InboundReply};
use crate::service::SyncCoordinator;
use async_trait::async_trait;
use chrono::{Duration, TimeZone, Utc};
use olg_01_instance_registry::{InMemoryInstanceStore, RegistryApi, RegistryConfig, RegistryService};
use olg_02_envelope_codec::{EnvelopeCodec, EnvelopeCodecApi};
use olg_03_signature_verification::{LocalIdentity, SignatureVerifier};
use olg_04_delivery_queue::{
    classify_status, DeliveryConfig, DeliveryQueue, DeliveryTarget, FederationTransport,
    HttpDisposition, InMemoryMessageStore, TransportError, TransportReceipt,
};
use parking_lot::Mutex;
use serde_json::json;
use shared_bus::InMemoryEventBus;
use shared_types::{
    EntityKind, EntityRef, InstanceId, InstanceRegistration, InstanceStatus, ManualTimeSource,
    SyncRecord, Timestamp,
};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};
use tokio::sync::Notify;

pub(crate) fn start() -> Timestamp {
    Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
}

/// A record last changed `offset` seconds into the hour before the clock starts.
pub(crate) fn record(kind: EntityKind, id: &str, offset: i64) -> SyncRecord {
    SyncRecord::new(
        EntityRef::new(kind, id),
        json!({ "id": id, "rev": offset }),
        start() - Duration::hours(1) + Duration::seconds(offset),
    )
}

struct Link {
    remote: Arc<InboundProcessor>,
    local_registry: Arc<dyn RegistryApi>,
    remote_id: InstanceId,
}

/// Transport that calls the remote node's processor in-process.
#[derive(Default)]
pub(crate) struct LoopbackTransport {
    link: OnceLock<Link>,
    calls: AtomicUsize,
    failure: Mutex<Option<TransportError>>,
    hold: Mutex<Option<Arc<Notify>>>,
    tamper: AtomicBool,
    suspend_after_first: AtomicBool,
}

#[async_trait]
impl FederationTransport for LoopbackTransport {
    async fn deliver(&self, target: &DeliveryTarget, body: &[u8]) -> Result<TransportReceipt, TransportError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        let gate = self.hold.lock().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        let failure = self.failure.lock().clone();
        if let Some(failure) = failure {
            return Err(failure);
        }
        let Some(link) = self.link.get() else {
            return Err(TransportError::Permanent {
                status: None,
                reason: "no route to peer".into(),
            });
        };

        let reply = link.remote.handle(&target.api_key, body).await.map_err(|e| {
            let status = e.status_code();
            match classify_status(status) {
                HttpDisposition::Transient => TransportError::Transient(e.to_string()),
                _ => TransportError::Permanent {
                    status: Some(status),
                    reason: e.to_string(),
                },
            }
        })?;

        if call == 0 && self.suspend_after_first.load(Ordering::SeqCst) {
            link.local_registry
                .set_status(link.remote_id, InstanceStatus::Suspended)
                .await
                .map_err(|e| TransportError::Transient(e.to_string()))?;
        }

        match reply {
            InboundReply::Acknowledged => Ok(TransportReceipt::acknowledged(None)),
            InboundReply::Response(bytes) if self.tamper.load(Ordering::SeqCst) => {
                let codec = EnvelopeCodec::default();
                let mut envelope = codec
                    .decode(&bytes)
                    .map_err(|e| TransportError::Transient(e.to_string()))?;
                envelope.subject = "tampered".into();
                Ok(TransportReceipt::acknowledged(Some(codec.encode(&envelope))))
            }
            InboundReply::Response(bytes) => Ok(TransportReceipt::acknowledged(Some(bytes))),
        }
    }
}

/// One node's ports and in-memory adapters.
pub(crate) struct TestNode {
    pub registry: Arc<RegistryService<InMemoryInstanceStore>>,
    pub records: Arc<InMemoryRecordStore>,
    pub messages: Arc<InMemoryMessageStore>,
    pub bus: Arc<InMemoryEventBus>,
    pub identity: Arc<LocalIdentity>,
    pub services: FederationServices,
    pub processor: Arc<InboundProcessor>,
}

impl TestNode {
    fn build(domain: &str, clock: Arc<ManualTimeSource>, transport: Arc<dyn FederationTransport>) -> Self {
        let bus = Arc::new(InMemoryEventBus::new());
        let registry = Arc::new(RegistryService::new(
            Arc::new(InMemoryInstanceStore::new()),
            bus.clone(),
            clock.clone(),
            RegistryConfig::default(),
        ));
        let messages = Arc::new(InMemoryMessageStore::new());
        let records = Arc::new(InMemoryRecordStore::new());
        let codec = EnvelopeCodec::default();
        let queue = Arc::new(DeliveryQueue::new(
            transport,
            messages.clone(),
            bus.clone(),
            clock.clone(),
            codec.clone(),
            DeliveryConfig::for_testing(),
        ));
        let identity = Arc::new(LocalIdentity::generate(domain));

        let services = FederationServices {
            registry: registry.clone(),
            queue,
            verifier: Arc::new(SignatureVerifier::default()),
            codec,
            identity: identity.clone(),
            source: records.clone(),
            sink: records.clone(),
            sessions: Arc::new(InMemorySessionStore::new()),
            messages: messages.clone(),
            events: bus.clone(),
            time: clock,
        };
        let processor = Arc::new(InboundProcessor::new(services.clone(), SyncConfig::for_testing()));

        Self {
            registry,
            records,
            messages,
            bus,
            identity,
            services,
            processor,
        }
    }

    fn registration(&self, outbound_api_key: Option<String>) -> InstanceRegistration {
        let domain = self.identity.domain();
        InstanceRegistration {
            name: domain.to_string(),
            domain: domain.to_string(),
            api_url: format!("https://{domain}/api"),
            public_key: self.identity.public_key_hex(),
            description: String::new(),
            outbound_api_key,
        }
    }
}

/// `local` syncs with `remote`; each has the other registered and active.
pub(crate) struct TestNetwork {
    pub clock: Arc<ManualTimeSource>,
    pub local: TestNode,
    pub remote: TestNode,
    /// The remote node's id in the local registry.
    pub remote_id: InstanceId,
    /// The local node's id in the remote registry.
    pub local_id: InstanceId,
    /// Credential the remote node issued to the local node.
    pub local_key: String,
    transport: Arc<LoopbackTransport>,
}

impl TestNetwork {
    pub async fn new() -> Self {
        let clock = Arc::new(ManualTimeSource::new(start()));
        let transport = Arc::new(LoopbackTransport::default());
        let remote = TestNode::build("remote.example.edu", clock.clone(), Arc::new(LoopbackTransport::default()));
        let local = TestNode::build("local.example.edu", clock.clone(), transport.clone());

        let local_in_remote = remote.registry.register(local.registration(None)).await.unwrap();
        remote
            .registry
            .set_status(local_in_remote.id, InstanceStatus::Active)
            .await
            .unwrap();

        let remote_in_local = local
            .registry
            .register(remote.registration(Some(local_in_remote.api_key.clone())))
            .await
            .unwrap();
        local
            .registry
            .set_status(remote_in_local.id, InstanceStatus::Active)
            .await
            .unwrap();

        let link = Link {
            remote: remote.processor.clone(),
            local_registry: local.registry.clone(),
            remote_id: remote_in_local.id,
        };
        assert!(transport.link.set(link).is_ok());

        Self {
            clock,
            local,
            remote,
            remote_id: remote_in_local.id,
            local_id: local_in_remote.id,
            local_key: local_in_remote.api_key,
            transport,
        }
    }

    pub fn local_coordinator(&self) -> SyncCoordinator {
        SyncCoordinator::new(self.local.services.clone(), SyncConfig::for_testing())
    }

    /// Re-encode every response with a changed subject and the original signature.
    pub fn tamper_responses(&self, on: bool) {
        self.transport.tamper.store(on, Ordering::SeqCst);
    }

    pub fn fail_transport(&self, failure: Option<TransportError>) {
        *self.transport.failure.lock() = failure;
    }

    /// Block every delivery until the returned gate is notified.
    pub fn hold_transport(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.transport.hold.lock() = Some(gate.clone());
        gate
    }

    pub fn suspend_after_first_page(&self) {
        self.transport.suspend_after_first.store(true, Ordering::SeqCst);
    }

    pub fn transport_calls(&self) -> usize {
        self.transport.calls.load(Ordering::SeqCst)
    }
}
