//! # Federation Harness
//!
//! Full nodes built by [`FederationContainer`], joined by a transport that
//! routes each delivery through the target node's axum router in-process.
//! Every scenario therefore exercises the same HTTP status mapping a real
//! peer would see, without sockets.

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use chrono::{Duration, TimeZone, Utc};
use node_runtime::api::MESSAGES_PATH;
use node_runtime::{FederationContainer, NodeConfig, NodeRuntime};
use olg_01_instance_registry::RegistryApi;
use olg_02_envelope_codec::EnvelopeCodecApi;
use olg_03_signature_verification::{LocalIdentity, SignatureVerificationApi, SignatureVerifier};
use olg_04_delivery_queue::{
    classify_status, DeliveryConfig, DeliveryTarget, FederationTransport, HttpDisposition,
    TransportError, TransportReceipt, FEDERATION_KEY_HEADER,
};
use olg_05_sync_coordinator::SyncConfig;
use parking_lot::{Mutex, RwLock};
use serde_json::{json, Value};
use shared_types::{
    EntityKind, EntityRef, Envelope, InstanceId, InstanceRegistration, InstanceStatus,
    ManualTimeSource, MessageType, SyncRecord, Timestamp,
};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tower::ServiceExt;

/// Clock start shared by every node.
pub fn start() -> Timestamp {
    Utc.with_ymd_and_hms(2024, 9, 2, 8, 0, 0).unwrap()
}

/// A record last changed `offset` seconds into the hour before [`start`].
pub fn record(kind: EntityKind, id: &str, offset: i64) -> SyncRecord {
    SyncRecord::new(
        EntityRef::new(kind, id),
        json!({ "id": id, "rev": offset }),
        start() - Duration::hours(1) + Duration::seconds(offset),
    )
}

/// Routes deliveries to registered routers by `api_url`.
#[derive(Default)]
pub struct RouterTransport {
    routes: RwLock<HashMap<String, Router>>,
    offline: RwLock<HashSet<String>>,
    fail_next: AtomicUsize,
    cut_after: Mutex<Option<usize>>,
    calls: AtomicUsize,
    bodies: Mutex<Vec<Vec<u8>>>,
}

impl RouterTransport {
    fn route(&self, api_url: &str, router: Router) {
        self.routes.write().insert(api_url.to_string(), router);
    }
}

#[async_trait]
impl FederationTransport for RouterTransport {
    async fn deliver(&self, target: &DeliveryTarget, body: &[u8]) -> Result<TransportReceipt, TransportError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        let cut = self.cut_after.lock().is_some_and(|n| call >= n);
        if cut || self.offline.read().contains(&target.api_url) {
            return Err(TransportError::Transient(format!("connection refused: {}", target.api_url)));
        }
        let injected = self
            .fail_next
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if injected {
            return Err(TransportError::Transient("connection reset".into()));
        }
        let Some(router) = self.routes.read().get(&target.api_url).cloned() else {
            return Err(TransportError::Permanent {
                status: Some(404),
                reason: format!("no route to {}", target.api_url),
            });
        };
        self.bodies.lock().push(body.to_vec());

        let request = Request::builder()
            .method("POST")
            .uri(MESSAGES_PATH)
            .header(FEDERATION_KEY_HEADER, &target.api_key)
            .body(Body::from(body.to_vec()))
            .map_err(|e| TransportError::Permanent {
                status: None,
                reason: e.to_string(),
            })?;
        let response = router
            .oneshot(request)
            .await
            .map_err(|e| TransportError::Transient(e.to_string()))?;
        let status = response.status().as_u16();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .map_err(|e| TransportError::Transient(e.to_string()))?;

        match classify_status(status) {
            HttpDisposition::Accepted => Ok(TransportReceipt::accepted()),
            HttpDisposition::Acknowledged => {
                Ok(TransportReceipt::acknowledged((!bytes.is_empty()).then(|| bytes.to_vec())))
            }
            HttpDisposition::Transient => Err(TransportError::Transient(format!("peer answered HTTP {status}"))),
            HttpDisposition::Permanent => Err(TransportError::Permanent {
                status: Some(status),
                reason: String::from_utf8_lossy(&bytes).into_owned(),
            }),
        }
    }
}

/// One node of the test federation.
pub struct TestNode {
    /// The runtime (handlers, router).
    pub runtime: NodeRuntime,
    /// All subsystems.
    pub container: Arc<FederationContainer>,
    /// Base URL peers register for this node.
    pub api_url: String,
    router: Router,
}

impl TestNode {
    /// This node's domain.
    pub fn domain(&self) -> &str {
        self.container.identity.domain()
    }

    /// This node's identity.
    pub fn identity(&self) -> &LocalIdentity {
        &self.container.identity
    }

    /// Spawn the bus handlers.
    pub async fn start(&self) {
        self.runtime.start().await.unwrap();
    }

    /// Envelope from this node to `to`, signed with this node's key.
    pub fn envelope(&self, to: &str, message_type: MessageType, subject: &str, payload: Value) -> Envelope {
        let mut envelope = Envelope::new(
            self.domain(),
            to,
            message_type,
            subject,
            payload,
            self.container.time.now(),
        );
        self.signer().sign_envelope(&mut envelope, &self.container.identity);
        envelope
    }

    /// Verifier using this node's codec.
    pub fn signer(&self) -> SignatureVerifier {
        SignatureVerifier::new(olg_02_envelope_codec::EnvelopeCodec::new(self.container.config.codec.clone()))
    }

    /// Wire bytes of an envelope.
    pub fn encode(&self, envelope: &Envelope) -> Vec<u8> {
        olg_02_envelope_codec::EnvelopeCodec::new(self.container.config.codec.clone()).encode(envelope)
    }

    /// POST raw bytes to this node's message endpoint.
    pub async fn post(&self, api_key: Option<&str>, body: Vec<u8>) -> Reply {
        let mut builder = Request::builder().method("POST").uri(MESSAGES_PATH);
        if let Some(key) = api_key {
            builder = builder.header(FEDERATION_KEY_HEADER, key);
        }
        let response = self
            .router
            .clone()
            .oneshot(builder.body(Body::from(body)).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        Reply {
            status,
            body: body.to_vec(),
        }
    }
}

/// Response of [`TestNode::post`].
#[derive(Debug)]
pub struct Reply {
    /// HTTP status.
    pub status: StatusCode,
    /// Raw body.
    pub body: Vec<u8>,
}

impl Reply {
    /// `error.code` of an error body.
    pub fn error_code(&self) -> Option<String> {
        let value: Value = serde_json::from_slice(&self.body).ok()?;
        value["error"]["code"].as_str().map(str::to_string)
    }
}

/// Ids and credentials of two connected nodes.
#[derive(Debug, Clone)]
pub struct Link {
    /// `b`'s id in `a`'s registry.
    pub b_in_a: InstanceId,
    /// `a`'s id in `b`'s registry.
    pub a_in_b: InstanceId,
    /// Credential `a` presents to `b`.
    pub a_key_at_b: String,
    /// Credential `b` presents to `a`.
    pub b_key_at_a: String,
}

/// Nodes sharing one clock and one transport.
pub struct Federation {
    /// Shared clock.
    pub clock: Arc<ManualTimeSource>,
    transport: Arc<RouterTransport>,
}

impl Default for Federation {
    fn default() -> Self {
        Self::new()
    }
}

impl Federation {
    /// Empty federation.
    pub fn new() -> Self {
        Self {
            clock: Arc::new(ManualTimeSource::new(start())),
            transport: Arc::new(RouterTransport::default()),
        }
    }

    /// Config used for every node: deterministic backoff, small pages.
    pub fn config(domain: &str) -> NodeConfig {
        let mut config = NodeConfig::default();
        config.identity.domain = domain.to_string();
        config.delivery = DeliveryConfig::for_testing();
        config.sync = SyncConfig::for_testing();
        config
    }

    /// Add a node with the default test config.
    pub fn node(&self, domain: &str) -> TestNode {
        self.node_with(Self::config(domain))
    }

    /// Add a node with a custom config.
    pub fn node_with(&self, config: NodeConfig) -> TestNode {
        let api_url = format!("https://{}/api", config.identity.domain);
        let container = FederationContainer::with_transport(config, self.transport.clone(), self.clock.clone())
            .expect("node builds");
        let runtime = NodeRuntime::new(container);
        let router = runtime.router();
        self.transport.route(&api_url, router.clone());
        TestNode {
            container: runtime.container(),
            runtime,
            api_url,
            router,
        }
    }

    /// Register each node with the other, exchange credentials and
    /// activate both registrations.
    pub async fn connect(&self, a: &TestNode, b: &TestNode) -> Link {
        let a_in_b = b.container.registry.register(registration(a, None)).await.unwrap();
        let b_in_a = a
            .container
            .registry
            .register(registration(b, Some(a_in_b.api_key.clone())))
            .await
            .unwrap();
        b.container
            .registry
            .set_outbound_credential(a_in_b.id, b_in_a.api_key.clone())
            .await
            .unwrap();

        for (node, id) in [(a, b_in_a.id), (b, a_in_b.id)] {
            node.container
                .registry
                .set_status(id, InstanceStatus::Active)
                .await
                .unwrap();
        }

        Link {
            b_in_a: b_in_a.id,
            a_in_b: a_in_b.id,
            a_key_at_b: a_in_b.api_key,
            b_key_at_a: b_in_a.api_key,
        }
    }

    /// Refuse connections to a node.
    pub fn take_offline(&self, node: &TestNode) {
        self.transport.offline.write().insert(node.api_url.clone());
    }

    /// Accept connections to a node again.
    pub fn bring_online(&self, node: &TestNode) {
        self.transport.offline.write().remove(&node.api_url);
    }

    /// Fail the next `n` deliveries with a connection reset.
    pub fn fail_next(&self, n: usize) {
        self.transport.fail_next.store(n, Ordering::SeqCst);
    }

    /// Let the next `n` deliveries through, then refuse every later one.
    pub fn cut_after(&self, n: usize) {
        *self.transport.cut_after.lock() = Some(self.transport_calls() + n);
    }

    /// Delivery attempts so far, including refused ones.
    pub fn transport_calls(&self) -> usize {
        self.transport.calls.load(Ordering::SeqCst)
    }

    /// Bodies that reached a router, in order.
    pub fn delivered_bodies(&self) -> Vec<Vec<u8>> {
        self.transport.bodies.lock().clone()
    }
}

fn registration(node: &TestNode, outbound_api_key: Option<String>) -> InstanceRegistration {
    InstanceRegistration {
        name: node.domain().to_string(),
        domain: node.domain().to_string(),
        api_url: node.api_url.clone(),
        public_key: node.identity().public_key_hex(),
        description: String::new(),
        outbound_api_key,
    }
}
