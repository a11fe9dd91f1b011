//! # Sync Coordinator
//!
//! Each session runs in its own task:
//!
//! ```text
//! initiated ──start──→ in_progress ──pages──→ completed | partial | failed
//! ```
//!
//! Every page is one signed `sync_request` queued on the peer's delivery
//! lane and one `sync_response` that must decode, be addressed to this
//! node, come from the peer's domain, carry the session id and verify
//! against the peer's registered key before any record in it is applied.
//!
//! A failed page is logged in the session and ends that direction; the
//! outcome is settled from the counters. A cancelled session, or a peer
//! that stops being eligible between pages, ends `failed` immediately.

use super::{check_peer, FederationServices};
use crate::config::SyncConfig;
use crate::domain::{
    SyncDirection, SyncError, SyncRequestPayload, SyncResponsePayload,
};
use crate::ports::inbound::SyncCoordinatorApi;
use crate::ports::outbound::ApplyOutcome;
use async_trait::async_trait;
use olg_02_envelope_codec::EnvelopeCodecApi;
use olg_04_delivery_queue::{DeliveryOutcome, DeliveryTarget};
use parking_lot::Mutex;
use serde_json::json;
use shared_bus::FederationEvent;
use shared_types::{
    normalize_domain, Envelope, FederationMessage, Instance, InstanceId, MessageType, SessionId,
    SyncSession, SyncStatus, SyncType, Timestamp,
};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Why a page or a whole session stopped early.
#[derive(Debug, Error)]
enum Interrupt {
    #[error("sync cancelled")]
    Cancelled,
    #[error("aborted: {0}")]
    PeerIneligible(String),
    #[error("{0}")]
    PageFailed(String),
}

/// Where each direction resumes; `None` replays everything.
#[derive(Debug, Default, Clone, Copy)]
struct Watermarks {
    pull: Option<Timestamp>,
    push: Option<Timestamp>,
}

struct Running {
    session: SessionId,
    cancel: watch::Sender<bool>,
}

struct Inner {
    services: FederationServices,
    config: SyncConfig,
    running: Mutex<HashMap<InstanceId, Running>>,
}

/// Handle to a session running in the background.
#[derive(Debug)]
pub struct SyncHandle {
    session_id: SessionId,
    instance: InstanceId,
    join: JoinHandle<SyncSession>,
}

impl SyncHandle {
    /// Session id.
    pub fn session_id(&self) -> SessionId {
        self.session_id
    }

    /// Peer instance.
    pub fn instance(&self) -> InstanceId {
        self.instance
    }

    /// Wait for the terminal session record.
    pub async fn wait(self) -> Result<SyncSession, SyncError> {
        self.join.await.map_err(|e| SyncError::Task(e.to_string()))
    }
}

/// Sync coordinator.
#[derive(Clone)]
pub struct SyncCoordinator {
    inner: Arc<Inner>,
}

impl SyncCoordinator {
    /// Create a coordinator.
    pub fn new(services: FederationServices, config: SyncConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                services,
                config,
                running: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Active configuration.
    pub fn config(&self) -> &SyncConfig {
        &self.inner.config
    }
}

#[async_trait]
impl SyncCoordinatorApi for SyncCoordinator {
    async fn start_sync(&self, instance: InstanceId, sync_type: SyncType) -> Result<SyncHandle, SyncError> {
        let services = &self.inner.services;
        let peer = services.registry.lookup(instance).await?;
        check_peer(&peer, &self.inner.config)?;
        DeliveryTarget::from_instance(&peer).map_err(|_| SyncError::MissingCredential(peer.id))?;

        let session = SyncSession::new(instance, sync_type, services.time.now());
        let (cancel, cancel_rx) = watch::channel(false);
        {
            let mut running = self.inner.running.lock();
            if let Some(existing) = running.get(&instance) {
                return Err(SyncError::AlreadyRunning {
                    instance,
                    session: existing.session,
                });
            }
            running.insert(
                instance,
                Running {
                    session: session.id,
                    cancel,
                },
            );
        }

        if let Err(e) = services.sessions.save(&session).await {
            self.inner.release(instance, session.id);
            return Err(SyncError::Store(e.to_string()));
        }

        let session_id = session.id;
        let inner = self.inner.clone();
        let join = tokio::spawn(async move { inner.run(session, peer, cancel_rx).await });

        Ok(SyncHandle {
            session_id,
            instance,
            join,
        })
    }

    async fn cancel(&self, session: SessionId) -> Result<(), SyncError> {
        let signalled = self
            .inner
            .running
            .lock()
            .values()
            .find(|r| r.session == session)
            .map(|r| r.cancel.send(true).is_ok());

        match signalled {
            Some(_) => {
                info!(session_id = %session, "Sync cancellation requested");
                Ok(())
            }
            None => {
                self.session(session).await?;
                Err(SyncError::NotRunning(session))
            }
        }
    }

    async fn session(&self, session: SessionId) -> Result<SyncSession, SyncError> {
        self.inner
            .services
            .sessions
            .get(session)
            .await
            .map_err(|e| SyncError::Store(e.to_string()))?
            .ok_or(SyncError::SessionNotFound(session))
    }

    async fn sessions_for(&self, instance: InstanceId) -> Result<Vec<SyncSession>, SyncError> {
        self.inner
            .services
            .sessions
            .list_for_instance(instance)
            .await
            .map_err(|e| SyncError::Store(e.to_string()))
    }

    fn is_running(&self, instance: InstanceId) -> bool {
        self.inner.running.lock().contains_key(&instance)
    }
}

/// Resolves once cancellation is requested; never if the sender is gone.
async fn cancelled(cancel: &mut watch::Receiver<bool>) {
    while !*cancel.borrow() {
        if cancel.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

#[derive(Default)]
struct PullStats {
    pages: u64,
    applied: u64,
    skipped: u64,
    failed: u64,
}

#[derive(Default)]
struct PushStats {
    pages: u64,
    sent: u64,
    accepted: u64,
    skipped: u64,
    rejected: u64,
}

impl Inner {
    fn release(&self, instance: InstanceId, session: SessionId) {
        let mut running = self.running.lock();
        if running.get(&instance).is_some_and(|r| r.session == session) {
            running.remove(&instance);
        }
    }

    async fn save(&self, session: &SyncSession) {
        if let Err(e) = self.services.sessions.save(session).await {
            error!(session_id = %session.id, error = %e, "Failed to persist sync session");
        }
    }

    async fn run(
        self: Arc<Self>,
        mut session: SyncSession,
        peer: Instance,
        mut cancel: watch::Receiver<bool>,
    ) -> SyncSession {
        let services = &self.services;
        if let Err(e) = session.start() {
            error!(session_id = %session.id, error = %e, "Sync session could not start");
        }
        self.save(&session).await;
        services
            .events
            .publish(FederationEvent::SyncStarted {
                session_id: session.id,
                instance_id: peer.id,
                sync_type: session.sync_type,
            })
            .await;
        info!(
            session_id = %session.id,
            peer = %peer.domain,
            sync_type = %session.sync_type,
            "Sync session started"
        );

        let result = match self.watermarks(&session).await {
            Ok(marks) => {
                debug!(session_id = %session.id, pull = ?marks.pull, push = ?marks.push, "Sync watermarks");
                match session.sync_type {
                    SyncType::Full | SyncType::Incremental => {
                        self.pull(&mut session, peer.id, marks.pull, &mut cancel).await
                    }
                    SyncType::Bilateral => {
                        match self.pull(&mut session, peer.id, marks.pull, &mut cancel).await {
                            Ok(()) => self.push(&mut session, peer.id, marks.push, &mut cancel).await,
                            Err(interrupt) => Err(interrupt),
                        }
                    }
                }
            }
            Err(reason) => Err(Interrupt::PageFailed(reason)),
        };

        let now = services.time.now();
        let settled = match result {
            Ok(()) => session.finalize(now).map(|_| ()),
            // Pages already applied keep the session partial.
            Err(Interrupt::PageFailed(reason)) if session.records_synced > 0 => {
                session.record_error(reason, None, now);
                session.finalize(now).map(|_| ())
            }
            Err(interrupt) => session.fail(interrupt.to_string(), now),
        };
        if let Err(e) = settled {
            error!(session_id = %session.id, error = %e, "Sync session could not be finalized");
        }
        self.save(&session).await;
        self.release(peer.id, session.id);
        self.announce(&session, &peer).await;
        session
    }

    async fn announce(&self, session: &SyncSession, peer: &Instance) {
        let event = match session.status {
            SyncStatus::Failed => {
                let reason = session
                    .error_log
                    .last()
                    .map(|e| e.message.clone())
                    .unwrap_or_else(|| "no records synchronized".to_string());
                warn!(
                    session_id = %session.id,
                    peer = %peer.domain,
                    errors = session.errors_count,
                    reason = %reason,
                    "Sync session failed"
                );
                FederationEvent::SyncFailed {
                    session_id: session.id,
                    instance_id: peer.id,
                    reason,
                    records_synced: session.records_synced,
                    errors_count: session.errors_count,
                }
            }
            status => {
                info!(
                    session_id = %session.id,
                    peer = %peer.domain,
                    status = %status,
                    records = session.records_synced,
                    errors = session.errors_count,
                    "Sync session finished"
                );
                FederationEvent::SyncCompleted {
                    session_id: session.id,
                    instance_id: peer.id,
                    status,
                    records_synced: session.records_synced,
                    errors_count: session.errors_count,
                }
            }
        };
        self.services.events.publish(event).await;
    }

    /// `started_at` watermarks for incremental runs. Pull resumes after the
    /// last completed session of any type, push after the last completed
    /// bilateral one.
    async fn watermarks(&self, session: &SyncSession) -> Result<Watermarks, String> {
        if session.sync_type == SyncType::Full {
            return Ok(Watermarks::default());
        }
        let sessions = &self.services.sessions;
        let started = |last: Option<SyncSession>| last.map(|s| s.started_at);
        let pull = sessions
            .last_completed(session.instance, None)
            .await
            .map(started)
            .map_err(|e| format!("could not read sync watermark: {e}"))?;
        let push = match session.sync_type {
            SyncType::Bilateral => sessions
                .last_completed(session.instance, Some(SyncType::Bilateral))
                .await
                .map(started)
                .map_err(|e| format!("could not read push watermark: {e}"))?,
            _ => None,
        };
        Ok(Watermarks { pull, push })
    }

    async fn pull(
        &self,
        session: &mut SyncSession,
        peer_id: InstanceId,
        since: Option<Timestamp>,
        cancel: &mut watch::Receiver<bool>,
    ) -> Result<(), Interrupt> {
        let mut stats = PullStats::default();
        let mut cursor: Option<String> = None;

        let result = loop {
            let request = SyncRequestPayload {
                session_id: session.id,
                sync_type: session.sync_type,
                direction: SyncDirection::Pull,
                since,
                cursor: cursor.clone(),
                limit: self.config.batch_size,
                records: Vec::new(),
            };
            let response = match self.exchange(session.id, peer_id, request, cancel).await {
                Ok(response) => response,
                Err(Interrupt::PageFailed(reason)) => {
                    session.record_error(
                        format!("pull page {}: {reason}", stats.pages + 1),
                        None,
                        self.services.time.now(),
                    );
                    break Ok(());
                }
                Err(interrupt) => break Err(interrupt),
            };
            stats.pages += 1;

            for record in response.records {
                let entity = record.entity.clone();
                match self.services.sink.apply(record).await {
                    Ok(ApplyOutcome::Applied) => {
                        stats.applied += 1;
                        session.record_synced(1);
                    }
                    Ok(ApplyOutcome::Skipped) => stats.skipped += 1,
                    Err(e) => {
                        stats.failed += 1;
                        session.record_error(e.to_string(), Some(entity), self.services.time.now());
                    }
                }
            }
            self.save(session).await;

            match response.next_cursor {
                Some(next) if cursor.as_deref() == Some(next.as_str()) => {
                    session.record_error(
                        "peer repeated its pagination cursor",
                        None,
                        self.services.time.now(),
                    );
                    break Ok(());
                }
                Some(next) => cursor = Some(next),
                None => break Ok(()),
            }
        };

        session.set_direction_summary(
            SyncDirection::Pull.as_str(),
            json!({
                "pages": stats.pages,
                "applied": stats.applied,
                "skipped": stats.skipped,
                "failed": stats.failed,
                "since": since,
            }),
        );
        result
    }

    async fn push(
        &self,
        session: &mut SyncSession,
        peer_id: InstanceId,
        since: Option<Timestamp>,
        cancel: &mut watch::Receiver<bool>,
    ) -> Result<(), Interrupt> {
        let mut stats = PushStats::default();
        let mut cursor: Option<String> = None;
        let limit = self.config.batch_size.max(1) as usize;

        let result = loop {
            let page = match self
                .services
                .source
                .changed_since(since, cursor.as_deref(), limit)
                .await
            {
                Ok(page) => page,
                Err(e) => {
                    session.record_error(
                        format!("reading local changes failed: {e}"),
                        None,
                        self.services.time.now(),
                    );
                    break Ok(());
                }
            };
            if page.records.is_empty() {
                break Ok(());
            }

            let count = page.records.len() as u64;
            let request = SyncRequestPayload {
                session_id: session.id,
                sync_type: session.sync_type,
                direction: SyncDirection::Push,
                since,
                cursor: None,
                limit: self.config.batch_size,
                records: page.records,
            };
            let response = match self.exchange(session.id, peer_id, request, cancel).await {
                Ok(response) => response,
                Err(Interrupt::PageFailed(reason)) => {
                    session.record_error(
                        format!("push page {}: {reason}", stats.pages + 1),
                        None,
                        self.services.time.now(),
                    );
                    break Ok(());
                }
                Err(interrupt) => break Err(interrupt),
            };
            stats.pages += 1;
            stats.sent += count;
            stats.accepted += response.accepted;
            stats.skipped += response.skipped;
            stats.rejected += response.rejected.len() as u64;

            session.record_synced(response.accepted);
            for rejection in response.rejected {
                session.record_error(
                    format!("peer rejected record: {}", rejection.reason),
                    Some(rejection.entity),
                    self.services.time.now(),
                );
            }
            self.save(session).await;

            match page.next_cursor {
                Some(next) => cursor = Some(next),
                None => break Ok(()),
            }
        };

        session.set_direction_summary(
            SyncDirection::Push.as_str(),
            json!({
                "pages": stats.pages,
                "sent": stats.sent,
                "accepted": stats.accepted,
                "skipped": stats.skipped,
                "rejected": stats.rejected,
                "since": since,
            }),
        );
        result
    }

    /// Send one request page and return the verified response payload.
    async fn exchange(
        &self,
        session_id: SessionId,
        peer_id: InstanceId,
        request: SyncRequestPayload,
        cancel: &mut watch::Receiver<bool>,
    ) -> Result<SyncResponsePayload, Interrupt> {
        if *cancel.borrow() {
            return Err(Interrupt::Cancelled);
        }
        let services = &self.services;

        // Re-read the peer so a moderator's decision takes effect between pages.
        let peer = services
            .registry
            .lookup(peer_id)
            .await
            .map_err(|e| Interrupt::PeerIneligible(e.to_string()))?;
        check_peer(&peer, &self.config).map_err(|e| Interrupt::PeerIneligible(e.to_string()))?;
        let target = DeliveryTarget::from_instance(&peer)
            .map_err(|e| Interrupt::PeerIneligible(e.to_string()))?;

        let payload = serde_json::to_value(&request)
            .map_err(|e| Interrupt::PageFailed(format!("encoding request failed: {e}")))?;
        let mut envelope = Envelope::new(
            services.identity.domain(),
            peer.domain.clone(),
            MessageType::SyncRequest,
            request.direction.subject(),
            payload,
            services.time.now(),
        );
        services.verifier.sign_envelope(&mut envelope, &services.identity);
        debug!(
            session_id = %session_id,
            message_id = %envelope.id,
            peer = %peer.domain,
            direction = request.direction.as_str(),
            "Sending sync page request"
        );

        let ticket = services
            .queue
            .enqueue(FederationMessage::outbound(envelope, peer.id), target)
            .await
            .map_err(|e| Interrupt::PageFailed(e.to_string()))?;

        let outcome = tokio::select! {
            outcome = ticket.wait() => outcome,
            _ = cancelled(cancel) => return Err(Interrupt::Cancelled),
            _ = tokio::time::sleep(self.config.response_timeout()) => {
                return Err(Interrupt::PageFailed("timed out waiting for sync response".into()));
            }
        };

        match outcome {
            DeliveryOutcome::Delivered {
                response: Some(bytes),
            } => self.accept_response(session_id, &peer, &bytes).await,
            DeliveryOutcome::Delivered { response: None } | DeliveryOutcome::Sent => Err(
                Interrupt::PageFailed("peer returned no sync response".into()),
            ),
            DeliveryOutcome::Failed { reason, .. } => {
                Err(Interrupt::PageFailed(format!("delivery failed: {reason}")))
            }
        }
    }

    async fn accept_response(
        &self,
        session_id: SessionId,
        peer: &Instance,
        bytes: &[u8],
    ) -> Result<SyncResponsePayload, Interrupt> {
        let services = &self.services;
        let rejected = |reason: String| {
            warn!(session_id = %session_id, peer = %peer.domain, reason = %reason, "Sync response rejected");
            Interrupt::PageFailed(format!("invalid sync response: {reason}"))
        };

        let envelope = services.codec.decode(bytes).map_err(|e| rejected(e.to_string()))?;
        if envelope.message_type != MessageType::SyncResponse {
            return Err(rejected(format!("unexpected message type {}", envelope.message_type)));
        }
        if normalize_domain(&envelope.from) != peer.domain {
            return Err(rejected(format!("sent by '{}'", envelope.from)));
        }
        if normalize_domain(&envelope.to) != services.identity.domain() {
            return Err(rejected(format!("addressed to '{}'", envelope.to)));
        }
        services
            .verifier
            .verify_envelope(&envelope, &peer.public_key)
            .map_err(|e| rejected(e.to_string()))?;

        let payload: SyncResponsePayload = serde_json::from_value(envelope.payload.clone())
            .map_err(|e| rejected(format!("payload: {e}")))?;
        if payload.session_id != session_id {
            return Err(rejected(format!("belongs to session {}", payload.session_id)));
        }

        let now = services.time.now();
        if let Err(e) = services
            .messages
            .save(&FederationMessage::inbound(envelope, peer.id, now))
            .await
        {
            error!(session_id = %session_id, error = %e, "Failed to record sync response");
        }
        if let Err(e) = services.registry.touch(peer.id).await {
            warn!(peer = %peer.domain, error = %e, "Failed to update last_seen");
        }
        Ok(payload)
    }
}
