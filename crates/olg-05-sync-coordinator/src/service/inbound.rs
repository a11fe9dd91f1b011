//! # Inbound Processor
//!
//! Checks run in a fixed order and the first failure wins:
//!
//! ```text
//! credential ─→ peer status ─→ decode ─→ sender matches credential
//!   ─→ addressed to us ─→ signature ─→ replay window ─→ handle
//! ```
//!
//! Nothing in a payload is acted on before the signature has verified
//! against the key registered for the authenticated sender.

use super::{check_peer, FederationServices};
use crate::config::SyncConfig;
use crate::domain::{
    InboundError, RecordRejection, ReplayGuard, SyncDirection, SyncRequestPayload,
    SyncResponsePayload,
};
use crate::ports::inbound::{InboundApi, InboundReply};
use crate::ports::outbound::{ApplyOutcome, SyncStoreError};
use async_trait::async_trait;
use olg_01_instance_registry::RegistryError;
use olg_02_envelope_codec::EnvelopeCodecApi;
use shared_bus::FederationEvent;
use shared_types::{
    normalize_domain, Envelope, FederationMessage, Instance, MessageId, MessageType, Timestamp,
};
use tracing::{debug, error, info, warn};

/// Handles envelopes posted to this node's federation endpoint.
pub struct InboundProcessor {
    services: FederationServices,
    config: SyncConfig,
    replay: ReplayGuard,
}

/// Partial identification of a rejected message, for the audit event.
#[derive(Default)]
struct Seen {
    message_id: Option<MessageId>,
    sender: Option<String>,
}

impl InboundProcessor {
    /// Create a processor.
    pub fn new(services: FederationServices, config: SyncConfig) -> Self {
        let replay = ReplayGuard::new(config.replay_max_age_secs, config.replay_future_skew_secs);
        Self {
            services,
            config,
            replay,
        }
    }

    /// Envelope ids currently held by the replay guard.
    pub fn remembered_ids(&self) -> usize {
        self.replay.len()
    }

    async fn process(&self, api_key: &str, body: &[u8], seen: &mut Seen) -> Result<InboundReply, InboundError> {
        let services = &self.services;

        let sender = services.registry.authenticate(api_key).await.map_err(|e| match e {
            RegistryError::Unauthorized => InboundError::Unauthorized("unknown federation credential".into()),
            other => InboundError::Internal(other.to_string()),
        })?;
        seen.sender = Some(sender.domain.clone());
        check_peer(&sender, &self.config).map_err(|e| InboundError::Forbidden(e.to_string()))?;

        let envelope = services.codec.decode(body)?;
        seen.message_id = Some(envelope.id);

        if normalize_domain(&envelope.from) != sender.domain {
            return Err(InboundError::Forbidden(format!(
                "credential belongs to '{}', envelope claims '{}'",
                sender.domain, envelope.from
            )));
        }
        if normalize_domain(&envelope.to) != services.identity.domain() {
            return Err(InboundError::Misaddressed {
                expected: services.identity.domain().to_string(),
                actual: envelope.to.clone(),
            });
        }
        services.verifier.verify_envelope(&envelope, &sender.public_key)?;

        let now = services.time.now();
        self.replay.check_and_record(envelope.id, envelope.created_at, now)?;

        debug!(
            message_id = %envelope.id,
            sender = %sender.domain,
            message_type = %envelope.message_type,
            subject = %envelope.subject,
            "Inbound envelope verified"
        );

        let id = envelope.id;
        let handled = self.dispatch(envelope, &sender, now).await;
        if let Err(InboundError::Internal(_)) = &handled {
            // The sender retries a 500 with the same envelope.
            self.replay.forget(id);
        }
        handled
    }

    async fn dispatch(
        &self,
        envelope: Envelope,
        sender: &Instance,
        now: Timestamp,
    ) -> Result<InboundReply, InboundError> {
        let services = &self.services;
        let reply = match envelope.message_type {
            MessageType::SyncRequest => {
                let request: SyncRequestPayload = serde_json::from_value(envelope.payload.clone())
                    .map_err(|e| InboundError::InvalidPayload(e.to_string()))?;
                let response = self.answer(&request, sender).await?;
                InboundReply::Response(self.respond(&envelope, sender, response)?)
            }
            _ => InboundReply::Acknowledged,
        };

        let message = FederationMessage::inbound(envelope, sender.id, now);
        services
            .messages
            .save(&message)
            .await
            .map_err(|e| InboundError::Internal(e.to_string()))?;
        if let Err(e) = services.registry.touch(sender.id).await {
            warn!(sender = %sender.domain, error = %e, "Failed to update last_seen");
        }

        info!(
            message_id = %message.id(),
            sender = %sender.domain,
            message_type = %message.envelope.message_type,
            "Inbound message accepted"
        );
        Ok(reply)
    }

    async fn answer(&self, request: &SyncRequestPayload, sender: &Instance) -> Result<SyncResponsePayload, InboundError> {
        let services = &self.services;
        let mut response = SyncResponsePayload {
            session_id: request.session_id,
            ..SyncResponsePayload::default()
        };

        match request.direction {
            SyncDirection::Pull => {
                let limit = request.limit.min(self.config.batch_size).max(1) as usize;
                let page = services
                    .source
                    .changed_since(request.since, request.cursor.as_deref(), limit)
                    .await
                    .map_err(|e| match e {
                        SyncStoreError::InvalidCursor(_) => InboundError::InvalidPayload(e.to_string()),
                        other => InboundError::Internal(other.to_string()),
                    })?;
                debug!(
                    session_id = %request.session_id,
                    peer = %sender.domain,
                    records = page.records.len(),
                    more = page.next_cursor.is_some(),
                    "Serving sync page"
                );
                response.records = page.records;
                response.next_cursor = page.next_cursor;
            }
            SyncDirection::Push => {
                for record in &request.records {
                    match services.sink.apply(record.clone()).await {
                        Ok(ApplyOutcome::Applied) => response.accepted += 1,
                        Ok(ApplyOutcome::Skipped) => response.skipped += 1,
                        Err(SyncStoreError::Backend(reason)) => return Err(InboundError::Internal(reason)),
                        Err(e) => response.rejected.push(RecordRejection {
                            entity: record.entity.clone(),
                            reason: e.to_string(),
                        }),
                    }
                }
                debug!(
                    session_id = %request.session_id,
                    peer = %sender.domain,
                    accepted = response.accepted,
                    skipped = response.skipped,
                    rejected = response.rejected.len(),
                    "Applied pushed records"
                );
            }
        }
        Ok(response)
    }

    fn respond(
        &self,
        request: &Envelope,
        sender: &Instance,
        payload: SyncResponsePayload,
    ) -> Result<Vec<u8>, InboundError> {
        let services = &self.services;
        let payload = serde_json::to_value(&payload).map_err(|e| InboundError::Internal(e.to_string()))?;
        let mut envelope = Envelope::new(
            services.identity.domain(),
            sender.domain.clone(),
            MessageType::SyncResponse,
            request.subject.clone(),
            payload,
            services.time.now(),
        );
        services.verifier.sign_envelope(&mut envelope, &services.identity);
        Ok(services.codec.encode(&envelope))
    }
}

#[async_trait]
impl InboundApi for InboundProcessor {
    async fn handle(&self, api_key: &str, body: &[u8]) -> Result<InboundReply, InboundError> {
        let mut seen = Seen::default();
        let result = self.process(api_key, body, &mut seen).await;

        if let Err(e) = &result {
            match e {
                InboundError::Internal(_) => error!(
                    message_id = ?seen.message_id,
                    sender = ?seen.sender,
                    error = %e,
                    "Inbound message failed"
                ),
                _ => warn!(
                    message_id = ?seen.message_id,
                    sender = ?seen.sender,
                    reason = e.reason_code(),
                    error = %e,
                    "Inbound message rejected"
                ),
            }
            self.services
                .events
                .publish(FederationEvent::InboundRejected {
                    message_id: seen.message_id,
                    sender: seen.sender,
                    reason: e.reason_code().to_string(),
                    detail: e.to_string(),
                })
                .await;
        }
        result
    }
}
