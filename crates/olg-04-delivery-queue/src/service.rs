//! # Delivery Queue Service
//!
//! One lane per destination instance. A lane is a tokio task draining an
//! unbounded channel, so messages to one peer are attempted strictly in
//! enqueue order and only one is in flight at a time. A message being
//! retried holds the head of its lane. Lanes to different peers run
//! concurrently.
//!
//! Lane tasks own a [`LaneContext`] rather than the queue itself, so
//! dropping the [`DeliveryQueue`] closes every channel and each lane exits
//! after finishing the messages already queued on it.

use crate::config::DeliveryConfig;
use crate::domain::{
    BackoffPolicy, DeliveryError, DeliveryOutcome, DeliveryTarget, DeliveryTicket, TransportError,
};
use crate::ports::inbound::DeliveryQueueApi;
use crate::ports::outbound::{FederationTransport, MessageStore};
use async_trait::async_trait;
use olg_02_envelope_codec::{EnvelopeCodec, EnvelopeCodecApi};
use parking_lot::Mutex;
use shared_bus::{EventPublisher, FederationEvent};
use shared_types::{
    Direction, FederationMessage, InstanceId, MessageId, MessageStatus, TimeSource,
};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info, warn};

struct Job {
    message: FederationMessage,
    target: DeliveryTarget,
    reply: oneshot::Sender<DeliveryOutcome>,
}

/// Everything a lane needs to deliver a message.
struct LaneContext {
    transport: Arc<dyn FederationTransport>,
    store: Arc<dyn MessageStore>,
    events: Arc<dyn EventPublisher>,
    time: Arc<dyn TimeSource>,
    codec: EnvelopeCodec,
    backoff: BackoffPolicy,
    config: DeliveryConfig,
}

/// Per-peer FIFO delivery queue.
pub struct DeliveryQueue {
    context: Arc<LaneContext>,
    lanes: Mutex<HashMap<InstanceId, mpsc::UnboundedSender<Job>>>,
}

impl DeliveryQueue {
    /// Create a queue. Lanes are spawned on the current tokio runtime on
    /// first use.
    pub fn new(
        transport: Arc<dyn FederationTransport>,
        store: Arc<dyn MessageStore>,
        events: Arc<dyn EventPublisher>,
        time: Arc<dyn TimeSource>,
        codec: EnvelopeCodec,
        config: DeliveryConfig,
    ) -> Self {
        Self {
            context: Arc::new(LaneContext {
                transport,
                store,
                events,
                time,
                codec,
                backoff: BackoffPolicy::from_config(&config),
                config,
            }),
            lanes: Mutex::new(HashMap::new()),
        }
    }

    /// Active configuration.
    pub fn config(&self) -> &DeliveryConfig {
        &self.context.config
    }

    fn check_acceptable(message: &FederationMessage, target: &DeliveryTarget) -> Result<(), DeliveryError> {
        let reject = |reason: &str| DeliveryError::Rejected {
            id: message.id(),
            reason: reason.to_string(),
        };
        if message.direction != Direction::Outbound {
            return Err(reject("only outbound messages can be delivered"));
        }
        if message.status != MessageStatus::Pending {
            return Err(reject("message is not pending"));
        }
        if !message.envelope.is_signed() {
            return Err(reject("envelope is unsigned"));
        }
        if message.peer != target.instance_id {
            return Err(reject("target does not match the message peer"));
        }
        Ok(())
    }

    fn dispatch(&self, job: Job) {
        let instance = job.target.instance_id;
        let mut lanes = self.lanes.lock();

        let job = match lanes.get(&instance) {
            Some(sender) => match sender.send(job) {
                Ok(()) => return,
                Err(mpsc::error::SendError(job)) => job,
            },
            None => job,
        };

        let (sender, receiver) = mpsc::unbounded_channel();
        let context = self.context.clone();
        tokio::spawn(run_lane(context, instance, receiver));
        debug!(instance_id = %instance, "Opened delivery lane");

        // The receiver is alive: the task was just spawned with it.
        let _ = sender.send(job);
        lanes.insert(instance, sender);
    }
}

#[async_trait]
impl DeliveryQueueApi for DeliveryQueue {
    async fn enqueue(
        &self,
        message: FederationMessage,
        target: DeliveryTarget,
    ) -> Result<DeliveryTicket, DeliveryError> {
        Self::check_acceptable(&message, &target)?;

        self.context
            .store
            .save(&message)
            .await
            .map_err(|e| DeliveryError::Store(e.to_string()))?;

        let message_id = message.id();
        let (reply, receiver) = oneshot::channel();
        debug!(
            message_id = %message_id,
            peer = %target.domain,
            message_type = %message.envelope.message_type,
            "Queued outbound message"
        );
        self.dispatch(Job {
            message,
            target,
            reply,
        });
        Ok(DeliveryTicket::new(message_id, receiver))
    }

    async fn message(&self, id: MessageId) -> Result<Option<FederationMessage>, DeliveryError> {
        self.context
            .store
            .get(id)
            .await
            .map_err(|e| DeliveryError::Store(e.to_string()))
    }

    fn active_lanes(&self) -> usize {
        self.lanes.lock().values().filter(|s| !s.is_closed()).count()
    }
}

async fn run_lane(context: Arc<LaneContext>, instance: InstanceId, mut receiver: mpsc::UnboundedReceiver<Job>) {
    while let Some(job) = receiver.recv().await {
        let outcome = context.deliver(job.message, &job.target).await;
        // The caller may have dropped its ticket.
        let _ = job.reply.send(outcome);
    }
    debug!(instance_id = %instance, "Delivery lane closed");
}

impl LaneContext {
    async fn deliver(&self, mut message: FederationMessage, target: &DeliveryTarget) -> DeliveryOutcome {
        let body = self.codec.encode(&message.envelope);

        loop {
            let attempt = tokio::time::timeout(
                self.config.request_timeout(),
                self.transport.deliver(target, &body),
            )
            .await
            .unwrap_or_else(|_| {
                Err(TransportError::Transient(format!(
                    "no response within {:?}",
                    self.config.request_timeout()
                )))
            });

            match attempt {
                Ok(receipt) => {
                    self.set_status(&mut message, MessageStatus::Sent, None).await;
                    if !receipt.acknowledged {
                        info!(message_id = %message.id(), peer = %target.domain, "Message accepted by peer");
                        return DeliveryOutcome::Sent;
                    }
                    self.set_status(&mut message, MessageStatus::Delivered, None).await;
                    info!(
                        message_id = %message.id(),
                        peer = %target.domain,
                        retry_count = message.retry_count,
                        "Message delivered"
                    );
                    return DeliveryOutcome::Delivered {
                        response: receipt.response,
                    };
                }
                Err(TransportError::Transient(reason)) if message.retry_count < self.config.max_retries => {
                    message.retry_count += 1;
                    self.persist(&message).await;

                    let delay = self.backoff.delay(message.retry_count);
                    warn!(
                        message_id = %message.id(),
                        peer = %target.domain,
                        retry = message.retry_count,
                        max_retries = self.config.max_retries,
                        delay_ms = delay.as_millis() as u64,
                        reason = %reason,
                        "Transient delivery failure, will retry"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(err) => {
                    let transient = err.is_transient();
                    let reason = err.to_string();
                    self.set_status(&mut message, MessageStatus::Failed, Some(reason.clone()))
                        .await;
                    error!(
                        message_id = %message.id(),
                        peer = %target.domain,
                        retry_count = message.retry_count,
                        reason = %reason,
                        "Message delivery failed"
                    );
                    return DeliveryOutcome::Failed {
                        reason,
                        retry_count: message.retry_count,
                        transient,
                    };
                }
            }
        }
    }

    async fn set_status(&self, message: &mut FederationMessage, next: MessageStatus, error: Option<String>) {
        let from = message.status;
        let now = self.time.now();
        let result = match &error {
            Some(reason) => message.fail(reason.clone(), now),
            None => message.transition(next, now),
        };
        if let Err(e) = result {
            error!(message_id = %message.id(), error = %e, "Illegal message transition");
            return;
        }

        self.persist(message).await;
        self.events
            .publish(FederationEvent::MessageStatusChanged {
                message_id: message.id(),
                instance_id: message.peer,
                direction: message.direction,
                from,
                to: next,
                retry_count: message.retry_count,
                error,
            })
            .await;
    }

    async fn persist(&self, message: &FederationMessage) {
        if let Err(e) = self.store.save(message).await {
            error!(message_id = %message.id(), error = %e, "Failed to persist message status");
        }
    }
}
