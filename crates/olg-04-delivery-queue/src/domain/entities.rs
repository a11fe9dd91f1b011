//! # Delivery Entities

use super::errors::DeliveryError;
use shared_types::{Instance, InstanceId, MessageId};
use tokio::sync::oneshot;

/// Where and how to deliver to one peer.
#[derive(Clone, PartialEq, Eq)]
pub struct DeliveryTarget {
    /// Registry id of the peer; one lane per id.
    pub instance_id: InstanceId,
    /// Peer domain, for logs.
    pub domain: String,
    /// Base URL of the peer's federation API.
    pub api_url: String,
    /// Credential the peer issued to this node.
    pub api_key: String,
}

impl DeliveryTarget {
    /// Target for a registered instance.
    ///
    /// # Errors
    ///
    /// `MissingCredential` if the peer never issued this node a credential.
    pub fn from_instance(instance: &Instance) -> Result<Self, DeliveryError> {
        let api_key = instance
            .outbound_api_key
            .clone()
            .ok_or(DeliveryError::MissingCredential(instance.id))?;
        Ok(Self {
            instance_id: instance.id,
            domain: instance.domain.clone(),
            api_url: instance.api_url.clone(),
            api_key,
        })
    }

    /// Endpoint that accepts federation envelopes.
    pub fn messages_url(&self) -> String {
        format!("{}/federation/v1/messages", self.api_url.trim_end_matches('/'))
    }
}

impl std::fmt::Debug for DeliveryTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeliveryTarget")
            .field("instance_id", &self.instance_id)
            .field("domain", &self.domain)
            .field("api_url", &self.api_url)
            .finish_non_exhaustive()
    }
}

/// Result of one successful transport attempt.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TransportReceipt {
    /// The peer processed the message (vs. only queued it).
    pub acknowledged: bool,
    /// Response body, if the peer returned one.
    pub response: Option<Vec<u8>>,
}

impl TransportReceipt {
    /// Acknowledged with an optional body.
    pub fn acknowledged(response: Option<Vec<u8>>) -> Self {
        Self {
            acknowledged: true,
            response,
        }
    }

    /// Accepted for later processing.
    pub fn accepted() -> Self {
        Self::default()
    }
}

/// Terminal result of a queued delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// Peer acknowledged; its response body, if any.
    Delivered {
        /// Raw response bytes.
        response: Option<Vec<u8>>,
    },
    /// Peer accepted without acknowledgment.
    Sent,
    /// Delivery given up.
    Failed {
        /// Last failure.
        reason: String,
        /// Retries performed.
        retry_count: u32,
        /// Whether the last failure was transient.
        transient: bool,
    },
}

impl DeliveryOutcome {
    /// Delivered or sent.
    pub fn is_success(&self) -> bool {
        !matches!(self, DeliveryOutcome::Failed { .. })
    }
}

/// Handle resolving to a message's terminal outcome.
#[derive(Debug)]
pub struct DeliveryTicket {
    message_id: MessageId,
    receiver: oneshot::Receiver<DeliveryOutcome>,
}

impl DeliveryTicket {
    pub(crate) fn new(message_id: MessageId, receiver: oneshot::Receiver<DeliveryOutcome>) -> Self {
        Self {
            message_id,
            receiver,
        }
    }

    /// Message this ticket tracks.
    pub fn message_id(&self) -> MessageId {
        self.message_id
    }

    /// Wait for the terminal outcome.
    pub async fn wait(self) -> DeliveryOutcome {
        self.receiver.await.unwrap_or_else(|_| DeliveryOutcome::Failed {
            reason: "delivery queue shut down".into(),
            retry_count: 0,
            transient: true,
        })
    }
}

/// How an HTTP status from a peer is treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpDisposition {
    /// 2xx other than 202: processed.
    Acknowledged,
    /// 202: queued by the peer.
    Accepted,
    /// 408, 429, 5xx: retry.
    Transient,
    /// Everything else: give up.
    Permanent,
}

/// Classify a peer's HTTP status code.
pub fn classify_status(status: u16) -> HttpDisposition {
    match status {
        202 => HttpDisposition::Accepted,
        200..=299 => HttpDisposition::Acknowledged,
        408 | 429 | 500..=599 => HttpDisposition::Transient,
        _ => HttpDisposition::Permanent,
    }
}
