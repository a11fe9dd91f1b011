//! # Delivery Errors

use shared_types::{FederationError, InstanceId, MessageId};
use thiserror::Error;

/// Errors returned when handing a message to the queue.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DeliveryError {
    /// Only pending, signed, outbound messages are accepted.
    #[error("Message {id} rejected: {reason}")]
    Rejected {
        /// Message id.
        id: MessageId,
        /// Why it was refused.
        reason: String,
    },

    /// The peer has not issued a credential to this node.
    #[error("No outbound credential for instance {0}")]
    MissingCredential(InstanceId),

    /// Message persistence failed.
    #[error("Message store error: {0}")]
    Store(String),
}

impl From<DeliveryError> for FederationError {
    fn from(err: DeliveryError) -> Self {
        match err {
            DeliveryError::Store(reason) => FederationError::Storage(reason),
            other => FederationError::Validation(other.to_string()),
        }
    }
}

/// Failure of one transport attempt.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    /// Worth retrying: network error, timeout, 408, 429, 5xx.
    #[error("transient delivery failure: {0}")]
    Transient(String),

    /// Retrying cannot help: any other 4xx.
    #[error("permanent delivery failure{}: {reason}", .status.map(|s| format!(" (HTTP {s})")).unwrap_or_default())]
    Permanent {
        /// HTTP status, when there was one.
        status: Option<u16>,
        /// Peer's explanation.
        reason: String,
    },
}

impl TransportError {
    /// Whether the queue should retry.
    pub fn is_transient(&self) -> bool {
        matches!(self, TransportError::Transient(_))
    }
}

impl From<TransportError> for FederationError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Transient(reason) => FederationError::TransientDelivery(reason),
            e @ TransportError::Permanent { .. } => FederationError::PermanentDelivery(e.to_string()),
        }
    }
}
