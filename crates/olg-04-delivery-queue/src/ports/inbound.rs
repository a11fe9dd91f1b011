//! # Inbound Ports (Driving Ports / API)

use crate::domain::{DeliveryError, DeliveryTarget, DeliveryTicket};
use async_trait::async_trait;
use shared_types::{FederationMessage, MessageId};

/// Delivery Queue API.
#[async_trait]
pub trait DeliveryQueueApi: Send + Sync {
    /// Queue a message on its peer's lane.
    ///
    /// # Errors
    ///
    /// - `Rejected` unless the message is pending, signed, outbound and
    ///   addressed to `target`
    /// - `Store` if the initial record cannot be persisted
    async fn enqueue(
        &self,
        message: FederationMessage,
        target: DeliveryTarget,
    ) -> Result<DeliveryTicket, DeliveryError>;

    /// Current record of a queued or finished message.
    async fn message(&self, id: MessageId) -> Result<Option<FederationMessage>, DeliveryError>;

    /// Number of peers with a live lane.
    fn active_lanes(&self) -> usize;
}
