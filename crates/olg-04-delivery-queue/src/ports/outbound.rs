//! # Outbound Ports (Driven Ports / SPI)
//!
//! - [`FederationTransport`]: moves encoded envelopes to a peer
//! - [`MessageStore`]: persists message status for both directions

use crate::domain::{DeliveryTarget, TransportError, TransportReceipt};
use async_trait::async_trait;
use shared_types::{FederationMessage, InstanceId, MessageId};
use thiserror::Error;

/// Wire transport to peer instances.
#[async_trait]
pub trait FederationTransport: Send + Sync {
    /// Send one encoded envelope. Classifies failures as transient or
    /// permanent; the queue owns retries and timeouts.
    async fn deliver(
        &self,
        target: &DeliveryTarget,
        body: &[u8],
    ) -> Result<TransportReceipt, TransportError>;
}

/// Message persistence failure.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("message store: {0}")]
pub struct MessageStoreError(pub String);

/// Persistence for federation messages.
#[async_trait]
pub trait MessageStore: Send + Sync {
    /// Insert or replace by message id.
    async fn save(&self, message: &FederationMessage) -> Result<(), MessageStoreError>;

    /// Fetch by id.
    async fn get(&self, id: MessageId) -> Result<Option<FederationMessage>, MessageStoreError>;

    /// Messages exchanged with one peer, oldest first.
    async fn list_for_peer(&self, peer: InstanceId) -> Result<Vec<FederationMessage>, MessageStoreError>;
}
