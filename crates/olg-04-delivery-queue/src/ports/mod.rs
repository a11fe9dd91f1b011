//! # Ports Layer
//!
//! - **Inbound (Driving)**: [`DeliveryQueueApi`]
//! - **Outbound (Driven)**: [`FederationTransport`], [`MessageStore`]

pub mod inbound;
pub mod outbound;

pub use inbound::DeliveryQueueApi;
pub use outbound::{FederationTransport, MessageStore, MessageStoreError};
