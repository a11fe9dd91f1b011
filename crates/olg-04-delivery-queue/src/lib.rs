//! # OLG-04 Delivery Queue
//!
//! Reliable, ordered delivery of signed envelopes to peer instances.
//!
//! **Subsystem ID:** 4
//! **Architecture:** Hexagonal (Domain + Ports/Adapters)
//!
//! ## Delivery Rules
//!
//! | Transport result | Message status | Next step |
//! |------------------|----------------|-----------|
//! | acknowledged (2xx) | `sent` → `delivered` | next message |
//! | accepted (202) | `sent` | next message |
//! | transient (network, timeout, 408, 429, 5xx) | `pending`, `retry_count + 1` | sleep, retry |
//! | transient after `max_retries` | `failed` | next message |
//! | permanent (other 4xx) | `failed` | next message |
//!
//! ## Module Structure
//!
//! ```text
//! olg-04-delivery-queue/
//! ├── domain/     # targets, outcomes, BackoffPolicy, errors
//! ├── ports/      # DeliveryQueueApi, FederationTransport, MessageStore
//! ├── adapters/   # InMemoryMessageStore, HttpTransport (feature "http")
//! ├── service.rs  # DeliveryQueue (one lane task per peer)
//! └── config.rs   # DeliveryConfig
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod adapters;
pub mod config;
pub mod domain;
pub mod ports;
pub mod service;

#[cfg(feature = "http")]
pub use adapters::{HttpTransport, FEDERATION_KEY_HEADER};
pub use adapters::InMemoryMessageStore;
pub use config::DeliveryConfig;
pub use domain::{
    classify_status, BackoffPolicy, DeliveryError, DeliveryOutcome, DeliveryTarget,
    DeliveryTicket, HttpDisposition, TransportError, TransportReceipt,
};
pub use ports::{DeliveryQueueApi, FederationTransport, MessageStore, MessageStoreError};
pub use service::DeliveryQueue;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
