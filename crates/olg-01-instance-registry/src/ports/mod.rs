//! # Ports Layer
//!
//! - **Inbound (Driving)**: [`RegistryApi`], used by the sync coordinator,
//!   the inbound processor and the runtime
//! - **Outbound (Driven)**: [`InstanceStore`], persistence

pub mod inbound;
pub mod outbound;

pub use inbound::RegistryApi;
pub use outbound::{InstanceStore, StoreError};
