//! # OLG-01 Instance Registry
//!
//! Authoritative record of known peer instances.
//!
//! **Subsystem ID:** 1
//! **Architecture:** Hexagonal (Domain + Ports/Adapters)
//!
//! ## Responsibilities
//!
//! - Register peers with a unique domain, name and generated API credential
//! - Enforce the moderated status lifecycle
//!   (`pending → active`, `active → suspended | inactive`, `suspended → active`)
//! - Authenticate inbound calls by credential
//! - Track `last_seen` on successful contact
//!
//! Every write goes through an optimistic version check in the store, so a
//! racing writer gets [`RegistryError::ConcurrentModification`] instead of
//! silently overwriting a moderator's decision.
//!
//! ## Module Structure
//!
//! ```text
//! olg-01-instance-registry/
//! ├── domain/     # RegistryError, field validation
//! ├── ports/      # RegistryApi (inbound), InstanceStore (outbound)
//! ├── adapters/   # InMemoryInstanceStore
//! ├── service.rs  # RegistryService
//! └── config.rs   # RegistryConfig
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod adapters;
pub mod config;
pub mod domain;
pub mod ports;
pub mod service;

pub use adapters::InMemoryInstanceStore;
pub use config::RegistryConfig;
pub use domain::{validate_registration, RegistryError};
pub use ports::{InstanceStore, RegistryApi, StoreError};
pub use service::RegistryService;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
