//! # Open Learn Grid Node Runtime
//!
//! Wires the five federation subsystems into one node and serves the
//! federation HTTP API.
//!
//! ## Module Structure
//!
//! ```text
//! node-runtime/
//! ├── container/  # NodeConfig, FederationContainer (dependency injection)
//! ├── adapters/   # InMemoryAuditLog
//! ├── handlers/   # AuditTrailHandler, MetricsHandler (bus subscribers)
//! ├── api/        # axum router, error bodies
//! └── runtime.rs  # NodeRuntime (startup, serve, shutdown)
//! ```
//!
//! ## Subsystems
//!
//! 1. Instance Registry (olg-01)
//! 2. Envelope Codec (olg-02)
//! 3. Signature Verification (olg-03)
//! 4. Delivery Queue (olg-04)
//! 5. Sync Coordinator and inbound processor (olg-05)

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod adapters;
pub mod api;
pub mod container;
pub mod handlers;
pub mod runtime;

pub use container::{ConfigError, ContainerError, FederationContainer, NodeConfig};
pub use runtime::NodeRuntime;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
