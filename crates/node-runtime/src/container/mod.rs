//! # Federation Container
//!
//! Configuration and dependency injection for one node.
//!
//! - Subsystems are built once, in dependency order (registry, codec,
//!   delivery queue, then the sync services)
//! - Handlers and the HTTP surface receive `Arc`s from the container

pub mod config;
pub mod services;

pub use config::{ConfigError, Environment, IdentityConfig, NodeConfig, PeerConfig, ServerConfig};
pub use services::{ContainerError, FederationContainer, NodeRegistry};
