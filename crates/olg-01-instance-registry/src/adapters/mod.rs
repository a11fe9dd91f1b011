//! # Adapters Layer
//!
//! Implementations of the registry's outbound ports.

mod memory;

pub use memory::InMemoryInstanceStore;
