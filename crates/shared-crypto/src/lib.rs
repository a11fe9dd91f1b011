//! # Shared Crypto
//!
//! Ed25519 key material for federation instances.
//!
//! | Type | Encoding on the wire |
//! |------|----------------------|
//! | [`Ed25519PublicKey`] | 64 lowercase hex chars |
//! | [`Ed25519Signature`] | 128 lowercase hex chars |
//! | [`Ed25519KeyPair`] | 32-byte seed, hex in configuration |
//!
//! Signatures are deterministic: the same seed and message always produce
//! the same signature.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod errors;
pub mod signatures;

pub use errors::CryptoError;
pub use signatures::{Ed25519KeyPair, Ed25519PublicKey, Ed25519Signature};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
