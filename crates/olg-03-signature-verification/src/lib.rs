//! # OLG-03 Signature Verification
//!
//! Ed25519 signing of outbound envelopes and fail-closed verification of
//! inbound ones.
//!
//! **Subsystem ID:** 3
//! **Architecture:** Hexagonal (Domain + Ports)
//!
//! ## Security
//!
//! - Verification uses strict Ed25519 (`verify_strict`), rejecting
//!   small-order keys and non-canonical signatures
//! - [`SignatureVerificationApi::verify`] returns `false` for every failure
//!   mode: bad key, bad signature encoding, wrong key, tampered bytes
//! - The signing seed is zeroized on drop and never printed
//!
//! ## Module Structure
//!
//! ```text
//! olg-03-signature-verification/
//! ├── domain/     # Ed25519 helpers, LocalIdentity, SignatureError
//! ├── ports/      # SignatureVerificationApi
//! └── service.rs  # SignatureVerifier
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod domain;
pub mod ports;
pub mod service;

pub use domain::{LocalIdentity, SignatureError};
pub use ports::SignatureVerificationApi;
pub use service::SignatureVerifier;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
