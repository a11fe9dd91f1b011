//! # Domain Module

pub mod ed25519;
pub mod errors;
pub mod identity;

pub use ed25519::{sign_hex, verify_hex};
pub use errors::SignatureError;
pub use identity::LocalIdentity;
