//! # Domain Module
//!
//! Canonical JSON rules and codec errors.

pub mod canonical;
pub mod errors;

pub use canonical::to_canonical_string;
pub use errors::CodecError;
