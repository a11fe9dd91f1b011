//! # OLG-02 Message Envelope Codec
//!
//! Canonical wire form of federation envelopes.
//!
//! **Subsystem ID:** 2
//! **Architecture:** Hexagonal (pure domain, inbound port only)
//!
//! ## Wire Format
//!
//! ```text
//! {"created_at":"2024-03-01T12:00:00Z","from":"a.example.edu","id":"…",
//!  "payload":{…},"signature":"<128 hex>","subject":"sync.pull",
//!  "to":"b.example.edu","type":"sync_request"}
//! ```
//!
//! Keys are sorted at every depth and no whitespace is emitted. The bytes a
//! signature covers are the same document without the `signature` key.
//!
//! ## Module Structure
//!
//! ```text
//! olg-02-envelope-codec/
//! ├── domain/     # canonical JSON, CodecError
//! ├── ports/      # EnvelopeCodecApi
//! ├── service.rs  # EnvelopeCodec
//! └── config.rs   # CodecConfig
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod domain;
pub mod ports;
pub mod service;

pub use config::{CodecConfig, DEFAULT_MAX_ENVELOPE_BYTES};
pub use domain::{to_canonical_string, CodecError};
pub use ports::EnvelopeCodecApi;
pub use service::{format_timestamp, EnvelopeCodec, ENVELOPE_FIELDS, SIGNATURE_HEX_LEN};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
