//! # Codec Configuration

use serde::{Deserialize, Serialize};

/// Default ceiling on an encoded envelope (1 MiB).
pub const DEFAULT_MAX_ENVELOPE_BYTES: usize = 1024 * 1024;

/// Envelope codec configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CodecConfig {
    /// Largest input `decode` will parse.
    pub max_envelope_bytes: usize,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            max_envelope_bytes: DEFAULT_MAX_ENVELOPE_BYTES,
        }
    }
}
