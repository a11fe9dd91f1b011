//! # Federation Envelope
//!
//! The unit exchanged between instances. On the wire sender and recipient
//! are instance **domains**, the only identifiers both sides agree on.
//!
//! The signature covers every other field; see the envelope codec for the
//! canonical byte form.

use crate::entities::{MessageId, MessageType};
use crate::time::Timestamp;
use serde::{Deserialize, Serialize};

/// A signed federation message as it travels between instances.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// Unique message id, also used for replay detection.
    pub id: MessageId,
    /// Sender domain.
    pub from: String,
    /// Recipient domain.
    pub to: String,
    /// Message type.
    #[serde(rename = "type")]
    pub message_type: MessageType,
    /// Short human-readable subject (`sync.pull`, `sync.push`, ...).
    pub subject: String,
    /// Opaque JSON payload.
    pub payload: serde_json::Value,
    /// Hex Ed25519 signature, empty until signed.
    pub signature: String,
    /// Creation time at the sender.
    pub created_at: Timestamp,
}

impl Envelope {
    /// Create an unsigned envelope with a fresh id.
    pub fn new(
        from: impl Into<String>,
        to: impl Into<String>,
        message_type: MessageType,
        subject: impl Into<String>,
        payload: serde_json::Value,
        created_at: Timestamp,
    ) -> Self {
        Self {
            id: MessageId::new(),
            from: from.into(),
            to: to.into(),
            message_type,
            subject: subject.into(),
            payload,
            signature: String::new(),
            created_at,
        }
    }

    /// Whether a signature has been attached.
    pub fn is_signed(&self) -> bool {
        !self.signature.is_empty()
    }
}
