//! # Adapters Layer
//!
//! In-memory implementations of the record and session ports.

mod records;
mod sessions;

pub use records::InMemoryRecordStore;
pub use sessions::InMemorySessionStore;
