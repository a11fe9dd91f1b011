//! # Adapters Layer
//!
//! - [`InMemoryMessageStore`]: message persistence
//! - `HttpTransport` (feature `http`): `reqwest` transport

#[cfg(feature = "http")]
mod http;
mod memory;

#[cfg(feature = "http")]
pub use http::{HttpTransport, FEDERATION_KEY_HEADER};
pub use memory::InMemoryMessageStore;
