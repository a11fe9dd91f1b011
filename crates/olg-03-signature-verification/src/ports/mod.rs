//! # Ports Layer
//!
//! - **Inbound (Driving)**: [`SignatureVerificationApi`]

pub mod inbound;

pub use inbound::SignatureVerificationApi;
