//! # Ports Layer
//!
//! The codec is pure, so it only exposes an inbound port,
//! [`EnvelopeCodecApi`].

pub mod inbound;

pub use inbound::EnvelopeCodecApi;
