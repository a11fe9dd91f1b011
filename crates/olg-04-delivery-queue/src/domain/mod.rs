//! # Domain Module
//!
//! Delivery targets and outcomes, the backoff schedule, HTTP status
//! classification and errors.

pub mod backoff;
pub mod entities;
pub mod errors;

pub use backoff::BackoffPolicy;
pub use entities::{
    classify_status, DeliveryOutcome, DeliveryTarget, DeliveryTicket, HttpDisposition,
    TransportReceipt,
};
pub use errors::{DeliveryError, TransportError};
