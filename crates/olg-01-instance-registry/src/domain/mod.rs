//! # Domain Module
//!
//! Registry errors and registration rules. The `Instance` entity itself
//! lives in `shared-types` because every other subsystem reads it.

pub mod errors;
pub mod validation;

pub use errors::RegistryError;
pub use validation::{validate_api_url, validate_domain, validate_registration, MAX_FIELD_LEN};
