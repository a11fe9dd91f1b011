//! # Outbound Ports (Driven Ports / SPI)
//!
//! Persistence for instance records.

use async_trait::async_trait;
use shared_types::{Instance, InstanceId};
use thiserror::Error;

/// Errors from instance storage.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    /// A unique field collided with an existing record.
    #[error("duplicate {field} '{value}'")]
    Duplicate {
        /// `domain`, `name` or `api_key`.
        field: &'static str,
        /// The colliding value.
        value: String,
    },

    /// No record with this id.
    #[error("instance {0} not found")]
    NotFound(InstanceId),

    /// The stored version differs from the writer's expectation.
    #[error("version conflict on {id}: expected {expected}, found {actual}")]
    VersionConflict {
        /// Instance id.
        id: InstanceId,
        /// Version the writer read.
        expected: u64,
        /// Version currently stored.
        actual: u64,
    },

    /// Backend failure.
    #[error("backend error: {0}")]
    Backend(String),
}

/// Instance persistence.
///
/// Uniqueness of `domain`, `name` and `api_key` is enforced by the store so
/// that two concurrent registrations cannot both succeed.
#[async_trait]
pub trait InstanceStore: Send + Sync {
    /// Insert a new instance.
    async fn insert(&self, instance: Instance) -> Result<Instance, StoreError>;

    /// Fetch by id.
    async fn get(&self, id: InstanceId) -> Result<Option<Instance>, StoreError>;

    /// Fetch by normalized domain.
    async fn find_by_domain(&self, domain: &str) -> Result<Option<Instance>, StoreError>;

    /// Fetch by API credential.
    async fn find_by_api_key(&self, api_key: &str) -> Result<Option<Instance>, StoreError>;

    /// Compare-and-swap write: succeeds only if the stored version equals
    /// `instance.version`. Returns the stored record with its bumped version.
    async fn update(&self, instance: Instance) -> Result<Instance, StoreError>;

    /// All instances.
    async fn list(&self) -> Result<Vec<Instance>, StoreError>;
}
