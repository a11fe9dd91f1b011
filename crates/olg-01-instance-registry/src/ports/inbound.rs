//! # Inbound Ports (Driving Ports / API)

use crate::domain::RegistryError;
use async_trait::async_trait;
use shared_types::{Instance, InstanceId, InstanceRegistration, InstanceStatus};

/// Primary Instance Registry API.
///
/// Implementations must be thread-safe (`Send + Sync`).
#[async_trait]
pub trait RegistryApi: Send + Sync {
    /// Register a new peer in `pending` status with a fresh credential.
    ///
    /// # Errors
    ///
    /// - `DuplicateInstance` if the domain or name is already registered
    /// - `InvalidPublicKey` / `InvalidApiUrl` / `InvalidField` on bad input
    async fn register(&self, registration: InstanceRegistration) -> Result<Instance, RegistryError>;

    /// Fetch an instance by registry id.
    async fn lookup(&self, id: InstanceId) -> Result<Instance, RegistryError>;

    /// Fetch an instance by domain (normalized before lookup).
    async fn lookup_by_domain(&self, domain: &str) -> Result<Instance, RegistryError>;

    /// Resolve the instance that owns an API credential.
    async fn authenticate(&self, api_key: &str) -> Result<Instance, RegistryError>;

    /// Apply a moderator status change.
    ///
    /// # Errors
    ///
    /// - `InvalidTransition` for moves outside the lifecycle
    /// - `ConcurrentModification` if another writer got there first
    async fn set_status(&self, id: InstanceId, status: InstanceStatus) -> Result<Instance, RegistryError>;

    /// Set or clear the trust flag.
    async fn mark_trusted(&self, id: InstanceId, trusted: bool) -> Result<Instance, RegistryError>;

    /// Store the credential the peer issued to this node.
    async fn set_outbound_credential(&self, id: InstanceId, api_key: String) -> Result<Instance, RegistryError>;

    /// Record a successful contact (`last_seen = now`).
    async fn touch(&self, id: InstanceId) -> Result<Instance, RegistryError>;

    /// List instances, newest first, optionally filtered by status.
    async fn list(&self, status: Option<InstanceStatus>) -> Result<Vec<Instance>, RegistryError>;
}
