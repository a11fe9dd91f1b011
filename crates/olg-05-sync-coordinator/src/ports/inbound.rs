//! # Inbound Ports (Driving Ports / API)

use crate::domain::{InboundError, SyncError};
use async_trait::async_trait;
use shared_types::{InstanceId, SessionId, SyncSession, SyncType};

use crate::service::SyncHandle;

/// Sync Coordinator API.
#[async_trait]
pub trait SyncCoordinatorApi: Send + Sync {
    /// Start a session in the background.
    ///
    /// # Errors
    ///
    /// - `Registry` if the instance is unknown
    /// - `PeerNotActive` / `PeerNotTrusted` / `MissingCredential`
    /// - `AlreadyRunning` if a session with this instance is in progress
    async fn start_sync(&self, instance: InstanceId, sync_type: SyncType) -> Result<SyncHandle, SyncError>;

    /// Run a session to its terminal state.
    async fn sync(&self, instance: InstanceId, sync_type: SyncType) -> Result<SyncSession, SyncError> {
        self.start_sync(instance, sync_type).await?.wait().await
    }

    /// Ask a running session to stop; it becomes `failed` at its next
    /// await point.
    async fn cancel(&self, session: SessionId) -> Result<(), SyncError>;

    /// Current record of a session.
    async fn session(&self, session: SessionId) -> Result<SyncSession, SyncError>;

    /// Sessions with an instance, newest first.
    async fn sessions_for(&self, instance: InstanceId) -> Result<Vec<SyncSession>, SyncError>;

    /// Whether a session with this instance is running.
    fn is_running(&self, instance: InstanceId) -> bool;
}

/// What the inbound endpoint returns for an accepted message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundReply {
    /// Recorded; nothing to return.
    Acknowledged,
    /// Encoded, signed `sync_response` envelope.
    Response(Vec<u8>),
}

/// Inbound federation processor API.
#[async_trait]
pub trait InboundApi: Send + Sync {
    /// Authenticate, decode, verify and handle one inbound envelope.
    async fn handle(&self, api_key: &str, body: &[u8]) -> Result<InboundReply, InboundError>;
}
