//! In-memory `SessionStore`.

use crate::ports::outbound::{SessionStore, SyncStoreError};
use async_trait::async_trait;
use parking_lot::RwLock;
use shared_types::{InstanceId, SessionId, SyncSession, SyncStatus, SyncType};
use std::collections::HashMap;

/// Session store backed by a hash map.
#[derive(Default)]
pub struct InMemorySessionStore {
    sessions: RwLock<HashMap<SessionId, SyncSession>>,
}

impl InMemorySessionStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn save(&self, session: &SyncSession) -> Result<(), SyncStoreError> {
        self.sessions.write().insert(session.id, session.clone());
        Ok(())
    }

    async fn get(&self, id: SessionId) -> Result<Option<SyncSession>, SyncStoreError> {
        Ok(self.sessions.read().get(&id).cloned())
    }

    async fn last_completed(
        &self,
        instance: InstanceId,
        sync_type: Option<SyncType>,
    ) -> Result<Option<SyncSession>, SyncStoreError> {
        Ok(self
            .sessions
            .read()
            .values()
            .filter(|s| s.instance == instance && s.status == SyncStatus::Completed)
            .filter(|s| sync_type.map_or(true, |t| s.sync_type == t))
            .max_by_key(|s| s.started_at)
            .cloned())
    }

    async fn list_for_instance(&self, instance: InstanceId) -> Result<Vec<SyncSession>, SyncStoreError> {
        let mut sessions: Vec<SyncSession> = self
            .sessions
            .read()
            .values()
            .filter(|s| s.instance == instance)
            .cloned()
            .collect();
        sessions.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        Ok(sessions)
    }
}
