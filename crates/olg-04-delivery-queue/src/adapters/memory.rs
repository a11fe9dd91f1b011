//! In-memory `MessageStore`.

use crate::ports::outbound::{MessageStore, MessageStoreError};
use async_trait::async_trait;
use parking_lot::RwLock;
use shared_types::{FederationMessage, InstanceId, MessageId};
use std::collections::HashMap;

#[derive(Default)]
struct Inner {
    messages: HashMap<MessageId, FederationMessage>,
    order: Vec<MessageId>,
}

/// Message store backed by a hash map, remembering insertion order.
#[derive(Default)]
pub struct InMemoryMessageStore {
    inner: RwLock<Inner>,
}

impl InMemoryMessageStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored messages.
    pub fn len(&self) -> usize {
        self.inner.read().messages.len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every stored message, oldest first.
    pub fn all(&self) -> Vec<FederationMessage> {
        let inner = self.inner.read();
        inner
            .order
            .iter()
            .filter_map(|id| inner.messages.get(id).cloned())
            .collect()
    }
}

#[async_trait]
impl MessageStore for InMemoryMessageStore {
    async fn save(&self, message: &FederationMessage) -> Result<(), MessageStoreError> {
        let mut inner = self.inner.write();
        let id = message.id();
        if inner.messages.insert(id, message.clone()).is_none() {
            inner.order.push(id);
        }
        Ok(())
    }

    async fn get(&self, id: MessageId) -> Result<Option<FederationMessage>, MessageStoreError> {
        Ok(self.inner.read().messages.get(&id).cloned())
    }

    async fn list_for_peer(&self, peer: InstanceId) -> Result<Vec<FederationMessage>, MessageStoreError> {
        Ok(self.all().into_iter().filter(|m| m.peer == peer).collect())
    }
}
