//! In-memory `InstanceStore`.
//!
//! Unique indexes for domain, name and credential live under the same lock
//! as the records, so uniqueness and version checks are atomic.

use crate::ports::outbound::{InstanceStore, StoreError};
use async_trait::async_trait;
use parking_lot::RwLock;
use shared_types::{Instance, InstanceId};
use std::collections::HashMap;

#[derive(Default)]
struct Tables {
    instances: HashMap<InstanceId, Instance>,
    by_domain: HashMap<String, InstanceId>,
    by_name: HashMap<String, InstanceId>,
    by_api_key: HashMap<String, InstanceId>,
}

/// Instance store backed by hash maps.
#[derive(Default)]
pub struct InMemoryInstanceStore {
    tables: RwLock<Tables>,
}

impl InMemoryInstanceStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored instances.
    pub fn len(&self) -> usize {
        self.tables.read().instances.len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn name_key(name: &str) -> String {
    name.trim().to_lowercase()
}

#[async_trait]
impl InstanceStore for InMemoryInstanceStore {
    async fn insert(&self, instance: Instance) -> Result<Instance, StoreError> {
        let mut tables = self.tables.write();

        if tables.by_domain.contains_key(&instance.domain) {
            return Err(StoreError::Duplicate {
                field: "domain",
                value: instance.domain,
            });
        }
        let name = name_key(&instance.name);
        if tables.by_name.contains_key(&name) {
            return Err(StoreError::Duplicate {
                field: "name",
                value: instance.name,
            });
        }
        if tables.by_api_key.contains_key(&instance.api_key) {
            return Err(StoreError::Duplicate {
                field: "api_key",
                value: "<redacted>".to_string(),
            });
        }

        tables.by_domain.insert(instance.domain.clone(), instance.id);
        tables.by_name.insert(name, instance.id);
        tables.by_api_key.insert(instance.api_key.clone(), instance.id);
        tables.instances.insert(instance.id, instance.clone());
        Ok(instance)
    }

    async fn get(&self, id: InstanceId) -> Result<Option<Instance>, StoreError> {
        Ok(self.tables.read().instances.get(&id).cloned())
    }

    async fn find_by_domain(&self, domain: &str) -> Result<Option<Instance>, StoreError> {
        let tables = self.tables.read();
        Ok(tables
            .by_domain
            .get(domain)
            .and_then(|id| tables.instances.get(id))
            .cloned())
    }

    async fn find_by_api_key(&self, api_key: &str) -> Result<Option<Instance>, StoreError> {
        let tables = self.tables.read();
        Ok(tables
            .by_api_key
            .get(api_key)
            .and_then(|id| tables.instances.get(id))
            .cloned())
    }

    async fn update(&self, mut instance: Instance) -> Result<Instance, StoreError> {
        let mut tables = self.tables.write();
        let stored = tables
            .instances
            .get_mut(&instance.id)
            .ok_or(StoreError::NotFound(instance.id))?;

        if stored.version != instance.version {
            return Err(StoreError::VersionConflict {
                id: instance.id,
                expected: instance.version,
                actual: stored.version,
            });
        }
        if stored.domain != instance.domain
            || stored.api_key != instance.api_key
            || name_key(&stored.name) != name_key(&instance.name)
        {
            return Err(StoreError::Backend(
                "domain, name and api_key are immutable".to_string(),
            ));
        }

        instance.version += 1;
        *stored = instance.clone();
        Ok(instance)
    }

    async fn list(&self) -> Result<Vec<Instance>, StoreError> {
        Ok(self.tables.read().instances.values().cloned().collect())
    }
}
