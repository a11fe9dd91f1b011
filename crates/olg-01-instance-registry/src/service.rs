//! # Instance Registry Service
//!
//! Application service implementing [`RegistryApi`] on top of an
//! [`InstanceStore`].
//!
//! Moderator status changes are applied with a single compare-and-swap
//! attempt: losing the race surfaces as `ConcurrentModification` so the
//! moderator can re-read and decide again. Bookkeeping writes (`touch`,
//! trust flag, outbound credential) re-read and retry because they do not
//! depend on the state they overwrite.

use crate::config::RegistryConfig;
use crate::domain::{validate_registration, RegistryError};
use crate::ports::inbound::RegistryApi;
use crate::ports::outbound::{InstanceStore, StoreError};
use async_trait::async_trait;
use rand::RngCore;
use shared_bus::{EventPublisher, FederationEvent};
use shared_types::{
    normalize_domain, Instance, InstanceId, InstanceRegistration, InstanceStatus, TimeSource,
};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Instance registry service.
pub struct RegistryService<S: InstanceStore> {
    store: Arc<S>,
    events: Arc<dyn EventPublisher>,
    time: Arc<dyn TimeSource>,
    config: RegistryConfig,
}

impl<S: InstanceStore> RegistryService<S> {
    /// Create a new registry service.
    pub fn new(
        store: Arc<S>,
        events: Arc<dyn EventPublisher>,
        time: Arc<dyn TimeSource>,
        config: RegistryConfig,
    ) -> Self {
        Self {
            store,
            events,
            time,
            config,
        }
    }

    /// Active configuration.
    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    fn generate_api_key(&self) -> String {
        let mut bytes = vec![0u8; self.config.api_key_bytes.max(16)];
        rand::thread_rng().fill_bytes(&mut bytes);
        hex::encode(bytes)
    }

    /// Register a peer with a credential agreed out of band, for peers
    /// bootstrapped from configuration. The credential must be at least
    /// as long as a generated one.
    pub async fn register_with_credential(
        &self,
        registration: InstanceRegistration,
        api_key: String,
    ) -> Result<Instance, RegistryError> {
        let api_key = api_key.trim().to_string();
        let min_len = self.config.api_key_bytes.max(16) * 2;
        if api_key.len() < min_len {
            return Err(RegistryError::InvalidField {
                field: "api_key",
                reason: format!("must be at least {min_len} characters"),
            });
        }
        self.insert_new(registration, api_key).await
    }

    async fn insert_new(
        &self,
        registration: InstanceRegistration,
        api_key: String,
    ) -> Result<Instance, RegistryError> {
        validate_registration(&registration, &self.config)?;

        let domain = normalize_domain(&registration.domain);
        if self.store.find_by_domain(&domain).await?.is_some() {
            warn!(domain = %domain, "Rejected duplicate instance registration");
            return Err(RegistryError::DuplicateInstance {
                field: "domain",
                value: domain,
            });
        }

        let instance = Instance::new(registration, api_key, self.time.now());
        let stored = self.store.insert(instance).await?;

        info!(
            instance_id = %stored.id,
            domain = %stored.domain,
            name = %stored.name,
            "Registered federation instance"
        );
        Ok(stored)
    }

    async fn fetch(&self, id: InstanceId) -> Result<Instance, RegistryError> {
        self.store
            .get(id)
            .await?
            .ok_or(RegistryError::NotFound(id))
    }

    /// Read-modify-write with up to `attempts` tries against version races.
    async fn update_with<F>(
        &self,
        id: InstanceId,
        attempts: u32,
        mutate: F,
    ) -> Result<Instance, RegistryError>
    where
        F: Fn(&mut Instance) -> Result<(), RegistryError> + Send + Sync,
    {
        let attempts = attempts.max(1);
        let mut attempt = 0;
        loop {
            attempt += 1;
            let mut instance = self.fetch(id).await?;
            mutate(&mut instance)?;
            match self.store.update(instance).await {
                Ok(stored) => return Ok(stored),
                Err(StoreError::VersionConflict { .. }) if attempt < attempts => {
                    debug!(instance_id = %id, attempt, "Version race on instance update, retrying");
                }
                Err(e) => return Err(e.into()),
            }
        }
    }
}

#[async_trait]
impl<S: InstanceStore + 'static> RegistryApi for RegistryService<S> {
    async fn register(&self, registration: InstanceRegistration) -> Result<Instance, RegistryError> {
        self.insert_new(registration, self.generate_api_key()).await
    }

    async fn lookup(&self, id: InstanceId) -> Result<Instance, RegistryError> {
        self.fetch(id).await
    }

    async fn lookup_by_domain(&self, domain: &str) -> Result<Instance, RegistryError> {
        let domain = normalize_domain(domain);
        self.store
            .find_by_domain(&domain)
            .await?
            .ok_or(RegistryError::DomainNotFound(domain))
    }

    async fn authenticate(&self, api_key: &str) -> Result<Instance, RegistryError> {
        if api_key.is_empty() {
            return Err(RegistryError::Unauthorized);
        }
        self.store
            .find_by_api_key(api_key)
            .await?
            .ok_or(RegistryError::Unauthorized)
    }

    async fn set_status(&self, id: InstanceId, status: InstanceStatus) -> Result<Instance, RegistryError> {
        let mut instance = self.fetch(id).await?;
        let from = instance.status;
        instance.transition(status, self.time.now())?;

        let stored = self.store.update(instance).await.map_err(|e| {
            if let StoreError::VersionConflict { .. } = e {
                warn!(instance_id = %id, to = %status, "Concurrent status change detected");
            }
            RegistryError::from(e)
        })?;

        info!(
            instance_id = %stored.id,
            domain = %stored.domain,
            from = %from,
            to = %status,
            "Instance status changed"
        );
        self.events
            .publish(FederationEvent::InstanceStatusChanged {
                instance_id: stored.id,
                domain: stored.domain.clone(),
                from,
                to: status,
            })
            .await;
        Ok(stored)
    }

    async fn mark_trusted(&self, id: InstanceId, trusted: bool) -> Result<Instance, RegistryError> {
        let now = self.time.now();
        let stored = self
            .update_with(id, self.config.max_update_attempts, |instance| {
                instance.is_trusted = trusted;
                instance.updated_at = now;
                Ok(())
            })
            .await?;
        info!(instance_id = %id, trusted, "Instance trust flag updated");
        Ok(stored)
    }

    async fn set_outbound_credential(&self, id: InstanceId, api_key: String) -> Result<Instance, RegistryError> {
        let api_key = api_key.trim().to_string();
        if api_key.is_empty() {
            return Err(RegistryError::InvalidField {
                field: "outbound_api_key",
                reason: "must not be empty".into(),
            });
        }
        let now = self.time.now();
        self.update_with(id, self.config.max_update_attempts, |instance| {
            instance.outbound_api_key = Some(api_key.clone());
            instance.updated_at = now;
            Ok(())
        })
        .await
    }

    async fn touch(&self, id: InstanceId) -> Result<Instance, RegistryError> {
        let now = self.time.now();
        self.update_with(id, self.config.max_update_attempts, |instance| {
            instance.touch(now);
            Ok(())
        })
        .await
    }

    async fn list(&self, status: Option<InstanceStatus>) -> Result<Vec<Instance>, RegistryError> {
        let mut instances: Vec<Instance> = self
            .store
            .list()
            .await?
            .into_iter()
            .filter(|i| status.map_or(true, |s| i.status == s))
            .collect();
        instances.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.domain.cmp(&b.domain)));
        Ok(instances)
    }
}
