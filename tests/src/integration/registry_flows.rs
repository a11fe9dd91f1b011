//! # Registry Flows
//!
//! Registration rules, lifecycle transitions and their audit trail, trust
//! requirements, and peers bootstrapped from configuration.

#[cfg(test)]
mod tests {
    use crate::harness::{record, Federation, TestNode};
    use axum::http::StatusCode;
    use node_runtime::container::PeerConfig;
    use olg_01_instance_registry::{RegistryApi, RegistryError};
    use olg_03_signature_verification::LocalIdentity;
    use olg_05_sync_coordinator::{SyncCoordinatorApi, SyncError};
    use serde_json::json;
    use shared_types::{
        AuditRecord, EntityKind, EntityRef, InstanceRegistration, InstanceStatus, MessageType,
        SyncStatus, SyncType,
    };
    use std::time::Duration;

    const SEED_A: &str = "9d61b19deffd5a60ba844af492ec2cc44449c5697b326919703bac031cae7f60";
    const SEED_B: &str = "4ccd089b28ff96da9db6c346ec114e0f5b8a319f35aba624da8cf6ed4fb8a6fb";

    fn registration(domain: &str) -> InstanceRegistration {
        InstanceRegistration {
            name: domain.to_string(),
            domain: domain.to_string(),
            api_url: format!("https://{domain}/api"),
            public_key: LocalIdentity::generate(domain).public_key_hex(),
            description: String::new(),
            outbound_api_key: None,
        }
    }

    async fn wait_for_audit(node: &TestNode, matches: impl Fn(&AuditRecord) -> bool) -> Vec<AuditRecord> {
        for _ in 0..200 {
            let found: Vec<_> = node
                .container
                .audit_log
                .entries()
                .into_iter()
                .filter(|r| matches(r))
                .collect();
            if !found.is_empty() {
                return found;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        Vec::new()
    }

    #[tokio::test]
    async fn test_domain_registered_once() {
        let federation = Federation::new();
        let node = federation.node("hub.example.edu");
        let registry = &node.container.registry;

        registry.register(registration("peer.example.edu")).await.unwrap();
        let again = registry.register(registration("Peer.Example.EDU")).await;
        assert!(matches!(
            again,
            Err(RegistryError::DuplicateInstance { field: "domain", .. })
        ));
        assert_eq!(registry.list(None).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_illegal_transitions_refused() {
        let federation = Federation::new();
        let node = federation.node("hub.example.edu");
        let registry = &node.container.registry;
        let peer = registry.register(registration("peer.example.edu")).await.unwrap();
        assert_eq!(peer.status, InstanceStatus::Pending);

        assert!(matches!(
            registry.set_status(peer.id, InstanceStatus::Suspended).await,
            Err(RegistryError::InvalidTransition(_))
        ));
        registry.set_status(peer.id, InstanceStatus::Active).await.unwrap();
        assert!(matches!(
            registry.set_status(peer.id, InstanceStatus::Pending).await,
            Err(RegistryError::InvalidTransition(_))
        ));
        registry.set_status(peer.id, InstanceStatus::Inactive).await.unwrap();
        assert!(matches!(
            registry.set_status(peer.id, InstanceStatus::Active).await,
            Err(RegistryError::InvalidTransition(_))
        ));
        assert_eq!(
            registry.lookup(peer.id).await.unwrap().status,
            InstanceStatus::Inactive
        );
    }

    #[tokio::test]
    async fn test_transitions_and_sessions_audited() {
        let federation = Federation::new();
        let local = federation.node("local.example.edu");
        let remote = federation.node("remote.example.edu");
        local.start().await;

        let link = federation.connect(&local, &remote).await;
        let subject = EntityRef::new(EntityKind::Instance, link.b_in_a.to_string());
        let activated = wait_for_audit(&local, |r| r.subject == subject).await;
        assert_eq!(activated.len(), 1);
        assert_eq!(activated[0].action, "status_changed");
        assert_eq!(activated[0].old_value, Some(json!({ "status": "pending" })));
        assert_eq!(activated[0].new_value.as_ref().unwrap()["status"], "active");

        remote.container.records.upsert(record(EntityKind::Course, "c1", 1));
        let session = local
            .container
            .coordinator
            .sync(link.b_in_a, SyncType::Full)
            .await
            .unwrap();
        let session_ref = EntityRef::new(EntityKind::SyncSession, session.id.to_string());
        let completed = wait_for_audit(&local, |r| r.subject == session_ref).await;
        assert_eq!(completed.len(), 1);
        assert_eq!(completed[0].action, "sync_completed");
        assert_eq!(completed[0].new_value.as_ref().unwrap()["records_synced"], 1);

        local.runtime.shutdown();
    }

    #[tokio::test]
    async fn test_untrusted_peer_refused_when_trust_required() {
        let federation = Federation::new();
        let mut config = Federation::config("local.example.edu");
        config.sync.require_trusted_peers = true;
        let local = federation.node_with(config);
        let remote = federation.node("remote.example.edu");
        let link = federation.connect(&local, &remote).await;

        let coordinator = &local.container.coordinator;
        assert!(matches!(
            coordinator.sync(link.b_in_a, SyncType::Full).await,
            Err(SyncError::PeerNotTrusted(_))
        ));

        local.container.registry.mark_trusted(link.b_in_a, true).await.unwrap();
        let session = coordinator.sync(link.b_in_a, SyncType::Full).await.unwrap();
        assert_eq!(session.status, SyncStatus::Completed);
    }

    #[tokio::test]
    async fn test_untrusted_sender_forbidden_when_trust_required() {
        let federation = Federation::new();
        let local = federation.node("local.example.edu");
        let mut config = Federation::config("remote.example.edu");
        config.sync.require_trusted_peers = true;
        let remote = federation.node_with(config);
        let link = federation.connect(&local, &remote).await;

        let envelope = local.envelope(remote.domain(), MessageType::Notification, "course.published", json!({}));
        let reply = remote.post(Some(&link.a_key_at_b), local.encode(&envelope)).await;
        assert_eq!(reply.status, StatusCode::FORBIDDEN);
        assert_eq!(reply.error_code().as_deref(), Some("forbidden"));

        remote.container.registry.mark_trusted(link.a_in_b, true).await.unwrap();
        let envelope = local.envelope(remote.domain(), MessageType::Notification, "course.published", json!({}));
        let reply = remote.post(Some(&link.a_key_at_b), local.encode(&envelope)).await;
        assert_eq!(reply.status, StatusCode::NO_CONTENT);
    }

    #[tokio::test]
    async fn test_peers_bootstrapped_from_config_sync() {
        let a_domain = "a.example.edu";
        let b_domain = "b.example.edu";
        let a_key = LocalIdentity::from_seed_hex(a_domain, SEED_A).unwrap().public_key_hex();
        let b_key = LocalIdentity::from_seed_hex(b_domain, SEED_B).unwrap().public_key_hex();
        let key_a_presents = "a1".repeat(32);
        let key_b_presents = "b2".repeat(32);

        let federation = Federation::new();
        let mut a_config = Federation::config(a_domain);
        a_config.identity.signing_seed = SEED_A.into();
        a_config.peers.push(PeerConfig {
            name: "B".into(),
            domain: b_domain.into(),
            api_url: format!("https://{b_domain}/api"),
            public_key: b_key,
            inbound_api_key: Some(key_b_presents.clone()),
            outbound_api_key: Some(key_a_presents.clone()),
            active: true,
            trusted: true,
            ..PeerConfig::default()
        });
        let mut b_config = Federation::config(b_domain);
        b_config.identity.signing_seed = SEED_B.into();
        b_config.peers.push(PeerConfig {
            name: "A".into(),
            domain: a_domain.into(),
            api_url: format!("https://{a_domain}/api"),
            public_key: a_key,
            inbound_api_key: Some(key_a_presents),
            outbound_api_key: Some(key_b_presents),
            active: true,
            ..PeerConfig::default()
        });

        let a = federation.node_with(a_config);
        let b = federation.node_with(b_config);
        a.start().await;
        b.start().await;
        // Starting twice does not register the peer again.
        a.start().await;

        let b_in_a = a.container.registry.lookup_by_domain(b_domain).await.unwrap();
        assert_eq!(b_in_a.status, InstanceStatus::Active);
        assert!(b_in_a.is_trusted);
        assert_eq!(a.container.registry.list(None).await.unwrap().len(), 1);
        let a_in_b = b.container.registry.lookup_by_domain(a_domain).await.unwrap();
        assert!(!a_in_b.is_trusted);

        b.container.records.upsert(record(EntityKind::Course, "shared-course", 3));
        let session = a
            .container
            .coordinator
            .sync(b_in_a.id, SyncType::Full)
            .await
            .unwrap();
        assert_eq!(session.status, SyncStatus::Completed);
        assert_eq!(session.records_synced, 1);

        a.runtime.shutdown();
        b.runtime.shutdown();
    }
}
