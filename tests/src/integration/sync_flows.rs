//! # Sync Flows
//!
//! Sessions between complete nodes: paging, watermarks, bilateral exchange,
//! concurrency across peers, and last-writer-wins on apply.

#[cfg(test)]
mod tests {
    use crate::harness::{record, Federation};
    use chrono::Duration;
    use olg_01_instance_registry::RegistryApi;
    use olg_04_delivery_queue::MessageStore;
    use olg_05_sync_coordinator::SyncCoordinatorApi;
    use shared_types::{Direction, EntityKind, EntityRef, MessageStatus, SyncStatus, SyncType, TimeSource};

    #[tokio::test]
    async fn test_full_sync_pulls_all_pages() {
        let federation = Federation::new();
        let local = federation.node("local.example.edu");
        let remote = federation.node("remote.example.edu");
        let link = federation.connect(&local, &remote).await;

        for i in 0..5 {
            remote.container.records.upsert(record(EntityKind::Course, &format!("course-{i}"), i));
        }

        let session = local
            .container
            .coordinator
            .sync(link.b_in_a, SyncType::Full)
            .await
            .unwrap();

        assert_eq!(session.status, SyncStatus::Completed);
        assert_eq!(session.records_synced, 5);
        assert_eq!(session.errors_count, 0);
        assert!(session.completed_at.is_some());
        assert_eq!(local.container.records.count(EntityKind::Course), 5);

        // Batch size 2: three request/response round trips.
        let exchanged = local.container.messages.list_for_peer(link.b_in_a).await.unwrap();
        let (requests, responses): (Vec<_>, Vec<_>) =
            exchanged.iter().partition(|m| m.direction == Direction::Outbound);
        assert_eq!(requests.len(), 3);
        assert!(requests.iter().all(|m| m.status == MessageStatus::Delivered));
        assert_eq!(responses.len(), 3);

        let inbound = remote.container.messages.list_for_peer(link.a_in_b).await.unwrap();
        assert_eq!(inbound.len(), 3);
        assert!(inbound.iter().all(|m| m.direction == Direction::Inbound));

        let seen = remote.container.registry.lookup(link.a_in_b).await.unwrap();
        assert!(seen.last_seen.is_some());
    }

    #[tokio::test]
    async fn test_incremental_after_full_without_changes() {
        let federation = Federation::new();
        let local = federation.node("local.example.edu");
        let remote = federation.node("remote.example.edu");
        let link = federation.connect(&local, &remote).await;
        remote.container.records.upsert(record(EntityKind::Material, "syllabus", 10));

        let coordinator = &local.container.coordinator;
        let full = coordinator.sync(link.b_in_a, SyncType::Full).await.unwrap();
        assert_eq!(full.records_synced, 1);

        federation.clock.advance(Duration::minutes(5));
        let incremental = coordinator.sync(link.b_in_a, SyncType::Incremental).await.unwrap();
        assert_eq!(incremental.status, SyncStatus::Completed);
        assert_eq!(incremental.records_synced, 0);
        assert_eq!(incremental.errors_count, 0);
    }

    #[tokio::test]
    async fn test_incremental_pulls_only_new_changes() {
        let federation = Federation::new();
        let local = federation.node("local.example.edu");
        let remote = federation.node("remote.example.edu");
        let link = federation.connect(&local, &remote).await;
        for i in 0..3 {
            remote.container.records.upsert(record(EntityKind::User, &format!("user-{i}"), i));
        }

        let coordinator = &local.container.coordinator;
        coordinator.sync(link.b_in_a, SyncType::Full).await.unwrap();

        federation.clock.advance(Duration::minutes(10));
        let mut changed = record(EntityKind::User, "user-1", 0);
        changed.updated_at = federation.clock.now();
        changed.data = serde_json::json!({ "id": "user-1", "rev": "edited" });
        remote.container.records.upsert(changed);

        let incremental = coordinator.sync(link.b_in_a, SyncType::Incremental).await.unwrap();
        assert_eq!(incremental.status, SyncStatus::Completed);
        assert_eq!(incremental.records_synced, 1);

        let stored = local
            .container
            .records
            .get(&EntityRef::new(EntityKind::User, "user-1"))
            .unwrap();
        assert_eq!(stored.data["rev"], "edited");
    }

    #[tokio::test]
    async fn test_bilateral_exchanges_both_ways() {
        let federation = Federation::new();
        let local = federation.node("local.example.edu");
        let remote = federation.node("remote.example.edu");
        let link = federation.connect(&local, &remote).await;

        remote.container.records.upsert(record(EntityKind::Course, "remote-course", 1));
        local.container.records.upsert(record(EntityKind::Enrollment, "local-enrollment", 2));

        let session = local
            .container
            .coordinator
            .sync(link.b_in_a, SyncType::Bilateral)
            .await
            .unwrap();

        assert_eq!(session.status, SyncStatus::Completed);
        assert_eq!(session.data_synced["pull"]["applied"], 1);
        assert!(local
            .container
            .records
            .get(&EntityRef::new(EntityKind::Course, "remote-course"))
            .is_some());
        assert!(remote
            .container
            .records
            .get(&EntityRef::new(EntityKind::Enrollment, "local-enrollment"))
            .is_some());
    }

    #[tokio::test]
    async fn test_nodes_sync_with_each_other_concurrently() {
        let federation = Federation::new();
        let a = federation.node("a.example.edu");
        let b = federation.node("b.example.edu");
        let link = federation.connect(&a, &b).await;

        a.container.records.upsert(record(EntityKind::Report, "a-report", 1));
        b.container.records.upsert(record(EntityKind::Report, "b-report", 2));

        let (from_a, from_b) = tokio::join!(
            a.container.coordinator.sync(link.b_in_a, SyncType::Full),
            b.container.coordinator.sync(link.a_in_b, SyncType::Full),
        );

        assert_eq!(from_a.unwrap().status, SyncStatus::Completed);
        assert_eq!(from_b.unwrap().status, SyncStatus::Completed);
        assert_eq!(a.container.records.count(EntityKind::Report), 2);
        assert_eq!(b.container.records.count(EntityKind::Report), 2);
    }

    #[tokio::test]
    async fn test_hub_syncs_with_several_peers() {
        let federation = Federation::new();
        let hub = federation.node("hub.example.edu");
        let east = federation.node("east.example.edu");
        let west = federation.node("west.example.edu");
        let to_east = federation.connect(&hub, &east).await;
        let to_west = federation.connect(&hub, &west).await;

        for i in 0..3 {
            east.container.records.upsert(record(EntityKind::Course, &format!("east-{i}"), i));
            west.container.records.upsert(record(EntityKind::Course, &format!("west-{i}"), i));
        }

        let coordinator = &hub.container.coordinator;
        let east_handle = coordinator.start_sync(to_east.b_in_a, SyncType::Full).await.unwrap();
        let west_handle = coordinator.start_sync(to_west.b_in_a, SyncType::Full).await.unwrap();

        let east_session = east_handle.wait().await.unwrap();
        let west_session = west_handle.wait().await.unwrap();
        assert_eq!(east_session.records_synced, 3);
        assert_eq!(west_session.records_synced, 3);
        assert_eq!(hub.container.records.count(EntityKind::Course), 6);
        assert!(!coordinator.is_running(to_east.b_in_a));

        let history = coordinator.sessions_for(to_east.b_in_a).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].id, east_session.id);
    }

    #[tokio::test]
    async fn test_newer_local_copy_is_kept() {
        let federation = Federation::new();
        let local = federation.node("local.example.edu");
        let remote = federation.node("remote.example.edu");
        let link = federation.connect(&local, &remote).await;

        remote.container.records.upsert(record(EntityKind::Course, "shared", 1));
        local.container.records.upsert(record(EntityKind::Course, "shared", 100));

        let session = local
            .container
            .coordinator
            .sync(link.b_in_a, SyncType::Full)
            .await
            .unwrap();

        assert_eq!(session.status, SyncStatus::Completed);
        assert_eq!(session.errors_count, 0);
        let kept = local
            .container
            .records
            .get(&EntityRef::new(EntityKind::Course, "shared"))
            .unwrap();
        assert_eq!(kept.data["rev"], 100);
    }
}
