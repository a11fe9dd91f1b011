//! # Delivery Flows
//!
//! Retry schedule against an unreachable peer, recovery after transient
//! failures, per-peer ordering and permanent refusals.

#[cfg(test)]
mod tests {
    use crate::harness::{record, Federation};
    use olg_01_instance_registry::RegistryApi;
    use olg_02_envelope_codec::{EnvelopeCodec, EnvelopeCodecApi};
    use olg_04_delivery_queue::{DeliveryOutcome, DeliveryQueueApi, DeliveryTarget, MessageStore};
    use olg_05_sync_coordinator::SyncCoordinatorApi;
    use serde_json::json;
    use shared_types::{
        Direction, EntityKind, FederationMessage, InstanceStatus, MessageStatus, MessageType,
        SyncStatus, SyncType,
    };
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn test_unreachable_peer_exhausts_retries() {
        let federation = Federation::new();
        let local = federation.node("local.example.edu");
        let remote = federation.node("remote.example.edu");
        let link = federation.connect(&local, &remote).await;
        federation.take_offline(&remote);

        let started = tokio::time::Instant::now();
        let session = local
            .container
            .coordinator
            .sync(link.b_in_a, SyncType::Full)
            .await
            .unwrap();

        // 1 + 2 + 4 + 8 + 16 seconds between six attempts.
        assert!(started.elapsed() >= Duration::from_secs(31));
        assert_eq!(federation.transport_calls(), 6);
        assert_eq!(session.status, SyncStatus::Failed);
        assert_eq!(session.records_synced, 0);

        let messages = local.container.messages.list_for_peer(link.b_in_a).await.unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].status, MessageStatus::Failed);
        assert_eq!(messages[0].retry_count, 5);
        assert!(messages[0].error_message.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_connection_lost_mid_sync_leaves_session_partial() {
        let federation = Federation::new();
        let local = federation.node("local.example.edu");
        let remote = federation.node("remote.example.edu");
        let link = federation.connect(&local, &remote).await;
        for i in 0..5 {
            remote.container.records.upsert(record(EntityKind::Course, &format!("course-{i}"), i));
        }
        federation.cut_after(1);

        let session = local
            .container
            .coordinator
            .sync(link.b_in_a, SyncType::Full)
            .await
            .unwrap();

        assert_eq!(session.status, SyncStatus::Partial);
        assert_eq!(session.records_synced, 2);
        assert_eq!(session.errors_count, 1);
        assert_eq!(local.container.records.count(EntityKind::Course), 2);
        assert_eq!(federation.transport_calls(), 7);
    }

    #[tokio::test(start_paused = true)]
    async fn test_peer_back_online_syncs_again() {
        let federation = Federation::new();
        let local = federation.node("local.example.edu");
        let remote = federation.node("remote.example.edu");
        let link = federation.connect(&local, &remote).await;
        remote.container.records.upsert(record(EntityKind::Course, "c1", 1));

        federation.take_offline(&remote);
        let failed = local
            .container
            .coordinator
            .sync(link.b_in_a, SyncType::Full)
            .await
            .unwrap();
        assert_eq!(failed.status, SyncStatus::Failed);

        federation.bring_online(&remote);
        let recovered = local
            .container
            .coordinator
            .sync(link.b_in_a, SyncType::Full)
            .await
            .unwrap();
        assert_eq!(recovered.status, SyncStatus::Completed);
        assert_eq!(recovered.records_synced, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_failures_are_retried() {
        let federation = Federation::new();
        let local = federation.node("local.example.edu");
        let remote = federation.node("remote.example.edu");
        let link = federation.connect(&local, &remote).await;
        remote.container.records.upsert(record(EntityKind::Material, "m1", 1));
        federation.fail_next(2);

        let session = local
            .container
            .coordinator
            .sync(link.b_in_a, SyncType::Full)
            .await
            .unwrap();
        assert_eq!(session.status, SyncStatus::Completed);
        assert_eq!(session.records_synced, 1);

        let request = local
            .container
            .messages
            .list_for_peer(link.b_in_a)
            .await
            .unwrap()
            .into_iter()
            .find(|m| m.direction == Direction::Outbound)
            .unwrap();
        assert_eq!(request.status, MessageStatus::Delivered);
        assert_eq!(request.retry_count, 2);
    }

    #[tokio::test]
    async fn test_notifications_delivered_in_order() {
        let federation = Federation::new();
        let local = federation.node("local.example.edu");
        let remote = federation.node("remote.example.edu");
        let link = federation.connect(&local, &remote).await;

        let peer = local.container.registry.lookup(link.b_in_a).await.unwrap();
        let target = DeliveryTarget::from_instance(&peer).unwrap();

        let mut tickets = Vec::new();
        let mut sent = Vec::new();
        for n in 0..3 {
            let envelope = local.envelope(
                remote.domain(),
                MessageType::Notification,
                "course.published",
                json!({ "course_id": format!("c-{n}") }),
            );
            sent.push(envelope.id);
            let message = FederationMessage::outbound(envelope, link.b_in_a);
            tickets.push(local.container.queue.enqueue(message, target.clone()).await.unwrap());
        }

        for ticket in tickets {
            assert_eq!(ticket.wait().await, DeliveryOutcome::Delivered { response: None });
        }

        let codec = EnvelopeCodec::default();
        let arrived: Vec<_> = federation
            .delivered_bodies()
            .iter()
            .map(|body| codec.decode(body).unwrap().id)
            .collect();
        assert_eq!(arrived, sent);

        let received = remote.container.messages.list_for_peer(link.a_in_b).await.unwrap();
        assert_eq!(received.len(), 3);
        assert!(received
            .iter()
            .all(|m| m.direction == Direction::Inbound && m.status == MessageStatus::Delivered));
    }

    #[tokio::test]
    async fn test_refused_message_is_not_retried() {
        let federation = Federation::new();
        let local = federation.node("local.example.edu");
        let remote = federation.node("remote.example.edu");
        let link = federation.connect(&local, &remote).await;

        remote
            .container
            .registry
            .set_status(link.a_in_b, InstanceStatus::Suspended)
            .await
            .unwrap();

        let peer = local.container.registry.lookup(link.b_in_a).await.unwrap();
        let envelope = local.envelope(remote.domain(), MessageType::Query, "course.lookup", json!({}));
        let ticket = local
            .container
            .queue
            .enqueue(
                FederationMessage::outbound(envelope, link.b_in_a),
                DeliveryTarget::from_instance(&peer).unwrap(),
            )
            .await
            .unwrap();

        match ticket.wait().await {
            DeliveryOutcome::Failed {
                retry_count,
                transient,
                ..
            } => {
                assert_eq!(retry_count, 0);
                assert!(!transient);
            }
            other => panic!("expected failure, got {other:?}"),
        }
        assert_eq!(federation.transport_calls(), 1);
    }
}
