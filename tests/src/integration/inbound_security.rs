//! # Inbound Security
//!
//! What a node refuses at `POST /federation/v1/messages`, and the status
//! and error code each refusal carries.

#[cfg(test)]
mod tests {
    use crate::harness::{record, Federation, TestNode};
    use axum::http::StatusCode;
    use chrono::Duration;
    use olg_01_instance_registry::RegistryApi;
    use olg_02_envelope_codec::{EnvelopeCodec, EnvelopeCodecApi};
    use olg_03_signature_verification::{LocalIdentity, SignatureVerificationApi};
    use olg_05_sync_coordinator::{SyncDirection, SyncRequestPayload, SyncResponsePayload};
    use serde_json::json;
    use shared_bus::{EventFilter, EventTopic, FederationEvent};
    use shared_types::{EntityKind, Envelope, InstanceStatus, MessageType, SessionId, SyncType, TimeSource};

    fn notification(from: &TestNode, to: &TestNode) -> Envelope {
        from.envelope(
            to.domain(),
            MessageType::Notification,
            "report.filed",
            json!({ "report_id": "r-1" }),
        )
    }

    #[tokio::test]
    async fn test_valid_notification_accepted() {
        let federation = Federation::new();
        let local = federation.node("local.example.edu");
        let remote = federation.node("remote.example.edu");
        let link = federation.connect(&local, &remote).await;

        let body = local.encode(&notification(&local, &remote));
        let reply = remote.post(Some(&link.a_key_at_b), body).await;
        assert_eq!(reply.status, StatusCode::NO_CONTENT);
        assert!(reply.body.is_empty());
    }

    #[tokio::test]
    async fn test_pull_request_answered_with_signed_page() {
        let federation = Federation::new();
        let local = federation.node("local.example.edu");
        let remote = federation.node("remote.example.edu");
        let link = federation.connect(&local, &remote).await;
        for i in 0..3 {
            remote.container.records.upsert(record(EntityKind::Ban, &format!("ban-{i}"), i));
        }

        let request = SyncRequestPayload {
            session_id: SessionId::new(),
            sync_type: SyncType::Full,
            direction: SyncDirection::Pull,
            since: None,
            cursor: None,
            limit: 10,
            records: Vec::new(),
        };
        let envelope = local.envelope(
            remote.domain(),
            MessageType::SyncRequest,
            SyncDirection::Pull.subject(),
            serde_json::to_value(&request).unwrap(),
        );
        let reply = remote.post(Some(&link.a_key_at_b), local.encode(&envelope)).await;
        assert_eq!(reply.status, StatusCode::OK);

        let response = EnvelopeCodec::default().decode(&reply.body).unwrap();
        assert_eq!(response.message_type, MessageType::SyncResponse);
        assert_eq!(response.from, remote.domain());
        assert_eq!(response.to, local.domain());
        local
            .signer()
            .verify_envelope(&response, &remote.identity().public_key_hex())
            .unwrap();

        let page: SyncResponsePayload = serde_json::from_value(response.payload).unwrap();
        assert_eq!(page.session_id, request.session_id);
        // Capped at the node's batch size.
        assert_eq!(page.records.len(), 2);
        assert!(page.next_cursor.is_some());
    }

    #[tokio::test]
    async fn test_forged_signature_rejected_and_published() {
        let federation = Federation::new();
        let local = federation.node("local.example.edu");
        let remote = federation.node("remote.example.edu");
        let link = federation.connect(&local, &remote).await;
        let mut rejections = remote
            .container
            .bus
            .subscribe(EventFilter::topics(vec![EventTopic::Inbound]));

        let impostor = LocalIdentity::generate(local.domain());
        let mut envelope = notification(&local, &remote);
        local.signer().sign_envelope(&mut envelope, &impostor);

        let reply = remote.post(Some(&link.a_key_at_b), local.encode(&envelope)).await;
        assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
        assert_eq!(reply.error_code().as_deref(), Some("signature_invalid"));

        match rejections.try_recv().unwrap() {
            Some(FederationEvent::InboundRejected {
                message_id,
                sender,
                reason,
                ..
            }) => {
                assert_eq!(message_id, Some(envelope.id));
                assert_eq!(sender.as_deref(), Some("local.example.edu"));
                assert_eq!(reason, "signature_invalid");
            }
            other => panic!("expected inbound.rejected, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_tampered_payload_rejected() {
        let federation = Federation::new();
        let local = federation.node("local.example.edu");
        let remote = federation.node("remote.example.edu");
        let link = federation.connect(&local, &remote).await;

        let mut envelope = notification(&local, &remote);
        envelope.payload = json!({ "report_id": "r-2" });

        let reply = remote.post(Some(&link.a_key_at_b), local.encode(&envelope)).await;
        assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
        assert_eq!(reply.error_code().as_deref(), Some("signature_invalid"));
    }

    #[tokio::test]
    async fn test_unknown_credential_rejected() {
        let federation = Federation::new();
        let local = federation.node("local.example.edu");
        let remote = federation.node("remote.example.edu");
        federation.connect(&local, &remote).await;

        let body = local.encode(&notification(&local, &remote));
        let reply = remote.post(Some("not-a-registered-credential"), body.clone()).await;
        assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
        assert_eq!(reply.error_code().as_deref(), Some("unauthorized"));

        let reply = remote.post(None, body).await;
        assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_credential_of_another_peer_forbidden() {
        let federation = Federation::new();
        let local = federation.node("local.example.edu");
        let remote = federation.node("remote.example.edu");
        let other = federation.node("other.example.edu");
        let local_link = federation.connect(&local, &remote).await;
        federation.connect(&other, &remote).await;

        // Envelope from `other`, presented with `local`'s credential.
        let body = other.encode(&notification(&other, &remote));
        let reply = remote.post(Some(&local_link.a_key_at_b), body).await;
        assert_eq!(reply.status, StatusCode::FORBIDDEN);
        assert_eq!(reply.error_code().as_deref(), Some("forbidden"));
    }

    #[tokio::test]
    async fn test_suspended_sender_forbidden() {
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

        let body = local.encode(&notification(&local, &remote));
        let reply = remote.post(Some(&link.a_key_at_b), body).await;
        assert_eq!(reply.status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_misaddressed_envelope_rejected() {
        let federation = Federation::new();
        let local = federation.node("local.example.edu");
        let remote = federation.node("remote.example.edu");
        let link = federation.connect(&local, &remote).await;

        let envelope = local.envelope("elsewhere.example.edu", MessageType::Notification, "x", json!({}));
        let reply = remote.post(Some(&link.a_key_at_b), local.encode(&envelope)).await;
        assert_eq!(reply.status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(reply.error_code().as_deref(), Some("misaddressed"));
    }

    #[tokio::test]
    async fn test_replayed_and_stale_envelopes_rejected() {
        let federation = Federation::new();
        let local = federation.node("local.example.edu");
        let remote = federation.node("remote.example.edu");
        let link = federation.connect(&local, &remote).await;

        let body = local.encode(&notification(&local, &remote));
        assert_eq!(
            remote.post(Some(&link.a_key_at_b), body.clone()).await.status,
            StatusCode::NO_CONTENT
        );
        let replayed = remote.post(Some(&link.a_key_at_b), body).await;
        assert_eq!(replayed.status, StatusCode::CONFLICT);
        assert_eq!(replayed.error_code().as_deref(), Some("replay"));

        let mut stale = Envelope::new(
            local.domain(),
            remote.domain(),
            MessageType::Notification,
            "report.filed",
            json!({}),
            federation.clock.now() - Duration::hours(2),
        );
        local.signer().sign_envelope(&mut stale, local.identity());
        let reply = remote.post(Some(&link.a_key_at_b), local.encode(&stale)).await;
        assert_eq!(reply.status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(reply.error_code().as_deref(), Some("stale_message"));
    }

    #[tokio::test]
    async fn test_malformed_body_rejected() {
        let federation = Federation::new();
        let local = federation.node("local.example.edu");
        let remote = federation.node("remote.example.edu");
        let link = federation.connect(&local, &remote).await;

        let reply = remote.post(Some(&link.a_key_at_b), b"{\"id\":".to_vec()).await;
        assert_eq!(reply.status, StatusCode::BAD_REQUEST);
        assert_eq!(reply.error_code().as_deref(), Some("malformed_envelope"));
    }
}
