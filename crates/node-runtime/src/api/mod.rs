//! # Federation HTTP API
//!
//! | Method | Path | Response |
//! |--------|------|----------|
//! | `POST` | `/federation/v1/messages` | 204, or 200 with a signed `sync_response` envelope |
//! | `GET` | `/federation/v1/identity` | this node's domain and public key |
//! | `GET` | `/metrics` | Prometheus text format |
//! | `GET` | `/health` | liveness |
//!
//! `POST /federation/v1/messages` authenticates the caller by the
//! `X-Federation-Key` header. Errors use the body described in [`ApiError`].

mod error;

pub use error::ApiError;

use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use olg_03_signature_verification::LocalIdentity;
use olg_04_delivery_queue::FEDERATION_KEY_HEADER;
use olg_05_sync_coordinator::{InboundApi, InboundReply};
use serde_json::json;
use std::sync::Arc;

/// Path peers post envelopes to.
pub const MESSAGES_PATH: &str = "/federation/v1/messages";

/// Shared state for request handlers.
#[derive(Clone)]
pub struct AppState {
    /// Inbound processor.
    pub inbound: Arc<dyn InboundApi>,
    /// This node's identity.
    pub identity: Arc<LocalIdentity>,
}

/// Build the router. Bodies larger than `max_body_bytes` get 413.
pub fn router(state: AppState, max_body_bytes: usize) -> Router {
    Router::new()
        .route(MESSAGES_PATH, post(receive_message))
        .route("/federation/v1/identity", get(identity))
        .route("/metrics", get(metrics))
        .route("/health", get(health_check))
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .with_state(state)
}

async fn receive_message(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, ApiError> {
    // A missing header is authenticated as the empty credential so the
    // rejection is published like any other.
    let api_key = headers
        .get(FEDERATION_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();

    match state.inbound.handle(api_key, &body).await? {
        InboundReply::Acknowledged => Ok(StatusCode::NO_CONTENT.into_response()),
        InboundReply::Response(bytes) => Ok((
            StatusCode::OK,
            [(header::CONTENT_TYPE, "application/json")],
            bytes,
        )
            .into_response()),
    }
}

async fn identity(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "domain": state.identity.domain(),
        "public_key": state.identity.public_key_hex(),
        "version": crate::VERSION,
    }))
}

async fn metrics() -> Result<Response, ApiError> {
    let text = olg_telemetry::encode_metrics().map_err(|e| ApiError::internal(e.to_string()))?;
    Ok((
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        text,
    )
        .into_response())
}

async fn health_check() -> impl IntoResponse {
    Json(json!({
        "status": "healthy",
        "version": crate::VERSION,
    }))
}
