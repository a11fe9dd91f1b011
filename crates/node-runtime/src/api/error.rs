//! Error bodies for the federation HTTP surface.
//!
//! ```json
//! {"status":"error","error":{"code":"signature_invalid","message":"..."},"status_code":401}
//! ```

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use olg_05_sync_coordinator::InboundError;
use serde_json::json;

/// An HTTP error with a machine-readable code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    /// Response status.
    pub status: StatusCode,
    /// Short code, e.g. `replay`.
    pub code: String,
    /// Human-readable message.
    pub message: String,
}

impl ApiError {
    /// Build an error.
    pub fn new(status: StatusCode, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            status,
            code: code.into(),
            message: message.into(),
        }
    }

    /// 500 with a generic code.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "internal_error", message)
    }
}

impl From<InboundError> for ApiError {
    fn from(err: InboundError) -> Self {
        let status =
            StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        // Internal details stay in the logs.
        let message = match &err {
            InboundError::Internal(_) => "internal error while handling message".to_string(),
            other => other.to_string(),
        };
        Self::new(status, err.reason_code(), message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = json!({
            "status": "error",
            "error": {
                "code": self.code,
                "message": self.message,
            },
            "status_code": self.status.as_u16(),
        });
        (self.status, Json(body)).into_response()
    }
}
