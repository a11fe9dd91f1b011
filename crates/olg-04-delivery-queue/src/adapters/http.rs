//! `reqwest` transport.
//!
//! POSTs the encoded envelope to `{api_url}/federation/v1/messages` with the
//! peer-issued credential in `X-Federation-Key`.

use crate::domain::{classify_status, DeliveryTarget, HttpDisposition, TransportError, TransportReceipt};
use crate::ports::outbound::FederationTransport;
use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

/// Header carrying the API credential.
pub const FEDERATION_KEY_HEADER: &str = "X-Federation-Key";

/// HTTP transport to peer instances.
#[derive(Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    /// Build a client with a request timeout and a federation user agent.
    pub fn new(timeout: Duration) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("olg-federation/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| TransportError::Permanent {
                status: None,
                reason: format!("failed to build HTTP client: {e}"),
            })?;
        Ok(Self { client })
    }
}

#[async_trait]
impl FederationTransport for HttpTransport {
    async fn deliver(
        &self,
        target: &DeliveryTarget,
        body: &[u8],
    ) -> Result<TransportReceipt, TransportError> {
        let url = target.messages_url();
        debug!(peer = %target.domain, url = %url, bytes = body.len(), "POST federation envelope");

        let response = self
            .client
            .post(&url)
            .header(FEDERATION_KEY_HEADER, &target.api_key)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body.to_vec())
            .send()
            .await
            .map_err(|e| TransportError::Transient(format!("request to {url} failed: {e}")))?;

        let status = response.status().as_u16();
        match classify_status(status) {
            HttpDisposition::Accepted => Ok(TransportReceipt::accepted()),
            HttpDisposition::Acknowledged => {
                let bytes = response
                    .bytes()
                    .await
                    .map_err(|e| TransportError::Transient(format!("reading response failed: {e}")))?;
                let response = (!bytes.is_empty()).then(|| bytes.to_vec());
                Ok(TransportReceipt::acknowledged(response))
            }
            HttpDisposition::Transient => Err(TransportError::Transient(format!(
                "peer answered HTTP {status}"
            ))),
            HttpDisposition::Permanent => {
                let reason = response
                    .text()
                    .await
                    .unwrap_or_else(|_| "unreadable response body".to_string());
                Err(TransportError::Permanent {
                    status: Some(status),
                    reason,
                })
            }
        }
    }
}
