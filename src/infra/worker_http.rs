//! `reqwest`-backed worker transport: one JSON POST per envelope.

use std::time::Duration;

use async_trait::async_trait;
use delegate_wire::RequestEnvelope;
use reqwest::Client;
use serde_json::Value;
use tracing::trace;
use url::Url;

use crate::application::transport::{TransportError, WorkerTransport};

use super::error::InfraError;

#[derive(Debug, Clone)]
pub struct HttpWorkerTransport {
    client: Client,
}

impl HttpWorkerTransport {
    /// `timeout` bounds each request, including reading the body. `None` waits indefinitely.
    pub fn new(timeout: Option<Duration>) -> Result<Self, InfraError> {
        let mut builder = Client::builder().user_agent(Self::user_agent());
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|err| InfraError::http(format!("failed to build worker client: {err}")))?;
        Ok(Self { client })
    }

    pub fn user_agent() -> &'static str {
        concat!("worker-delegate/", env!("CARGO_PKG_VERSION"))
    }
}

#[async_trait]
impl WorkerTransport for HttpWorkerTransport {
    async fn send(
        &self,
        endpoint: &Url,
        envelope: &RequestEnvelope,
    ) -> Result<Value, TransportError> {
        trace!(
            target = "infra::worker_http",
            endpoint = %endpoint,
            correlation_id = %envelope.uuid,
            continuation = envelope.is_continuation(),
            "Posting envelope to worker"
        );

        let response = self
            .client
            .post(endpoint.clone())
            .json(envelope)
            .send()
            .await
            .map_err(TransportError::network)?;

        let status = response.status();
        let bytes = response.bytes().await.map_err(TransportError::network)?;
        if !status.is_success() {
            return Err(TransportError::Status {
                status: status.as_u16(),
                body: serde_json::from_slice(&bytes).ok(),
            });
        }

        serde_json::from_slice(&bytes).map_err(TransportError::decode)
    }
}
