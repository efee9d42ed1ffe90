//! Transport seam between the delegation protocol and the network.

use async_trait::async_trait;
use delegate_wire::RequestEnvelope;
use serde_json::Value;
use thiserror::Error;
use url::Url;

/// Raw failure of one worker call, before any application-level classification.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("worker request failed: {message}")]
    Network { message: String },
    #[error("worker responded with status {status}")]
    Status {
        status: u16,
        /// Response body, when it parsed as JSON.
        body: Option<Value>,
    },
    #[error("worker response could not be decoded: {message}")]
    Decode { message: String },
}

impl TransportError {
    pub fn network(err: impl std::fmt::Display) -> Self {
        Self::Network {
            message: err.to_string(),
        }
    }

    pub fn decode(err: impl std::fmt::Display) -> Self {
        Self::Decode {
            message: err.to_string(),
        }
    }
}

/// Posts one envelope to a worker endpoint and returns the decoded JSON body.
///
/// Implementations must not retry; a failed call is reported as is.
#[async_trait]
pub trait WorkerTransport: Send + Sync {
    async fn send(&self, endpoint: &Url, envelope: &RequestEnvelope)
    -> Result<Value, TransportError>;
}
