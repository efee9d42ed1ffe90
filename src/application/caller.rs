//! Single chokepoint for worker calls: every envelope goes out through
//! [`WorkerCaller::call`], which applies weak/fatal classification.

use std::sync::Arc;

use delegate_wire::RequestEnvelope;
use metrics::counter;
use serde_json::Value;
use tracing::debug;
use url::Url;

use crate::application::error::DelegateError;
use crate::application::transport::{TransportError, WorkerTransport};
use crate::domain::error::WeakError;

const METRIC_ROUND_TRIPS: &str = "worker_delegate_round_trips_total";

#[derive(Clone)]
pub struct WorkerCaller {
    transport: Arc<dyn WorkerTransport>,
}

impl WorkerCaller {
    pub fn new(transport: Arc<dyn WorkerTransport>) -> Self {
        Self { transport }
    }

    pub async fn call(
        &self,
        endpoint: &Url,
        envelope: &RequestEnvelope,
    ) -> Result<Value, DelegateError> {
        let kind = envelope.kind.map_or("continuation", |kind| kind.as_str());
        counter!(METRIC_ROUND_TRIPS, "kind" => kind).increment(1);

        self.transport
            .send(endpoint, envelope)
            .await
            .map_err(translate)
    }
}

/// Turn a 400 carrying a structured `message` into a weak error; pass anything
/// else through untouched.
pub fn translate(error: TransportError) -> DelegateError {
    if let TransportError::Status {
        status: 400,
        body: Some(body),
    } = &error
    {
        let message = body
            .get("message")
            .and_then(Value::as_str)
            .filter(|message| !message.is_empty());
        if let Some(message) = message {
            let stack = body
                .get("stack")
                .and_then(Value::as_str)
                .map(str::to_owned);
            debug!(
                target = "application::caller",
                op = "caller::translate",
                result = "weak",
                weak_message = message,
                "Worker reported an expected application error"
            );
            return WeakError::new(message).with_stack(stack).into();
        }
    }

    DelegateError::Transport(error)
}
