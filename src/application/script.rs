use std::sync::Arc;
use std::time::Instant;

use delegate_wire::{EnvelopeKind, RequestEnvelope};
use metrics::histogram;
use serde_json::{Value, json};
use tracing::{debug, warn};

use crate::application::caller::WorkerCaller;
use crate::application::correlation::CorrelationSource;
use crate::application::error::DelegateError;
use crate::application::lease::WorkerPool;
use crate::domain::request::RenderRequest;

const METRIC_EXCHANGE_MS: &str = "worker_delegate_exchange_ms";

/// Single-shot script execution on a worker.
pub struct ScriptDelegate {
    pool: Arc<dyn WorkerPool>,
    caller: WorkerCaller,
    ids: Arc<dyn CorrelationSource>,
}

impl ScriptDelegate {
    pub fn new(
        pool: Arc<dyn WorkerPool>,
        caller: WorkerCaller,
        ids: Arc<dyn CorrelationSource>,
    ) -> Self {
        Self { pool, caller, ids }
    }

    /// Returns the worker's reply body untouched.
    pub async fn execute(
        &self,
        inputs: Value,
        options: Value,
        request: &mut RenderRequest,
    ) -> Result<Value, DelegateError> {
        request.context.debug("Delegating script to worker");

        let lease = self.pool.acquire(request).await?;
        let Some(endpoint) = lease.endpoint().cloned() else {
            lease.release(None);
            return Err(DelegateError::configuration(
                "worker obtained has no url assigned to execute script in it",
            ));
        };

        let correlation_id = self.ids.next_id();
        request.context.correlation_id = Some(correlation_id.clone());
        debug!(
            target = "application::script",
            op = "script::execute",
            endpoint = %endpoint,
            correlation_id = %correlation_id,
            "Delegating script to worker"
        );

        let envelope = RequestEnvelope::initial(
            EnvelopeKind::ScriptManager,
            correlation_id.as_str(),
            json!({ "inputs": inputs, "options": options }),
        );

        let started_at = Instant::now();
        let outcome = self.caller.call(&endpoint, &envelope).await;
        histogram!(METRIC_EXCHANGE_MS, "kind" => "script")
            .record(started_at.elapsed().as_secs_f64() * 1000.0);

        match outcome {
            Ok(body) => {
                lease.release(None);
                Ok(body)
            }
            Err(err) => {
                warn!(
                    target = "application::script",
                    op = "script::execute",
                    result = err.kind(),
                    correlation_id = %correlation_id,
                    error = %err,
                    "Script delegation failed"
                );
                lease.release(Some(&err));
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::testing::{
        RecordingPool, ScriptedTransport, SequentialIds, StalledTransport,
    };
    use futures::FutureExt;
    use crate::application::transport::TransportError;

    fn delegate(pool: Arc<RecordingPool>, transport: Arc<ScriptedTransport>) -> ScriptDelegate {
        ScriptDelegate::new(
            pool,
            WorkerCaller::new(transport),
            Arc::new(SequentialIds::default()),
        )
    }

    #[tokio::test]
    async fn reply_body_is_returned_verbatim() {
        let body = json!({"logs": ["x"], "req": {"data": 1}});
        let pool = Arc::new(RecordingPool::new("http://w1/"));
        let transport = Arc::new(ScriptedTransport::new([Ok(body.clone())]));
        let mut request = RenderRequest::default();

        let result = delegate(Arc::clone(&pool), Arc::clone(&transport))
            .execute(json!({"a": 1}), json!({"timeout": 1000}), &mut request)
            .await
            .expect("script");

        assert_eq!(result, body);
        assert_eq!(pool.log.outcomes(), vec![None]);

        let sent = transport.sent();
        assert_eq!(sent.len(), 1);
        let (endpoint, envelope) = &sent[0];
        assert_eq!(endpoint.as_str(), "http://w1/");
        assert_eq!(envelope.kind, Some(EnvelopeKind::ScriptManager));
        assert_eq!(envelope.uuid, "id-1");
        assert_eq!(
            envelope.data,
            json!({"inputs": {"a": 1}, "options": {"timeout": 1000}})
        );
        assert_eq!(request.context.correlation_id.as_deref(), Some("id-1"));
    }

    #[tokio::test]
    async fn request_override_routes_the_script() {
        let pool = Arc::new(RecordingPool::new("http://w1/"));
        let transport = Arc::new(ScriptedTransport::new([Ok(json!({}))]));
        let mut request = RenderRequest::default().with_worker_url("http://w2/");

        delegate(pool, Arc::clone(&transport))
            .execute(json!({}), json!({}), &mut request)
            .await
            .expect("script");

        assert_eq!(transport.sent()[0].0.as_str(), "http://w2/");
    }

    #[tokio::test]
    async fn weak_error_releases_lease_with_it() {
        let pool = Arc::new(RecordingPool::new("http://w1/"));
        let transport = Arc::new(ScriptedTransport::new([Err(TransportError::Status {
            status: 400,
            body: Some(json!({"message": "Script failed", "stack": "at main"})),
        })]));
        let mut request = RenderRequest::default();

        let err = delegate(Arc::clone(&pool), transport)
            .execute(json!({}), json!({}), &mut request)
            .await
            .expect_err("weak");

        assert!(err.is_weak());
        assert_eq!(err.stack(), Some("at main"));
        assert_eq!(pool.log.outcomes(), vec![Some("weak".to_string())]);
    }

    #[tokio::test]
    async fn worker_failure_releases_lease_as_transport_error() {
        let pool = Arc::new(RecordingPool::new("http://w1/"));
        let transport = Arc::new(ScriptedTransport::new([Err(TransportError::Status {
            status: 500,
            body: None,
        })]));
        let mut request = RenderRequest::default();

        let err = delegate(Arc::clone(&pool), transport)
            .execute(json!({}), json!({}), &mut request)
            .await
            .expect_err("fatal");

        assert!(!err.is_weak());
        assert_eq!(err.kind(), "transport");
        assert_eq!(pool.log.outcomes(), vec![Some("transport".to_string())]);
    }

    #[tokio::test]
    async fn dropped_script_releases_lease_as_cancelled() {
        let pool = Arc::new(RecordingPool::new("http://w1/"));
        let scripts = ScriptDelegate::new(
            pool.clone(),
            WorkerCaller::new(Arc::new(StalledTransport)),
            Arc::new(SequentialIds::default()),
        );
        let mut request = RenderRequest::default();

        let polled = scripts
            .execute(json!({}), json!({}), &mut request)
            .now_or_never();

        assert!(polled.is_none());
        assert_eq!(pool.log.outcomes(), vec![Some("cancelled".to_string())]);
    }

    #[tokio::test]
    async fn lease_without_endpoint_fails_before_sending() {
        let mut pool = RecordingPool::new("http://w1/");
        pool.without_endpoint = true;
        let pool = Arc::new(pool);
        let transport = Arc::new(ScriptedTransport::default());
        let mut request = RenderRequest::default();

        let err = delegate(Arc::clone(&pool), Arc::clone(&transport))
            .execute(json!({}), json!({}), &mut request)
            .await
            .expect_err("no endpoint");

        assert!(matches!(err, DelegateError::Configuration { .. }));
        assert!(transport.sent().is_empty());
        assert_eq!(pool.log.outcomes(), vec![None]);
    }
}
