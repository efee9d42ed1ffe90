//! In-memory fakes for exercising the delegation protocols without a network.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use delegate_wire::RequestEnvelope;
use serde_json::Value;
use url::Url;

use crate::application::correlation::CorrelationSource;
use crate::application::error::DelegateError;
use crate::application::lease::{WorkerLease, WorkerPool, resolve_endpoint};
use crate::application::render::NestedRenderer;
use crate::application::transport::{TransportError, WorkerTransport};
use crate::domain::request::RenderRequest;
use crate::domain::response::RenderResponse;

/// Records every release as `None` (clean) or `Some(error kind)`.
#[derive(Clone, Default)]
pub(crate) struct ReleaseLog {
    outcomes: Arc<Mutex<Vec<Option<String>>>>,
}

impl ReleaseLog {
    pub(crate) fn hook(&self) -> impl FnOnce(Option<&DelegateError>) + Send + 'static {
        let outcomes = Arc::clone(&self.outcomes);
        move |error: Option<&DelegateError>| {
            outcomes
                .lock()
                .expect("release log")
                .push(error.map(|err| err.kind().to_string()));
        }
    }

    pub(crate) fn outcomes(&self) -> Vec<Option<String>> {
        self.outcomes.lock().expect("release log").clone()
    }
}

/// Pool resolving endpoints like the static pool, with instrumented releases.
pub(crate) struct RecordingPool {
    pub(crate) default_endpoint: Option<Url>,
    pub(crate) log: ReleaseLog,
    /// Hand out leases without an endpoint, as a misbehaving external pool would.
    pub(crate) without_endpoint: bool,
}

impl RecordingPool {
    pub(crate) fn new(default_endpoint: &str) -> Self {
        Self {
            default_endpoint: Some(Url::parse(default_endpoint).expect("endpoint")),
            log: ReleaseLog::default(),
            without_endpoint: false,
        }
    }
}

#[async_trait]
impl WorkerPool for RecordingPool {
    async fn acquire(&self, request: &RenderRequest) -> Result<WorkerLease, DelegateError> {
        if self.without_endpoint {
            return Ok(WorkerLease::new(None, self.log.hook()));
        }
        let endpoint = resolve_endpoint(request, self.default_endpoint.as_ref())?;
        Ok(WorkerLease::new(Some(endpoint), self.log.hook()))
    }
}

/// Transport replaying canned replies in order and recording what was sent.
#[derive(Default)]
pub(crate) struct ScriptedTransport {
    replies: Mutex<VecDeque<Result<Value, TransportError>>>,
    sent: Mutex<Vec<(Url, RequestEnvelope)>>,
}

impl ScriptedTransport {
    pub(crate) fn new(replies: impl IntoIterator<Item = Result<Value, TransportError>>) -> Self {
        Self {
            replies: Mutex::new(replies.into_iter().collect()),
            sent: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn sent(&self) -> Vec<(Url, RequestEnvelope)> {
        self.sent.lock().expect("sent").clone()
    }
}

#[async_trait]
impl WorkerTransport for ScriptedTransport {
    async fn send(
        &self,
        endpoint: &Url,
        envelope: &RequestEnvelope,
    ) -> Result<Value, TransportError> {
        self.sent
            .lock()
            .expect("sent")
            .push((endpoint.clone(), envelope.clone()));
        self.replies
            .lock()
            .expect("replies")
            .pop_front()
            .unwrap_or_else(|| Err(TransportError::network("no scripted reply left")))
    }
}

/// Transport whose calls never complete.
pub(crate) struct StalledTransport;

#[async_trait]
impl WorkerTransport for StalledTransport {
    async fn send(
        &self,
        _endpoint: &Url,
        _envelope: &RequestEnvelope,
    ) -> Result<Value, TransportError> {
        std::future::pending().await
    }
}

/// Ids `id-1`, `id-2`, ...
#[derive(Default)]
pub(crate) struct SequentialIds {
    next: Mutex<u32>,
}

impl CorrelationSource for SequentialIds {
    fn next_id(&self) -> String {
        let mut next = self.next.lock().expect("ids");
        *next += 1;
        format!("id-{next}")
    }
}

/// Renders nested templates by echoing their content; records every call.
#[derive(Default)]
pub(crate) struct EchoRenderer {
    calls: Mutex<Vec<(RenderRequest, RenderRequest)>>,
    fail_with_weak: Option<String>,
}

impl EchoRenderer {
    pub(crate) fn failing(message: &str) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            fail_with_weak: Some(message.to_string()),
        }
    }

    /// `(nested, parent)` pairs in call order.
    pub(crate) fn calls(&self) -> Vec<(RenderRequest, RenderRequest)> {
        self.calls.lock().expect("calls").clone()
    }
}

#[async_trait]
impl NestedRenderer for EchoRenderer {
    async fn render(
        &self,
        request: RenderRequest,
        parent: &RenderRequest,
    ) -> Result<RenderResponse, DelegateError> {
        self.calls
            .lock()
            .expect("calls")
            .push((request.clone(), parent.clone()));
        if let Some(message) = &self.fail_with_weak {
            return Err(crate::domain::error::WeakError::new(message.clone()).into());
        }
        Ok(RenderResponse::new(
            request.template.content.unwrap_or_default(),
        ))
    }
}
