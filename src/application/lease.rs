//! Worker leases: exclusive, release-exactly-once handles on one worker.
//!
//! A [`WorkerLease`] is moved into the delegation that uses it. Calling
//! [`WorkerLease::release`] consumes the lease, so a second release cannot be
//! written. Any other way out of the delegation (an early return, a dropped
//! future after a timeout or cancellation, unwinding) drops the lease, and the
//! `Drop` impl reports it as released with [`DelegateError::Cancelled`].

use std::fmt;

use async_trait::async_trait;
use metrics::counter;
use tracing::{debug, warn};
use url::Url;

use crate::application::error::DelegateError;
use crate::domain::request::RenderRequest;

const METRIC_LEASE_RELEASES: &str = "worker_delegate_lease_releases_total";

/// Health signal sent back to whoever handed out the lease.
pub trait LeaseRelease: Send {
    /// `None` returns the worker cleanly; `Some` marks it as possibly unhealthy.
    fn release(self: Box<Self>, error: Option<&DelegateError>);
}

impl<F> LeaseRelease for F
where
    F: FnOnce(Option<&DelegateError>) + Send,
{
    fn release(self: Box<Self>, error: Option<&DelegateError>) {
        (*self)(error)
    }
}

pub struct WorkerLease {
    endpoint: Option<Url>,
    hook: Option<Box<dyn LeaseRelease>>,
}

impl WorkerLease {
    pub fn new(endpoint: Option<Url>, hook: impl LeaseRelease + 'static) -> Self {
        Self {
            endpoint,
            hook: Some(Box::new(hook)),
        }
    }

    pub fn endpoint(&self) -> Option<&Url> {
        self.endpoint.as_ref()
    }

    pub fn release(mut self, error: Option<&DelegateError>) {
        self.fire(error);
    }

    fn fire(&mut self, error: Option<&DelegateError>) {
        let Some(hook) = self.hook.take() else {
            return;
        };

        let outcome = error.map_or("clean", DelegateError::kind);
        counter!(METRIC_LEASE_RELEASES, "outcome" => outcome).increment(1);
        match error {
            None => debug!(
                target = "application::lease",
                op = "lease::release",
                result = "clean",
                endpoint = self.endpoint.as_ref().map(Url::as_str),
                "Worker lease released"
            ),
            Some(err) => warn!(
                target = "application::lease",
                op = "lease::release",
                result = outcome,
                endpoint = self.endpoint.as_ref().map(Url::as_str),
                error = %err,
                "Worker lease released with error"
            ),
        }
        hook.release(error);
    }
}

impl Drop for WorkerLease {
    fn drop(&mut self) {
        if self.hook.is_some() {
            self.fire(Some(&DelegateError::Cancelled));
        }
    }
}

impl fmt::Debug for WorkerLease {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkerLease")
            .field("endpoint", &self.endpoint.as_ref().map(Url::as_str))
            .field("released", &self.hook.is_none())
            .finish()
    }
}

/// Source of worker leases; the seam over an external pool.
#[async_trait]
pub trait WorkerPool: Send + Sync {
    async fn acquire(&self, request: &RenderRequest) -> Result<WorkerLease, DelegateError>;
}

/// Pick the endpoint for `request`: its `workerUrl` override first, then `default`.
pub fn resolve_endpoint(
    request: &RenderRequest,
    default: Option<&Url>,
) -> Result<Url, DelegateError> {
    match request.context.worker_url() {
        Some(url) => Url::parse(url).map_err(|err| {
            DelegateError::configuration(format!("invalid workerUrl `{url}` in request: {err}"))
        }),
        None => default.cloned().ok_or_else(|| {
            DelegateError::configuration(
                "no worker url configured and the request does not carry a workerUrl",
            )
        }),
    }
}

/// Pool backed by a single configured endpoint. Releasing only records the
/// outcome; there is no health tracking.
#[derive(Debug, Clone, Default)]
pub struct StaticWorkerPool {
    default_endpoint: Option<Url>,
}

impl StaticWorkerPool {
    pub fn new(default_endpoint: Option<Url>) -> Self {
        Self { default_endpoint }
    }
}

#[async_trait]
impl WorkerPool for StaticWorkerPool {
    async fn acquire(&self, request: &RenderRequest) -> Result<WorkerLease, DelegateError> {
        let endpoint = resolve_endpoint(request, self.default_endpoint.as_ref())?;
        Ok(WorkerLease::new(Some(endpoint), |_: Option<&DelegateError>| {}))
    }
}
