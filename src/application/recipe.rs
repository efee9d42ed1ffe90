//! Recipe delegation: the recursive request → render callback → continuation
//! exchange with one worker.
//!
//! ```text
//! orchestrator                                  worker
//!     │ {type: recipe, uuid, data: {req, res}}    │
//!     │──────────────────────────────────────────▶│
//!     │ {action: render, data: {parentReq, req}}  │
//!     │◀──────────────────────────────────────────│
//!     │   render nested req locally               │
//!     │ {uuid, data: {content, req}}   (no type)  │
//!     │──────────────────────────────────────────▶│
//!     │            ... repeated ...               │
//!     │ {req, res}                                │
//!     │◀──────────────────────────────────────────│
//! ```

use std::sync::Arc;
use std::time::Instant;

use delegate_wire::{CompletedReply, EnvelopeKind, RenderCallback, RequestEnvelope, WorkerReply};
use metrics::{counter, histogram};
use serde_json::json;
use tracing::{debug, info, warn};
use url::Url;

use crate::application::caller::WorkerCaller;
use crate::application::correlation::CorrelationSource;
use crate::application::error::DelegateError;
use crate::application::lease::WorkerLease;
use crate::application::render::NestedRenderer;
use crate::domain::request::RenderRequest;
use crate::domain::response::RenderResponse;

const METRIC_RENDER_CALLBACKS: &str = "worker_delegate_render_callbacks_total";
const METRIC_EXCHANGE_MS: &str = "worker_delegate_exchange_ms";

pub struct RecipeDelegate {
    caller: WorkerCaller,
    ids: Arc<dyn CorrelationSource>,
}

impl RecipeDelegate {
    pub fn new(caller: WorkerCaller, ids: Arc<dyn CorrelationSource>) -> Self {
        Self { caller, ids }
    }

    /// Drive one recipe execution to completion on the leased worker at `endpoint`.
    ///
    /// The lease is released before this returns: cleanly on success, with the
    /// terminating error otherwise. `recipe` is used for diagnostics only.
    pub async fn execute(
        &self,
        lease: WorkerLease,
        endpoint: Url,
        recipe: &str,
        request: &mut RenderRequest,
        response: &mut RenderResponse,
        renderer: &dyn NestedRenderer,
    ) -> Result<(), DelegateError> {
        let correlation_id = self.ids.next_id();
        request.context.correlation_id = Some(correlation_id.clone());
        request
            .context
            .debug(format!("Delegating recipe {recipe} to worker at {endpoint}"));
        debug!(
            target = "application::recipe",
            op = "recipe::execute",
            recipe,
            endpoint = %endpoint,
            correlation_id = %correlation_id,
            "Delegating recipe to worker"
        );

        let started_at = Instant::now();
        let outcome = self
            .exchange(&endpoint, &correlation_id, request, response, renderer)
            .await;
        histogram!(METRIC_EXCHANGE_MS, "kind" => "recipe")
            .record(started_at.elapsed().as_secs_f64() * 1000.0);

        match outcome {
            Ok(callbacks) => {
                info!(
                    target = "application::recipe",
                    op = "recipe::execute",
                    result = "ok",
                    recipe,
                    correlation_id = %correlation_id,
                    callbacks,
                    elapsed_ms = started_at.elapsed().as_millis() as u64,
                    "Recipe delegation finished"
                );
                lease.release(None);
                Ok(())
            }
            Err(err) => {
                warn!(
                    target = "application::recipe",
                    op = "recipe::execute",
                    result = err.kind(),
                    recipe,
                    correlation_id = %correlation_id,
                    elapsed_ms = started_at.elapsed().as_millis() as u64,
                    error = %err,
                    "Recipe delegation failed"
                );
                lease.release(Some(&err));
                Err(err)
            }
        }
    }

    /// Returns the number of render callbacks served.
    async fn exchange(
        &self,
        endpoint: &Url,
        correlation_id: &str,
        request: &mut RenderRequest,
        response: &mut RenderResponse,
        renderer: &dyn NestedRenderer,
    ) -> Result<u64, DelegateError> {
        let opening = RequestEnvelope::initial(
            EnvelopeKind::Recipe,
            correlation_id,
            json!({ "req": to_json(request)?, "res": to_json(response)? }),
        );
        let mut reply = self.caller.call(endpoint, &opening).await?;
        let mut callbacks = 0u64;

        loop {
            match WorkerReply::from_value(reply)? {
                WorkerReply::Render(callback) => {
                    callbacks += 1;
                    counter!(METRIC_RENDER_CALLBACKS).increment(1);
                    let continuation =
                        serve_callback(callback, correlation_id, request, renderer).await?;
                    reply = self.caller.call(endpoint, &continuation).await?;
                }
                WorkerReply::Completed(done) => {
                    complete(done, request, response)?;
                    return Ok(callbacks);
                }
            }
        }
    }
}

/// Resume the parent with the worker's state, render the nested request and
/// build the continuation carrying its output.
async fn serve_callback(
    callback: RenderCallback,
    correlation_id: &str,
    request: &mut RenderRequest,
    renderer: &dyn NestedRenderer,
) -> Result<RequestEnvelope, DelegateError> {
    let RenderCallback { parent_req, req } = callback;

    *request = request
        .merged(&parent_req)
        .map_err(|err| DelegateError::protocol(format!("cannot apply parentReq: {err}")))?;
    request
        .context
        .debug("Processing render callback from worker.");
    debug!(
        target = "application::recipe",
        op = "recipe::callback",
        correlation_id,
        "Processing render callback from worker"
    );

    let nested: RenderRequest = serde_json::from_value(req)
        .map_err(|err| DelegateError::protocol(format!("invalid nested render request: {err}")))?;
    let rendered = renderer.render(nested, request).await?;

    Ok(RequestEnvelope::continuation(
        correlation_id,
        json!({
            "content": delegate_wire::content::encode(&rendered.content),
            "req": to_json(request)?,
        }),
    ))
}

fn complete(
    done: CompletedReply,
    request: &mut RenderRequest,
    response: &mut RenderResponse,
) -> Result<(), DelegateError> {
    *request = request
        .merged(&done.req)
        .map_err(|err| DelegateError::protocol(format!("cannot apply final req: {err}")))?;
    *response = response
        .merged(&done.res)
        .map_err(|err| DelegateError::protocol(format!("cannot apply final res: {err}")))?;
    Ok(())
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<serde_json::Value, DelegateError> {
    serde_json::to_value(value)
        .map_err(|err| DelegateError::protocol(format!("cannot serialize for worker: {err}")))
}
