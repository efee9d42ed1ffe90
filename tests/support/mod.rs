#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use url::Url;
use worker_delegate::application::{
    caller::WorkerCaller, correlation::UuidCorrelation, lease::StaticWorkerPool,
    recipe::RecipeDelegate, registry::RecipeRegistry, render::Orchestrator,
    script::ScriptDelegate,
};
use worker_delegate::infra::worker_http::HttpWorkerTransport;

/// Orchestrator wired the way the binary wires it, against real HTTP.
pub fn orchestrator(default_worker: Option<&str>, recipes: &[&str]) -> Orchestrator {
    let transport = Arc::new(
        HttpWorkerTransport::new(Some(Duration::from_secs(10))).expect("http transport"),
    );
    let caller = WorkerCaller::new(transport);
    let ids = Arc::new(UuidCorrelation);
    let default_worker = default_worker.map(|raw| Url::parse(raw).expect("worker url"));
    let pool = Arc::new(StaticWorkerPool::new(default_worker));

    let mut registry = RecipeRegistry::with_builtins();
    for name in recipes {
        registry.declare(*name);
    }
    registry.install_delegation(
        pool.clone(),
        Arc::new(RecipeDelegate::new(caller.clone(), ids.clone())),
    );

    Orchestrator::new(registry).with_scripts(Arc::new(ScriptDelegate::new(pool, caller, ids)))
}

/// Terminal worker reply carrying base64 `content`.
pub fn completed(content: &str) -> String {
    serde_json::json!({"req": {}, "res": {"content": content}}).to_string()
}

pub fn render_callback(req: Value) -> String {
    serde_json::json!({
        "action": "render",
        "data": {"parentReq": {}, "req": req}
    })
    .to_string()
}
