//! Render entry point and the nested-render collaborator seam.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Value, json};
use tracing::{debug, warn};

use crate::application::error::DelegateError;
use crate::application::registry::RecipeRegistry;
use crate::application::script::ScriptDelegate;
use crate::domain::request::{LogEntry, LogLevel, RenderRequest};
use crate::domain::response::RenderResponse;

const DEFAULT_ENGINE: &str = "none";
const DEFAULT_RECIPE: &str = "html";

/// Renders a template on behalf of a worker that is mid-exchange.
#[async_trait]
pub trait NestedRenderer: Send + Sync {
    async fn render(
        &self,
        request: RenderRequest,
        parent: &RenderRequest,
    ) -> Result<RenderResponse, DelegateError>;
}

/// Minimal orchestrator: recipe lookup through the registry. Templates with
/// an engine other than `none` are evaluated by the script delegate first.
///
/// It is the nested renderer for every recipe it runs, so worker callbacks
/// re-enter [`Orchestrator::render`] and may themselves be delegated.
pub struct Orchestrator {
    recipes: RecipeRegistry,
    scripts: Option<Arc<ScriptDelegate>>,
}

impl Orchestrator {
    pub fn new(recipes: RecipeRegistry) -> Self {
        Self {
            recipes,
            scripts: None,
        }
    }

    pub fn with_scripts(mut self, scripts: Arc<ScriptDelegate>) -> Self {
        self.scripts = Some(scripts);
        self
    }

    pub async fn render(&self, request: RenderRequest) -> Result<RenderResponse, DelegateError> {
        self.render_inner(request, None).await
    }

    /// Run a user script on a worker.
    pub async fn execute_script(
        &self,
        inputs: Value,
        options: Value,
        request: &mut RenderRequest,
    ) -> Result<Value, DelegateError> {
        let scripts = self
            .scripts
            .as_ref()
            .ok_or_else(|| DelegateError::unsupported("script execution is not configured"))?;
        scripts.execute(inputs, options, request).await
    }

    async fn render_inner(
        &self,
        mut request: RenderRequest,
        parent: Option<&RenderRequest>,
    ) -> Result<RenderResponse, DelegateError> {
        if let Some(parent) = parent {
            if request.context.worker_url().is_none() {
                request.context.worker_url = parent.context.worker_url.clone();
            }
        }

        let engine = request
            .template
            .engine
            .clone()
            .unwrap_or_else(|| DEFAULT_ENGINE.to_string());
        let content = if engine == DEFAULT_ENGINE {
            request.template.content.clone().unwrap_or_default()
        } else {
            self.evaluate_engine(&engine, &mut request).await?
        };

        let recipe_name = request
            .template
            .recipe
            .clone()
            .unwrap_or_else(|| DEFAULT_RECIPE.to_string());
        let recipe = self.recipes.get(&recipe_name).ok_or_else(|| {
            DelegateError::unsupported(format!("recipe `{recipe_name}` is not registered"))
        })?;

        debug!(
            target = "application::render",
            op = "orchestrator::render",
            recipe = %recipe_name,
            nested = parent.is_some(),
            "Rendering template"
        );
        request
            .context
            .log(LogLevel::Info, format!("Executing recipe {recipe_name}"));

        let mut response = RenderResponse::new(content);
        recipe.execute(&mut request, &mut response, self).await?;

        let worker_logs = std::mem::take(&mut response.meta.logs);
        response.meta.logs = request.context.logs;
        response.meta.logs.extend(worker_logs);
        Ok(response)
    }

    /// Evaluates the template on a worker and returns the produced text.
    /// Worker log entries that parse are appended to the request logs.
    async fn evaluate_engine(
        &self,
        engine: &str,
        request: &mut RenderRequest,
    ) -> Result<String, DelegateError> {
        let scripts = self.scripts.as_ref().ok_or_else(|| {
            DelegateError::unsupported(format!("templating engine `{engine}` is not available"))
        })?;

        let template = serde_json::to_value(&request.template)
            .map_err(|err| DelegateError::protocol(format!("failed to encode template: {err}")))?;
        let inputs = json!({
            "template": template,
            "data": request.data.clone().unwrap_or_else(|| json!({})),
            "engine": engine,
        });
        let mut reply = scripts.execute(inputs, json!({}), request).await?;

        if let Some(Value::Array(entries)) = reply.get_mut("logs").map(Value::take) {
            for entry in entries {
                match serde_json::from_value::<LogEntry>(entry) {
                    Ok(entry) => request.context.logs.push(entry),
                    Err(err) => warn!(
                        target = "application::render",
                        op = "orchestrator::engine",
                        error = %err,
                        "Skipping malformed worker log entry"
                    ),
                }
            }
        }

        match reply.get_mut("content").map(Value::take) {
            Some(Value::String(content)) => Ok(content),
            _ => Err(DelegateError::protocol(format!(
                "engine `{engine}` reply has no string `content`"
            ))),
        }
    }
}

#[async_trait]
impl NestedRenderer for Orchestrator {
    async fn render(
        &self,
        request: RenderRequest,
        parent: &RenderRequest,
    ) -> Result<RenderResponse, DelegateError> {
        self.render_inner(request, Some(parent)).await
    }
}
