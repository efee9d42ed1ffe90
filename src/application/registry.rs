//! Recipe registry and the shim that routes every recipe to a worker.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use crate::application::error::DelegateError;
use crate::application::lease::WorkerPool;
use crate::application::recipe::RecipeDelegate;
use crate::application::render::NestedRenderer;
use crate::domain::request::RenderRequest;
use crate::domain::response::RenderResponse;

/// Turns a prepared request/response pair into final output.
#[async_trait]
pub trait RecipeExecutor: Send + Sync {
    async fn execute(
        &self,
        request: &mut RenderRequest,
        response: &mut RenderResponse,
        renderer: &dyn NestedRenderer,
    ) -> Result<(), DelegateError>;
}

#[derive(Clone)]
pub struct Recipe {
    name: String,
    executor: Arc<dyn RecipeExecutor>,
}

impl Recipe {
    pub fn new(name: impl Into<String>, executor: Arc<dyn RecipeExecutor>) -> Self {
        Self {
            name: name.into(),
            executor,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub async fn execute(
        &self,
        request: &mut RenderRequest,
        response: &mut RenderResponse,
        renderer: &dyn NestedRenderer,
    ) -> Result<(), DelegateError> {
        self.executor.execute(request, response, renderer).await
    }
}

#[derive(Clone, Default)]
pub struct RecipeRegistry {
    recipes: Vec<Recipe>,
    delegated: bool,
}

impl RecipeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the built-in `html` recipe.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register("html", Arc::new(HtmlRecipe));
        registry
    }

    /// Add or replace a recipe by name.
    pub fn register(&mut self, name: impl Into<String>, executor: Arc<dyn RecipeExecutor>) {
        let recipe = Recipe::new(name, executor);
        match self.recipes.iter_mut().find(|r| r.name == recipe.name) {
            Some(existing) => *existing = recipe,
            None => self.recipes.push(recipe),
        }
    }

    /// Register a recipe that only a worker can run.
    ///
    /// Until delegation is installed, executing it fails as unsupported.
    pub fn declare(&mut self, name: impl Into<String>) {
        let name = name.into();
        if self.get(&name).is_none() {
            let executor = Arc::new(WorkerOnlyRecipe { name: name.clone() });
            self.register(name, executor);
        }
    }

    pub fn get(&self, name: &str) -> Option<&Recipe> {
        self.recipes.iter().find(|recipe| recipe.name == name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.recipes.iter().map(Recipe::name)
    }

    pub fn is_delegated(&self) -> bool {
        self.delegated
    }

    /// Replace every registered recipe's executor with a worker-delegating one.
    ///
    /// Names are kept, so lookups are unaffected. Installing twice is a no-op.
    pub fn install_delegation(&mut self, pool: Arc<dyn WorkerPool>, delegate: Arc<RecipeDelegate>) {
        if self.delegated {
            return;
        }

        for recipe in &mut self.recipes {
            recipe.executor = Arc::new(DelegatedRecipe {
                name: recipe.name.clone(),
                pool: Arc::clone(&pool),
                delegate: Arc::clone(&delegate),
            });
        }
        self.delegated = true;

        info!(
            target = "application::registry",
            op = "registry::install_delegation",
            recipes = self.recipes.len(),
            "Recipes delegated to workers"
        );
    }
}

/// Executor installed by [`RecipeRegistry::install_delegation`].
struct DelegatedRecipe {
    name: String,
    pool: Arc<dyn WorkerPool>,
    delegate: Arc<RecipeDelegate>,
}

#[async_trait]
impl RecipeExecutor for DelegatedRecipe {
    async fn execute(
        &self,
        request: &mut RenderRequest,
        response: &mut RenderResponse,
        renderer: &dyn NestedRenderer,
    ) -> Result<(), DelegateError> {
        let lease = self.pool.acquire(request).await?;
        let Some(endpoint) = lease.endpoint().cloned() else {
            lease.release(None);
            return Err(DelegateError::configuration(
                "worker obtained has no url assigned to execute recipe in it",
            ));
        };

        self.delegate
            .execute(lease, endpoint, &self.name, request, response, renderer)
            .await
    }
}

struct WorkerOnlyRecipe {
    name: String,
}

#[async_trait]
impl RecipeExecutor for WorkerOnlyRecipe {
    async fn execute(
        &self,
        _request: &mut RenderRequest,
        _response: &mut RenderResponse,
        _renderer: &dyn NestedRenderer,
    ) -> Result<(), DelegateError> {
        Err(DelegateError::unsupported(format!(
            "recipe `{}` has no local implementation and delegation is not installed",
            self.name
        )))
    }
}

/// Local passthrough: the template output is the final HTML.
struct HtmlRecipe;

#[async_trait]
impl RecipeExecutor for HtmlRecipe {
    async fn execute(
        &self,
        _request: &mut RenderRequest,
        response: &mut RenderResponse,
        _renderer: &dyn NestedRenderer,
    ) -> Result<(), DelegateError> {
        response.meta.content_type = Some("text/html".to_string());
        Ok(())
    }
}
