use std::{
    io::Write,
    path::Path,
    process,
    sync::Arc,
};

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{Dispatch, Level, dispatcher, error, info};
use tracing_subscriber::fmt as tracing_fmt;
use worker_delegate::{
    application::{
        caller::WorkerCaller,
        correlation::UuidCorrelation,
        error::AppError,
        lease::StaticWorkerPool,
        recipe::RecipeDelegate,
        registry::RecipeRegistry,
        render::Orchestrator,
        script::ScriptDelegate,
    },
    config::{self, RenderArgs, ScriptArgs},
    domain::request::RenderRequest,
    infra::{error::InfraError, telemetry, worker_http::HttpWorkerTransport},
};

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    let stack = match error {
        AppError::Delegate(err) => err.stack(),
        _ => None,
    };

    if dispatcher::has_been_set() {
        error!(error = %error, stack, "application error");
        return;
    }

    let subscriber = tracing_fmt()
        .with_max_level(Level::ERROR)
        .with_writer(std::io::stderr)
        .finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, stack, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()
        .map_err(|err| AppError::unexpected(format!("failed to load configuration: {err}")))?;

    telemetry::init(&settings.logging).map_err(AppError::from)?;
    let orchestrator = build_orchestrator(&settings)?;

    match cli_args.command {
        config::Command::Render(args) => run_render(&orchestrator, args).await,
        config::Command::Script(args) => run_script(&orchestrator, args).await,
    }
}

fn build_orchestrator(settings: &config::Settings) -> Result<Orchestrator, AppError> {
    let transport = Arc::new(HttpWorkerTransport::new(settings.worker.request_timeout)?);
    let caller = WorkerCaller::new(transport);
    let ids = Arc::new(UuidCorrelation);
    let pool = Arc::new(StaticWorkerPool::new(settings.worker.url.clone()));

    let mut registry = RecipeRegistry::with_builtins();
    for name in &settings.recipes.names {
        registry.declare(name.as_str());
    }
    registry.install_delegation(
        pool.clone(),
        Arc::new(RecipeDelegate::new(caller.clone(), ids.clone())),
    );

    let scripts = Arc::new(ScriptDelegate::new(pool, caller, ids));
    Ok(Orchestrator::new(registry).with_scripts(scripts))
}

async fn run_render(orchestrator: &Orchestrator, args: RenderArgs) -> Result<(), AppError> {
    let request: RenderRequest = read_json(&args.request).await?;
    let response = orchestrator.render(request).await?;

    info!(
        op = "render",
        result = "ok",
        bytes = response.content.len(),
        content_type = response.meta.content_type.as_deref(),
        "Render finished"
    );

    match args.out {
        Some(path) => write_file(&path, &response.content).await,
        None => write_stdout(&response.content),
    }
}

async fn run_script(orchestrator: &Orchestrator, args: ScriptArgs) -> Result<(), AppError> {
    let inputs: Value = read_json(&args.inputs).await?;
    let options: Value = match args.options.as_ref() {
        Some(path) => read_json(path).await?,
        None => Value::Object(Default::default()),
    };

    let mut request = RenderRequest::default();
    let reply = orchestrator
        .execute_script(inputs, options, &mut request)
        .await?;

    info!(op = "script", result = "ok", "Script finished");

    let mut rendered = serde_json::to_vec_pretty(&reply)
        .map_err(|err| AppError::unexpected(format!("failed to encode script reply: {err}")))?;
    rendered.push(b'\n');
    write_stdout(&rendered)
}

async fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, AppError> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;
    serde_json::from_slice(&bytes).map_err(|err| {
        AppError::unexpected(format!("failed to parse {}: {err}", path.display()))
    })
}

async fn write_file(path: &Path, bytes: &[u8]) -> Result<(), AppError> {
    tokio::fs::write(path, bytes)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))
}

fn write_stdout(bytes: &[u8]) -> Result<(), AppError> {
    let mut stdout = std::io::stdout().lock();
    stdout
        .write_all(bytes)
        .and_then(|()| stdout.flush())
        .map_err(|err| AppError::from(InfraError::from(err)))
}
