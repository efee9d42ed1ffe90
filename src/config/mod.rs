//! Configuration layer: typed settings with layered precedence (file → env → CLI).

use std::{path::PathBuf, str::FromStr, time::Duration};

use clap::{Args, Parser, Subcommand, ValueHint, builder::BoolishValueParser};
use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;
use url::Url;

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "worker-delegate";
const ENV_PREFIX: &str = "WORKER_DELEGATE";
const DEFAULT_RECIPE: &str = "html";

/// Command-line arguments for the worker-delegate binary.
#[derive(Debug, Parser)]
#[command(
    name = "worker-delegate",
    version,
    about = "Run render recipes and scripts on remote workers"
)]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(
        long = "config-file",
        env = "WORKER_DELEGATE_CONFIG_FILE",
        value_name = "PATH"
    )]
    pub config_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Render a request document, delegating its recipe to a worker.
    Render(RenderArgs),
    /// Execute a script on a worker and print the worker's reply.
    Script(ScriptArgs),
}

#[derive(Debug, Args, Clone)]
pub struct RenderArgs {
    /// JSON render request (`template`, `data`, `options`, `context`).
    #[arg(value_name = "REQUEST.json", value_hint = ValueHint::FilePath)]
    pub request: PathBuf,

    /// Write the rendered bytes here instead of stdout.
    #[arg(long, value_name = "FILE", value_hint = ValueHint::FilePath)]
    pub out: Option<PathBuf>,

    #[command(flatten)]
    pub overrides: WorkerOverrides,
}

#[derive(Debug, Args, Clone)]
pub struct ScriptArgs {
    /// JSON document passed to the worker as `inputs`.
    #[arg(value_name = "INPUTS.json", value_hint = ValueHint::FilePath)]
    pub inputs: PathBuf,

    /// JSON document passed to the worker as `options`.
    #[arg(long, value_name = "OPTIONS.json", value_hint = ValueHint::FilePath)]
    pub options: Option<PathBuf>,

    #[command(flatten)]
    pub overrides: WorkerOverrides,
}

#[derive(Debug, Args, Default, Clone)]
pub struct WorkerOverrides {
    /// Override the default worker endpoint.
    #[arg(long = "worker-url", value_name = "URL")]
    pub worker_url: Option<String>,

    /// Override the per-request worker timeout.
    #[arg(long = "worker-timeout-seconds", value_name = "SECONDS")]
    pub worker_timeout_seconds: Option<u64>,

    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub log_json: Option<bool>,
}

impl Command {
    pub fn overrides(&self) -> &WorkerOverrides {
        match self {
            Command::Render(args) => &args.overrides,
            Command::Script(args) => &args.overrides,
        }
    }
}

/// Fully-resolved settings after precedence resolution and validation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub logging: LoggingSettings,
    pub worker: WorkerSettings,
    pub recipes: RecipeSettings,
}

#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub level: LevelFilter,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy)]
pub enum LogFormat {
    Json,
    Compact,
}

#[derive(Debug, Clone)]
pub struct WorkerSettings {
    /// Endpoint used when a request carries no `workerUrl` override.
    pub url: Option<Url>,
    pub request_timeout: Option<Duration>,
}

#[derive(Debug, Clone)]
pub struct RecipeSettings {
    /// Recipe names known to the local registry; all of them run on workers.
    pub names: Vec<String>,
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to build configuration: {0}")]
    Build(#[from] config::ConfigError),
    #[error("invalid configuration for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl LoadError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

/// Load settings using the configured precedence (file → environment → CLI).
pub fn load(cli: &CliArgs) -> Result<Settings, LoadError> {
    let mut builder = Config::builder()
        .add_source(File::with_name(DEFAULT_CONFIG_BASENAME).required(false))
        .add_source(File::with_name(LOCAL_CONFIG_BASENAME).required(false));

    if let Some(path) = cli.config_file.as_ref() {
        builder = builder.add_source(File::from(path.as_path()).required(true));
    }

    builder = builder.add_source(
        Environment::with_prefix(ENV_PREFIX)
            .separator("__")
            .try_parsing(true)
            .list_separator(",")
            .with_list_parse_key("recipes.names"),
    );

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;
    raw.apply_worker_overrides(cli.command.overrides());

    Settings::from_raw(raw)
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    logging: RawLoggingSettings,
    worker: RawWorkerSettings,
    recipes: RawRecipeSettings,
}

impl RawSettings {
    fn apply_worker_overrides(&mut self, overrides: &WorkerOverrides) {
        if let Some(url) = overrides.worker_url.as_ref() {
            self.worker.url = Some(url.clone());
        }
        if let Some(seconds) = overrides.worker_timeout_seconds {
            self.worker.request_timeout_seconds = Some(seconds);
        }
        if let Some(level) = overrides.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
        if let Some(json) = overrides.log_json {
            self.logging.json = Some(json);
        }
    }
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let RawSettings {
            logging,
            worker,
            recipes,
        } = raw;

        Ok(Self {
            logging: build_logging_settings(logging)?,
            worker: build_worker_settings(worker)?,
            recipes: build_recipe_settings(recipes),
        })
    }
}

fn build_logging_settings(logging: RawLoggingSettings) -> Result<LoggingSettings, LoadError> {
    let level = match logging.level {
        Some(level) => LevelFilter::from_str(level.as_str()).map_err(|err| {
            LoadError::invalid("logging.level", format!("failed to parse: {err}"))
        })?,
        None => LevelFilter::INFO,
    };

    let format = if logging.json.unwrap_or(false) {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };

    Ok(LoggingSettings { level, format })
}

fn build_worker_settings(worker: RawWorkerSettings) -> Result<WorkerSettings, LoadError> {
    let url = worker
        .url
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(|value| {
            Url::parse(value)
                .map_err(|err| LoadError::invalid("worker.url", format!("`{value}`: {err}")))
        })
        .transpose()?;

    let request_timeout = match worker.request_timeout_seconds {
        Some(0) => {
            return Err(LoadError::invalid(
                "worker.request_timeout_seconds",
                "must be greater than zero",
            ));
        }
        Some(seconds) => Some(Duration::from_secs(seconds)),
        None => None,
    };

    Ok(WorkerSettings {
        url,
        request_timeout,
    })
}

fn build_recipe_settings(recipes: RawRecipeSettings) -> RecipeSettings {
    let mut names: Vec<String> = Vec::new();
    for name in recipes.names.unwrap_or_default() {
        let name = name.trim();
        if !name.is_empty() && !names.iter().any(|known| known == name) {
            names.push(name.to_string());
        }
    }
    if names.is_empty() {
        names.push(DEFAULT_RECIPE.to_string());
    }

    RecipeSettings { names }
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    json: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawWorkerSettings {
    url: Option<String>,
    request_timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawRecipeSettings {
    names: Option<Vec<String>>,
}

/// Resolve configuration using the supplied CLI arguments, returning both for downstream use.
pub fn load_with_cli() -> Result<(CliArgs, Settings), LoadError> {
    let args = CliArgs::parse();
    let settings = load(&args)?;
    Ok((args, settings))
}

#[cfg(test)]
mod tests;
