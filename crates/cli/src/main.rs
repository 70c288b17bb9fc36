//! respipe CLI entry point.
//!
//! This binary is the composition root. Responsibilities:
//!
//! 1. **Parse configuration** — load `respipe.toml` (or `--config`).
//! 2. **Wire observability** — configure `tracing-subscriber` with a pretty or
//!    JSON layer and, when an endpoint is configured, an OpenTelemetry OTLP
//!    exporter.
//! 3. **Construct controllers** — memory, files, embedded blobs, settings, in
//!    that priority order, and compose the standard pipeline in front of them.
//! 4. **Execute one resource operation** and print the response body to stdout.

mod config;
mod telemetry;

use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, ValueEnum};
use controllers::{EmbeddedController, FileController, MemoryController, SettingsController};
use pipeline::{
    Body, CancellationToken, Controller, ControllerName, MaxAge, Method, Pipeline,
    ProviderSearch, Request, ResourceName, StatusCode,
};
use tracing::{error, info};

use crate::config::AppConfig;

/// Documents served under `embedded:`.
const EMBEDDED: [(&str, &[u8]); 1] = [("respipe.toml", include_bytes!("../respipe.example.toml"))];

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Verb {
    Read,
    Create,
    Update,
    Delete,
}

impl From<Verb> for Method {
    fn from(verb: Verb) -> Self {
        match verb {
            Verb::Read => Method::Read,
            Verb::Create => Method::Create,
            Verb::Update => Method::Update,
            Verb::Delete => Method::Delete,
        }
    }
}

/// Read and write resources through the resource pipeline.
#[derive(Debug, Parser)]
#[command(name = "respipe", version)]
struct Cli {
    /// Configuration file (defaults to ./respipe.toml when present).
    #[arg(long, short)]
    config: Option<PathBuf>,

    /// Operation to perform.
    #[arg(value_enum)]
    verb: Verb,

    /// Resource name, e.g. `file:/etc/hosts`, `settings:mode`, `notes/today.md`.
    name: String,

    /// Body for create/update.
    #[arg(long, short)]
    data: Option<String>,

    /// Report a missing resource on read as not-found instead of an error.
    #[arg(long)]
    optional: bool,

    /// Cache TTL in seconds; overrides `cache.default_max_age_secs`.
    #[arg(long)]
    max_age: Option<u64>,

    /// Restrict resolution to the controller with this name or tag.
    #[arg(long)]
    controller: Option<String>,
}

fn build_pipeline(config: &AppConfig) -> anyhow::Result<Pipeline> {
    let name = |n: &str| ControllerName::new(n).context("controller name");

    let memory = MemoryController::new(name("memory")?);
    for (key, value) in &config.memory.seed {
        memory.insert(key.clone(), value.clone());
    }
    let controllers: Vec<Arc<dyn Controller>> = vec![
        Arc::new(memory),
        Arc::new(FileController::new(name("files")?, &config.file.root)),
        Arc::new(EmbeddedController::new(name("embedded")?, EMBEDDED)),
        Arc::new(SettingsController::new(
            name("settings")?,
            config.settings.values.clone(),
        )),
    ];
    let search = ProviderSearch::new(controllers)?;
    Ok(nodes::standard_pipeline(
        &config.pipeline,
        Arc::new(search),
        Vec::new(),
    ))
}

fn build_request(cli: &Cli, config: &AppConfig) -> anyhow::Result<Request> {
    let name = ResourceName::new(cli.name.clone()).context("resource name must not be empty")?;
    let max_age = cli
        .max_age
        .unwrap_or(config.pipeline.cache.default_max_age_secs);
    let mut request = Request::new(cli.verb.into(), name)
        .with_required(!cli.optional)
        .with_max_age(MaxAge::from_secs(max_age));
    if let Some(data) = &cli.data {
        request = request.with_body(data.as_str());
    }
    if let Some(controller) = &cli.controller {
        request = request.with_controller(controller.clone());
    }
    Ok(request)
}

async fn run(cli: Cli, config: AppConfig) -> anyhow::Result<ExitCode> {
    let pipeline = build_pipeline(&config)?;
    let request = build_request(&cli, &config)?;
    let encoding = request.encoding;

    let token = CancellationToken::new();
    let request = request.with_cancellation(token.clone());
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            token.cancel();
        }
    });

    let response = pipeline.invoke(request).await?;
    info!(
        status = ?response.status,
        controller = ?response.controller.as_ref().map(ControllerName::as_str),
        cached = response.cached,
        "done"
    );
    if response.status == StatusCode::NotFound {
        return Ok(ExitCode::from(2));
    }
    if let Some(bytes) = response.body.to_bytes(encoding) {
        let mut stdout = std::io::stdout().lock();
        stdout.write_all(&bytes)?;
        if !bytes.ends_with(b"\n") && !matches!(response.body, Body::Empty) {
            stdout.write_all(b"\n")?;
        }
    }
    Ok(ExitCode::SUCCESS)
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let config = match AppConfig::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {e:#}");
            return ExitCode::FAILURE;
        }
    };
    let _telemetry = match telemetry::init(&config.telemetry) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("error: {e:#}");
            return ExitCode::FAILURE;
        }
    };

    match run(cli, config).await {
        Ok(code) => code,
        Err(e) => {
            error!(error = %format!("{e:#}"), "request failed");
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}
