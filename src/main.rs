//! gold-ingest — Binary Entrypoint
//! Runs the four acquisition tasks once, publishes the JSON snapshots and
//! exits 0 if any source succeeded, 1 if all failed.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use gold_ingest::ingest::rate_gate::TokioClock;
use gold_ingest::ingest::transport::HttpTransport;
use gold_ingest::metrics::Metrics;
use gold_ingest::{Credentials, OutputWriter, Pipeline, PipelineConfig};

#[derive(Parser)]
#[command(
    name = "gold-ingest",
    about = "Fetch gold price, Fed policy, dollar index and geopolitical news into static JSON"
)]
struct Cli {
    /// Path to a TOML config file. Defaults to $PIPELINE_CONFIG_PATH, then config/pipeline.toml.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Output directory for the published JSON files (overrides config).
    #[arg(long)]
    out_dir: Option<PathBuf>,

    /// Fetch and summarise, but write nothing.
    #[arg(long, default_value_t = false)]
    dry_run: bool,

    /// Write Prometheus text-format metrics here after the run.
    #[arg(long)]
    metrics_file: Option<PathBuf>,

    /// Emit logs as JSON lines.
    #[arg(long, default_value_t = false)]
    log_json: bool,
}

fn init_tracing(json: bool) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("gold_ingest=info,warn"));
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer().compact()).init();
    }
}

async fn run(cli: Cli) -> Result<i32> {
    let mut cfg = match &cli.config {
        Some(p) => PipelineConfig::load_from(p)?,
        None => PipelineConfig::load_default()?,
    };
    if let Some(dir) = cli.out_dir {
        cfg.output_dir = dir;
    }
    let creds = Credentials::from_env();
    tracing::info!(
        output_dir = %cfg.output_dir.display(),
        credentials = ?creds.present(),
        dry_run = cli.dry_run,
        "starting run"
    );

    let metrics = match &cli.metrics_file {
        Some(_) => Some(Metrics::init()?),
        None => None,
    };

    let transport = Arc::new(HttpTransport::new(cfg.request_timeout()).context("building HTTP client")?);
    let mut pipeline = Pipeline::from_config(&cfg, &creds, transport, Arc::new(TokioClock));
    let outcome = pipeline.run(Utc::now()).await;

    for line in outcome.summary_lines() {
        println!("{line}");
    }

    let mut code = outcome.exit_code();
    if !cli.dry_run {
        let writer = OutputWriter::new(&cfg.output_dir);
        let (written, errors) = writer.write_outcome(&outcome).await;
        println!("published {} file(s) to {}", written.len(), cfg.output_dir.display());
        if !errors.is_empty() {
            code = 1;
        }
    }

    if let (Some(m), Some(path)) = (&metrics, &cli.metrics_file) {
        if let Err(e) = m.write_textfile(path) {
            tracing::warn!("metrics export: {e:#}");
        }
    }

    Ok(code)
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    // Load .env in local/dev; no-op when the scheduler injects real env vars.
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    init_tracing(cli.log_json);

    match run(cli).await {
        Ok(0) => ExitCode::SUCCESS,
        Ok(_) => ExitCode::from(1),
        Err(e) => {
            tracing::error!("run aborted: {e:#}");
            ExitCode::from(1)
        }
    }
}
