mod cli;
mod commands;
mod config;
mod ids;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use tsgrid_core::EnvConfig;

use crate::cli::{CliArgs, Command};
use crate::config::{CliConfig, RunSettings};

#[tokio::main]
async fn main() -> Result<()> {
    tsgrid_core::config::load_dotenv();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let args = CliArgs::parse();

    let env = EnvConfig::from_env();
    env.log_summary();
    let config = CliConfig::load(args.config.as_deref()).context("failed to load configuration")?;

    match args.command {
        Command::Compute(ref compute) => {
            let settings = RunSettings::resolve(compute, args.bundle.as_deref(), &env, &config)?;
            info!(
                bundle = %settings.bundle.display(),
                parallel = settings.scheduler.parallel,
                threads = settings.scheduler.worker_threads,
                profile = env.profile_label(),
                "Starting compute run"
            );
            let summary = commands::compute(settings).await?;
            println!(
                "{} cells written ({} good, {} errors, {} special) across {} series{}",
                summary.cells_written(),
                summary.counts.good(),
                summary.counts.errors(),
                summary.counts.special(),
                summary.rows_processed,
                if summary.cancelled { ", cancelled" } else { "" }
            );
        }
        Command::Summary => {
            let path = config.resolve_bundle(args.bundle.as_deref(), &env)?;
            commands::summary(&path)?;
        }
        Command::Reset(ref reset) => {
            let path = config.resolve_bundle(args.bundle.as_deref(), &env)?;
            commands::reset(&path, reset)?;
        }
        Command::Computations => commands::computations(),
    }
    Ok(())
}
