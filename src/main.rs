//! meteopipe - weather ETL into Postgres with a live dashboard.
//!
//! `meteopipe run` executes one fetch → transform → load pass against the
//! OpenWeather API and exits; an external scheduler supplies the cadence.
//! `meteopipe serve` starts the read-only web dashboard over the same table.

use std::io;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::error;

mod cli;
mod client;
mod config;
mod db;
mod errors;
mod models;
mod pipeline;
mod server;
mod transform;

use cli::{Cli, Command};
use config::Config;

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e:#}");
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing based on verbosity
    init_tracing(cli.verbose, cli.quiet);

    match cli.command {
        Command::Run => cmd_run(),
        Command::Serve(args) => cmd_serve(args),
    }
}

/// Initialize tracing subscriber.
fn init_tracing(verbose: bool, quiet: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = if quiet {
        EnvFilter::new("error")
    } else if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

/// Execute the `run` command - one ETL pass.
fn cmd_run() -> Result<()> {
    let config = Config::from_env().context("failed to read configuration")?;

    let row_id = tokio::runtime::Runtime::new()
        .context("failed to create tokio runtime")?
        .block_on(pipeline::run_once(&config))?;

    tracing::debug!(row_id, "run finished");
    Ok(())
}

/// Execute the `serve` command - start the dashboard.
fn cmd_serve(args: cli::ServeArgs) -> Result<()> {
    let db_config = config::DbConfig::from_env().context("failed to read configuration")?;

    // Validate refresh interval
    let refresh_secs = args.refresh_secs.max(10);
    if refresh_secs != args.refresh_secs {
        tracing::warn!("refresh interval clamped to minimum of 10 seconds");
    }

    let server_config = server::ServerConfig {
        port: args.port,
        host: args.host,
        refresh_secs,
        window_hours: args.window_hours.max(1),
    };

    tokio::runtime::Runtime::new()
        .context("failed to create tokio runtime")?
        .block_on(server::run_server(server_config, db_config))
}
