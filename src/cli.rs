//! Command-line interface definitions.
//!
//! Uses clap derive API for argument parsing. Credentials and connection
//! parameters come from the environment, never from flags.

use clap::{Parser, Subcommand};

/// Weather ETL pipeline: OpenWeather readings into Postgres with a live dashboard.
#[derive(Parser, Debug)]
#[command(name = "meteopipe")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Command to run
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose debug logging
    #[arg(long, global = true)]
    pub verbose: bool,

    /// Suppress all output except errors
    #[arg(long, global = true)]
    pub quiet: bool,
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Execute one ETL pass (fetch, transform, load) and exit
    Run,

    /// Start the read-only web dashboard
    Serve(ServeArgs),
}

/// Arguments for the `serve` command.
#[derive(Parser, Debug)]
pub struct ServeArgs {
    /// Port to listen on
    #[arg(long, short = 'p', default_value = "8080")]
    pub port: u16,

    /// Host to bind to
    #[arg(long, default_value = "127.0.0.1")]
    pub host: String,

    /// Dashboard refresh interval in seconds (minimum 10)
    #[arg(long, default_value = "120")]
    pub refresh_secs: u64,

    /// Time window shown in the chart, in hours
    #[arg(long, default_value = "24")]
    pub window_hours: i64,
}
