//! Darkroom CLI - gallery image ingestion worker.
//!
//! Darkroom picks up photos uploaded under the staging prefix of a local
//! object store, corrects their orientation, renders the tile, thumbnail and
//! blur derivatives, completes the image record and publishes the source
//! under its capture year.
//!
//! # Usage
//!
//! ```bash
//! # Ingest specific uploads
//! darkroom ingest staging/0b5c3f0e-8a55-4c8e-9d7a-3f1f2b6c9a10.jpg
//!
//! # Ingest everything still waiting in staging
//! darkroom scan --format jsonl --output reports.jsonl
//!
//! # Review what was left behind
//! darkroom quarantine
//!
//! # View configuration
//! darkroom config show
//! ```

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod cli;
mod logging;

/// Darkroom - turns staged uploads into published multi-resolution images.
#[derive(Parser, Debug)]
#[command(name = "darkroom")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose (debug) logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output logs in JSON format
    #[arg(long, global = true)]
    json_logs: bool,

    /// Config file to use instead of the default location
    #[arg(long, global = true, env = "DARKROOM_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Process the given staged object keys
    Ingest(cli::ingest::IngestArgs),

    /// Process every object found under the staging prefix
    Scan(cli::ingest::ScanArgs),

    /// List objects left under the staging prefix for manual review
    Quarantine(cli::quarantine::QuarantineArgs),

    /// View and manage configuration
    Config(cli::config::ConfigArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Logging isn't initialized yet, so config warnings go through eprintln.
    let config = cli::load_config(cli.config.as_deref());
    logging::init_from_config(&config, cli.verbose, cli.json_logs);

    tracing::debug!("Darkroom v{}", darkroom_core::VERSION);

    match cli.command {
        Commands::Ingest(args) => cli::ingest::execute(args, &config).await,
        Commands::Scan(args) => cli::ingest::execute_scan(args, &config).await,
        Commands::Quarantine(args) => cli::quarantine::execute(args, &config).await,
        Commands::Config(args) => cli::config::execute(args, &config, cli.config.as_deref()).await,
    }
}
