//! The `darkroom ingest` and `darkroom scan` commands.

mod batch;
pub mod types;

pub use types::OutputFormat;

use clap::Args;
use darkroom_core::storage::{LocalObjectStore, ObjectStore};
use darkroom_core::{Config, UploadEvent};
use std::path::PathBuf;

use batch::run_events;

/// Options shared by every command that runs the pipeline.
#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    /// Report file (defaults to stdout)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Report format
    #[arg(short, long, value_enum, default_value = "jsonl")]
    pub format: OutputFormat,

    /// Number of workers (overrides `pipeline.workers`)
    #[arg(short, long)]
    pub workers: Option<usize>,

    /// Bucket name stripped from keys (overrides `storage.bucket`)
    #[arg(long)]
    pub bucket: Option<String>,
}

/// Arguments for the `ingest` command.
#[derive(Args, Debug)]
pub struct IngestArgs {
    /// Staged object keys, e.g. `staging/<uuid>.jpg`
    #[arg(required = true)]
    pub keys: Vec<String>,

    #[command(flatten)]
    pub run: RunArgs,
}

/// Arguments for the `scan` command.
#[derive(Args, Debug)]
pub struct ScanArgs {
    /// Prefix to scan (defaults to `storage.staging_prefix`); keys outside
    /// the staging prefix are reported as malformed and left alone
    #[arg(long)]
    pub prefix: Option<String>,

    /// Process at most this many objects
    #[arg(long)]
    pub limit: Option<usize>,

    #[command(flatten)]
    pub run: RunArgs,
}

/// Execute the ingest command.
pub async fn execute(args: IngestArgs, config: &Config) -> anyhow::Result<()> {
    let config = effective_config(config, &args.run);
    let store = open_store(&config).await?;
    let events = build_events(&config, args.keys);
    run_events(&config, store, events, &args.run).await
}

/// Execute the scan command.
pub async fn execute_scan(args: ScanArgs, config: &Config) -> anyhow::Result<()> {
    let config = effective_config(config, &args.run);
    let store = open_store(&config).await?;

    let prefix = args
        .prefix
        .unwrap_or_else(|| config.storage.staging_prefix.clone());
    let mut keys = store.list(&prefix).await?;
    if let Some(limit) = args.limit {
        keys.truncate(limit);
    }
    if keys.is_empty() {
        tracing::info!(prefix = %prefix, "Nothing to ingest");
        return Ok(());
    }
    tracing::info!(prefix = %prefix, count = keys.len(), "Found staged objects");

    let events = build_events(&config, keys);
    run_events(&config, store, events, &args.run).await
}

/// Apply command-line overrides on top of the loaded config.
fn effective_config(config: &Config, run: &RunArgs) -> Config {
    let mut config = config.clone();
    if let Some(workers) = run.workers.filter(|w| *w > 0) {
        config.pipeline.workers = workers;
    }
    if let Some(bucket) = &run.bucket {
        config.storage.bucket = bucket.clone();
    }
    config
}

async fn open_store(config: &Config) -> anyhow::Result<LocalObjectStore> {
    let root = config.storage_root();
    tracing::debug!(root = %root.display(), "Opening object store");
    Ok(LocalObjectStore::new(root).await?)
}

/// One event per key, as the notification handler would deliver it.
///
/// The local store does not report sizes, so events carry 0 (unknown).
fn build_events(config: &Config, keys: Vec<String>) -> Vec<UploadEvent> {
    keys.into_iter()
        .map(|key| UploadEvent::new(config.storage.bucket.clone(), key, 0))
        .collect()
}
