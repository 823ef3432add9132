//! The `darkroom quarantine` command: the manual-review listing.
//!
//! Anything still under the staging prefix was either never ingested or
//! quarantined by a failed run.

use clap::Args;
use darkroom_core::storage::{LocalObjectStore, ObjectStore};
use darkroom_core::{Config, ObjectKeyParts};
use serde::Serialize;

/// Arguments for the `quarantine` command.
#[derive(Args, Debug)]
pub struct QuarantineArgs {
    /// Print entries as JSON lines instead of a table
    #[arg(long)]
    pub json: bool,
}

/// One staged object awaiting review.
#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct StagedEntry {
    pub key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub problem: Option<String>,
}

/// Execute the quarantine command.
pub async fn execute(args: QuarantineArgs, config: &Config) -> anyhow::Result<()> {
    let store = LocalObjectStore::new(config.storage_root()).await?;
    let entries = staged_entries(&store, config).await?;

    if entries.is_empty() {
        eprintln!("Nothing under {}/", config.storage.staging_prefix);
        return Ok(());
    }

    for entry in &entries {
        if args.json {
            println!("{}", serde_json::to_string(entry)?);
        } else {
            let status = entry.problem.as_deref().unwrap_or("pending or quarantined");
            println!("{:<64}  {}", entry.key, status);
        }
    }
    tracing::info!(count = entries.len(), "Staged objects listed");
    Ok(())
}

/// Classify every object under the staging prefix.
pub async fn staged_entries(
    store: &dyn ObjectStore,
    config: &Config,
) -> anyhow::Result<Vec<StagedEntry>> {
    let keys = store.list(&config.storage.staging_prefix).await?;
    let entries = keys
        .into_iter()
        .map(|key| match ObjectKeyParts::parse(&key, Some(&config.storage.bucket)) {
            Ok(parts) => StagedEntry {
                slug: Some(parts.slug),
                problem: None,
                key,
            },
            Err(e) => StagedEntry {
                slug: None,
                problem: Some(format!("malformed key: {e}")),
                key,
            },
        })
        .collect();
    Ok(entries)
}
