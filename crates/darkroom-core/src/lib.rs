//! Darkroom Core - gallery image ingestion and derivative pipeline.
//!
//! Darkroom turns a freshly uploaded photo sitting under the staging prefix
//! into a published, orientation-corrected asset with a ladder of resized
//! derivatives and a completed image record.
//!
//! # Architecture
//!
//! ```text
//! UploadEvent → queue → worker → parse key → EXIF → decode → rotate
//!             → derivatives (fan-out) → record update → move to {YYYY}/
//! ```
//!
//! Any failure quarantines the event: the source stays under staging and a
//! report names the failure class.
//!
//! # Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use darkroom_core::{Config, EventProcessor, Pipeline, UploadEvent};
//! use darkroom_core::records::JsonlRecordStore;
//! use darkroom_core::storage::LocalObjectStore;
//!
//! #[tokio::main]
//! async fn main() -> darkroom_core::Result<()> {
//!     let config = Config::load()?;
//!     let store = Arc::new(LocalObjectStore::new(config.storage_root()).await?);
//!     let records = Arc::new(JsonlRecordStore::new(config.records_path()));
//!     let processor = Arc::new(EventProcessor::new(&config, store, records));
//!
//!     let pipeline = Pipeline::start(processor, &config.pipeline, |report| {
//!         println!("{} -> {:?}", report.key, report.stage);
//!     });
//!     pipeline
//!         .handle()
//!         .try_enqueue(UploadEvent::new("gallery", "staging/<uuid>.jpg", 0))
//!         .ok();
//!     let summary = pipeline.shutdown().await;
//!     println!("published {}", summary.published);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod keys;
pub mod output;
pub mod pipeline;
pub mod records;
pub mod storage;
pub mod types;

// Re-exports for convenient access
pub use config::Config;
pub use error::{ConfigError, DarkroomError, FailureKind, PipelineError, PipelineResult, Result};
pub use keys::{KeyError, ObjectKeyParts};
pub use output::{OutputFormat, OutputWriter, ReportTally};
pub use pipeline::{DrainSummary, EnqueueError, EventProcessor, Pipeline, PipelineHandle};
pub use types::{
    DerivativePurpose, DerivativeSpec, EventOutcome, EventReport, ExtractedMetadata,
    ImageRecordUpdate, PipelineStage, UploadEvent,
};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
