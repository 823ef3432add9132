//! Per-event orchestration: the ingestion state machine.
//!
//! ```text
//! Received → Parsed → MetadataExtracted → Transformed → DerivativesWritten → Published
//!     └──────────┴──────────┴───────────────────┴────────────────┴──→ Quarantined
//! ```
//!
//! A quarantined event leaves its source under the staging prefix, along
//! with whatever derivatives were already written. Nothing is retried or
//! cleaned up here; the quarantine listing surfaces it for manual review.
//!
//! Publishing moves the source before completing its record. If the record
//! write fails the source is moved back, so a completed record always names
//! an object that exists.

use chrono::Datelike;
use image::GenericImageView;
use std::io::Cursor;
use std::sync::Arc;
use std::time::Instant;

use crate::config::Config;
use crate::error::{PipelineError, PipelineResult};
use crate::keys::{KeyError, ObjectKeyParts};
use crate::records::ImageRecordStore;
use crate::storage::ObjectStore;
use crate::types::{EventOutcome, EventReport, ImageRecordUpdate, PipelineStage, UploadEvent};

use super::decode::ImageDecoder;
use super::derivative::{DerivativeGenerator, DERIVATIVE_CONTENT_TYPE};
use super::metadata::MetadataExtractor;
use super::task_group::{TaskFailure, TaskGroup};
use super::transform;
use super::validate::Validator;

/// Processes one upload event from staging to published or quarantined.
pub struct EventProcessor {
    store: Arc<dyn ObjectStore>,
    records: Arc<dyn ImageRecordStore>,
    staging_prefix: String,
    validator: Validator,
    decoder: ImageDecoder,
    derivatives: Arc<DerivativeGenerator>,
    max_collected_errors: usize,
}

/// What an event achieved before it finished.
#[derive(Debug)]
struct Progress {
    stage: PipelineStage,
    slug: Option<String>,
    rotation: Option<u16>,
    derivatives: Vec<String>,
}

impl Progress {
    fn new() -> Self {
        Self {
            stage: PipelineStage::Received,
            slug: None,
            rotation: None,
            derivatives: Vec::new(),
        }
    }

    fn advance(&mut self, stage: PipelineStage) {
        tracing::trace!(slug = ?self.slug, %stage, "Stage reached");
        self.stage = stage;
    }
}

impl EventProcessor {
    /// Create a processor writing through the given collaborators.
    pub fn new(
        config: &Config,
        store: Arc<dyn ObjectStore>,
        records: Arc<dyn ImageRecordStore>,
    ) -> Self {
        Self {
            store,
            records,
            staging_prefix: config.storage.staging_prefix.clone(),
            validator: Validator::new(config.limits.clone()),
            decoder: ImageDecoder::new(config.limits.clone()),
            derivatives: Arc::new(DerivativeGenerator::new(config.derivatives.clone())),
            max_collected_errors: config.pipeline.max_collected_errors,
        }
    }

    /// Run one event to completion. Never fails: failures become a
    /// quarantined report.
    pub async fn process(&self, event: UploadEvent) -> EventReport {
        let start = Instant::now();
        let mut progress = Progress::new();
        tracing::debug!(key = %event.key, bucket = %event.bucket, "Processing upload event");

        let outcome = match self.run(&event, &mut progress).await {
            Ok(record) => {
                progress.advance(PipelineStage::Published);
                tracing::info!(
                    slug = %record.slug,
                    key = %record.object_key,
                    width = record.width,
                    height = record.height,
                    derivatives = progress.derivatives.len(),
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    "Published image"
                );
                EventOutcome::Published {
                    object_key: record.object_key.clone(),
                    record,
                }
            }
            Err(e) => {
                let kind = e.kind();
                tracing::error!(
                    key = %event.key,
                    slug = progress.slug.as_deref().unwrap_or("-"),
                    stage = %progress.stage,
                    %kind,
                    error = %e,
                    partial_derivatives = progress.derivatives.len(),
                    "Quarantined upload"
                );
                EventOutcome::Quarantined {
                    kind,
                    reason: e.to_string(),
                }
            }
        };

        progress.derivatives.sort();
        EventReport {
            key: event.key,
            slug: progress.slug,
            stage: progress.stage,
            outcome,
            rotation: progress.rotation,
            derivatives: progress.derivatives,
            elapsed_ms: start.elapsed().as_millis() as u64,
        }
    }

    async fn run(
        &self,
        event: &UploadEvent,
        progress: &mut Progress,
    ) -> PipelineResult<ImageRecordUpdate> {
        // Received → Parsed
        let malformed = |source: KeyError| PipelineError::MalformedKey {
            key: event.key.clone(),
            source,
        };
        let parts = ObjectKeyParts::parse(&event.key, Some(&event.bucket))
            .map_err(malformed)?;
        progress.slug = Some(parts.slug.clone());
        if !parts.is_under(&self.staging_prefix) {
            return Err(malformed(KeyError::OutsidePrefix(self.staging_prefix.clone())));
        }
        progress.advance(PipelineStage::Parsed);

        // Parsed → MetadataExtracted
        let source_key = parts.object_key();
        let bytes = self
            .store
            .get_object(&source_key)
            .await
            .map_err(|source| PipelineError::Storage {
                key: source_key.clone(),
                operation: "get",
                source,
            })?;
        if event.size > 0 && event.size != bytes.len() as u64 {
            tracing::warn!(
                slug = %parts.slug,
                notified = event.size,
                actual = bytes.len(),
                "Object size differs from notification"
            );
        }
        self.validator.validate(&bytes, &source_key)?;
        let size = bytes.len() as u64;

        let mut stream = Cursor::new(bytes);
        let metadata = MetadataExtractor::extract(&mut stream);
        tracing::debug!(slug = %parts.slug, ?metadata, "Extracted metadata");
        progress.advance(PipelineStage::MetadataExtracted);

        // MetadataExtracted → Transformed
        let raw = stream.into_inner();
        let decoded = self.decoder.decode(raw, &source_key).await?;
        let rotation = metadata.rotation;
        let image = tokio::task::spawn_blocking(move || {
            transform::rotate(decoded.image, i32::from(rotation))
        })
        .await
        .map_err(|e| PipelineError::Decode {
            key: source_key.clone(),
            message: format!("Rotation task failed: {e}"),
        })?;
        let (width, height) = image.dimensions();
        progress.rotation = Some(rotation);
        progress.advance(PipelineStage::Transformed);

        // Transformed → DerivativesWritten
        let year = metadata.captured_at.unwrap_or(event.received_at).year();
        let directory = ObjectKeyParts::published_directory(year);
        self.write_derivatives(Arc::new(image), &parts, &directory, progress)
            .await?;
        progress.advance(PipelineStage::DerivativesWritten);

        // DerivativesWritten → Published
        let published_key = parts.published_key(year);
        let record = ImageRecordUpdate {
            slug: parts.slug.clone(),
            width,
            height,
            size,
            capture_date: metadata
                .captured_at
                .map(|t| t.to_rfc3339())
                .unwrap_or_default(),
            object_key: published_key.clone(),
        };
        self.store
            .move_object(&source_key, &published_key)
            .await
            .map_err(|source| PipelineError::Storage {
                key: source_key.clone(),
                operation: "move",
                source,
            })?;
        if let Err(e) = self.records.complete(&record).await {
            if let Err(restore) = self.store.move_object(&published_key, &source_key).await {
                tracing::error!(
                    slug = %parts.slug,
                    key = %published_key,
                    error = %restore,
                    "Failed to return source to staging"
                );
            }
            return Err(PipelineError::MetadataRecord {
                slug: parts.slug.clone(),
                message: e.to_string(),
            });
        }

        Ok(record)
    }

    /// Render and write every planned derivative in parallel.
    async fn write_derivatives(
        &self,
        image: Arc<image::DynamicImage>,
        parts: &ObjectKeyParts,
        directory: &str,
        progress: &mut Progress,
    ) -> PipelineResult<()> {
        let mut group: TaskGroup<String, PipelineError> =
            TaskGroup::new(self.max_collected_errors);

        for spec in self.derivatives.plan(parts, directory) {
            let image = image.clone();
            let generator = self.derivatives.clone();
            let store = self.store.clone();

            group.spawn(async move {
                let key = spec.key.clone();
                let rendered = tokio::task::spawn_blocking(move || generator.render(&image, &spec))
                    .await
                    .map_err(|e| PipelineError::Derivative {
                        key: key.clone(),
                        message: format!("Render task failed: {e}"),
                    })?;
                let bytes = rendered.map_err(|e| PipelineError::Derivative {
                    key: key.clone(),
                    message: e.to_string(),
                })?;
                store
                    .put_object(&key, bytes, DERIVATIVE_CONTENT_TYPE)
                    .await
                    .map_err(|source| PipelineError::Storage {
                        key: key.clone(),
                        operation: "put",
                        source,
                    })?;
                Ok(key)
            });
        }

        match group.join().await {
            Ok(keys) => {
                progress.derivatives = keys;
                Ok(())
            }
            Err(group_error) => {
                progress.derivatives = group_error.completed;
                let failures = group_error
                    .failures
                    .into_iter()
                    .map(|failure| match failure {
                        TaskFailure::Failed(e) => e,
                        TaskFailure::Panicked(message) => PipelineError::Derivative {
                            key: parts.object_key(),
                            message,
                        },
                    })
                    .collect();
                Err(PipelineError::Aggregate {
                    slug: parts.slug.clone(),
                    tasks: group_error.tasks,
                    total: group_error.total,
                    failures,
                })
            }
        }
    }
}
