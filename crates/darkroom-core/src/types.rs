//! Core data types flowing through the ingestion pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::FailureKind;

/// An upload notification, as handed over by the notification handler.
///
/// Lives only in the event queue and is consumed exactly once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadEvent {
    /// Bucket the object was uploaded to
    pub bucket: String,

    /// Staging object key (may carry a leading bucket segment)
    pub key: String,

    /// Object size reported by the storage notification
    pub size: u64,

    /// Content type reported by the uploader, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,

    /// When the notification was received
    pub received_at: DateTime<Utc>,
}

impl UploadEvent {
    /// Build an event received now.
    pub fn new(bucket: impl Into<String>, key: impl Into<String>, size: u64) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
            size,
            content_type: None,
            received_at: Utc::now(),
        }
    }
}

/// GPS position in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GpsCoordinates {
    pub latitude: f64,
    pub longitude: f64,
}

/// Best-effort metadata read from the source bytes.
///
/// Every field is optional except `rotation`, which defaults to 0.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractedMetadata {
    /// Capture time: original, then digitized, then generic timestamp
    #[serde(skip_serializing_if = "Option::is_none")]
    pub captured_at: Option<DateTime<Utc>>,

    /// Pixel width as stored (before rotation)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,

    /// Pixel height as stored (before rotation)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,

    /// Clockwise rotation that corrects the stored orientation
    pub rotation: u16,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub gps: Option<GpsCoordinates>,
}

/// What a derivative is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DerivativePurpose {
    Tile,
    Thumbnail,
    Blur,
}

/// One derivative to render and write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DerivativeSpec {
    pub purpose: DerivativePurpose,
    /// Target width; for the blur placeholder, the long-side bound
    pub width: u32,
    pub key: String,
}

/// Fields the pipeline fills into an existing image record, keyed by slug.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageRecordUpdate {
    pub slug: String,
    pub width: u32,
    pub height: u32,
    pub size: u64,
    /// RFC 3339 capture date, or empty when unknown
    pub capture_date: String,
    /// Canonical key of the published source
    pub object_key: String,
}

/// States of the per-event state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    Received,
    Parsed,
    MetadataExtracted,
    Transformed,
    DerivativesWritten,
    Published,
    Quarantined,
}

impl std::fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            PipelineStage::Received => "received",
            PipelineStage::Parsed => "parsed",
            PipelineStage::MetadataExtracted => "metadata_extracted",
            PipelineStage::Transformed => "transformed",
            PipelineStage::DerivativesWritten => "derivatives_written",
            PipelineStage::Published => "published",
            PipelineStage::Quarantined => "quarantined",
        };
        f.write_str(name)
    }
}

/// Terminal outcome of one event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum EventOutcome {
    Published {
        object_key: String,
        record: ImageRecordUpdate,
    },
    Quarantined {
        kind: FailureKind,
        reason: String,
    },
}

/// Report emitted for every processed event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventReport {
    /// Key the event referred to
    pub key: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,

    /// Last stage completed before the outcome
    pub stage: PipelineStage,

    #[serde(flatten)]
    pub outcome: EventOutcome,

    /// Rotation applied to the pixels, once decoded
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rotation: Option<u16>,

    /// Derivative keys written, including those of a quarantined event
    pub derivatives: Vec<String>,

    pub elapsed_ms: u64,
}

impl EventReport {
    pub fn is_published(&self) -> bool {
        matches!(self.outcome, EventOutcome::Published { .. })
    }

    pub fn failure_kind(&self) -> Option<FailureKind> {
        match &self.outcome {
            EventOutcome::Quarantined { kind, .. } => Some(*kind),
            EventOutcome::Published { .. } => None,
        }
    }
}
