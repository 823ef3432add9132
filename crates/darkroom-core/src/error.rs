//! Error types for the Darkroom ingestion pipeline.
//!
//! Errors are organized by stage so that a quarantined event can be traced
//! back to the object key, the stage that failed and the underlying cause.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::keys::KeyError;
use crate::storage::StorageError;

/// Top-level error type for Darkroom operations.
#[derive(Error, Debug)]
pub enum DarkroomError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Pipeline processing errors
    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// Object storage errors outside of event processing
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// General I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read the config file from disk
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    /// Failed to parse TOML configuration
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Configuration values are invalid
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Failure classes an event can be quarantined with.
///
/// Metadata extraction is absent on purpose: missing EXIF always degrades
/// to empty fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    MalformedKey,
    DecodeFailure,
    DerivativeFailure,
    StorageFailure,
    MetadataRecordFailure,
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            FailureKind::MalformedKey => "MalformedKey",
            FailureKind::DecodeFailure => "DecodeFailure",
            FailureKind::DerivativeFailure => "DerivativeFailure",
            FailureKind::StorageFailure => "StorageFailure",
            FailureKind::MetadataRecordFailure => "MetadataRecordFailure",
        };
        f.write_str(name)
    }
}

/// Pipeline processing errors, organized by stage.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// The object key cannot address an image
    #[error("Malformed object key {key:?}: {source}")]
    MalformedKey {
        key: String,
        #[source]
        source: KeyError,
    },

    /// Source bytes are corrupt, unsupported or exceed limits
    #[error("Decode error for {key}: {message}")]
    Decode { key: String, message: String },

    /// Resizing or encoding a derivative failed
    #[error("Derivative {key} failed: {message}")]
    Derivative { key: String, message: String },

    /// Object storage read, write or move failed
    #[error("Storage {operation} failed for {key}: {source}")]
    Storage {
        key: String,
        operation: &'static str,
        #[source]
        source: StorageError,
    },

    /// The image record could not be completed
    #[error("Image record update failed for slug {slug}: {message}")]
    MetadataRecord { slug: String, message: String },

    /// One or more fan-out tasks failed
    #[error("{total} of {tasks} derivative task(s) failed for {slug}; first: {}", first_message(.failures))]
    Aggregate {
        slug: String,
        tasks: usize,
        total: usize,
        failures: Vec<PipelineError>,
    },
}

fn first_message(failures: &[PipelineError]) -> String {
    failures
        .first()
        .map(|e| e.to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

impl PipelineError {
    /// The quarantine class of this error.
    ///
    /// An aggregate takes the class of the first failure it collected.
    pub fn kind(&self) -> FailureKind {
        match self {
            PipelineError::MalformedKey { .. } => FailureKind::MalformedKey,
            PipelineError::Decode { .. } => FailureKind::DecodeFailure,
            PipelineError::Derivative { .. } => FailureKind::DerivativeFailure,
            PipelineError::Storage { .. } => FailureKind::StorageFailure,
            PipelineError::MetadataRecord { .. } => FailureKind::MetadataRecordFailure,
            PipelineError::Aggregate { failures, .. } => failures
                .first()
                .map(PipelineError::kind)
                .unwrap_or(FailureKind::DerivativeFailure),
        }
    }
}

/// Convenience type alias for Darkroom results.
pub type Result<T> = std::result::Result<T, DarkroomError>;

/// Convenience type alias for pipeline-specific results.
pub type PipelineResult<T> = std::result::Result<T, PipelineError>;
