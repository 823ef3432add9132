//! Sub-configuration structs with their defaults.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Quality used when a configured or requested JPEG quality is out of range.
pub const DEFAULT_JPEG_QUALITY: u8 = 85;

/// Event queue and worker pool settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Max upload events buffered before producers are pushed back
    pub queue_capacity: usize,

    /// Number of long-lived worker tasks draining the queue
    pub workers: usize,

    /// Max fan-out errors retained per event (all failures are still counted)
    pub max_collected_errors: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 256,
            workers: 2,
            max_collected_errors: 8,
        }
    }
}

/// Derivative width ladders and encoding settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DerivativeConfig {
    /// Widths of full-size tiles
    pub tile_widths: Vec<u32>,

    /// Widths of thumbnail tiles
    pub thumbnail_widths: Vec<u32>,

    /// JPEG quality (1-100) for every derivative
    pub jpeg_quality: u8,

    /// Longest side of the blur placeholder in pixels
    pub blur_long_side: u32,
}

impl Default for DerivativeConfig {
    fn default() -> Self {
        Self {
            tile_widths: vec![640, 1280, 1920, 2560],
            thumbnail_widths: vec![200, 400],
            jpeg_quality: DEFAULT_JPEG_QUALITY,
            blur_long_side: 32,
        }
    }
}

/// Resource limits to protect against problematic uploads.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Maximum source object size in megabytes
    pub max_file_size_mb: u64,

    /// Maximum image dimension (width or height)
    pub max_image_dimension: u32,

    /// Decode timeout in milliseconds
    pub decode_timeout_ms: u64,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_file_size_mb: 100,
            max_image_dimension: 20000,
            decode_timeout_ms: 30000,
        }
    }
}

/// Local object storage settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Root directory of the filesystem object store
    pub root: PathBuf,

    /// Bucket name stripped from incoming keys
    pub bucket: String,

    /// Prefix holding uploads that are not yet published
    pub staging_prefix: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("~/.darkroom/objects"),
            bucket: "gallery".to_string(),
            staging_prefix: "staging".to_string(),
        }
    }
}

/// Image record sink settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RecordsConfig {
    /// JSON-lines file receiving completed image records
    pub path: PathBuf,
}

impl Default for RecordsConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("~/.darkroom/records.jsonl"),
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: error, warn, info, debug, trace
    pub level: String,

    /// Log format: "pretty" or "json"
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}
