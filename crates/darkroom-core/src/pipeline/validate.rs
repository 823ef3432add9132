//! Cheap checks on source bytes before a full decode.

use crate::config::LimitsConfig;
use crate::error::PipelineError;

/// Validates source objects before processing.
#[derive(Debug, Clone)]
pub struct Validator {
    limits: LimitsConfig,
}

impl Validator {
    /// Create a new validator with the given limits.
    pub fn new(limits: LimitsConfig) -> Self {
        Self { limits }
    }

    /// Check size limit and magic bytes.
    pub fn validate(&self, bytes: &[u8], key: &str) -> Result<(), PipelineError> {
        let max_bytes = self.limits.max_file_size_mb * 1024 * 1024;
        if bytes.len() as u64 > max_bytes {
            return Err(PipelineError::Decode {
                key: key.to_string(),
                message: format!(
                    "File too large: {}MB > {}MB",
                    bytes.len() as u64 / (1024 * 1024),
                    self.limits.max_file_size_mb
                ),
            });
        }
        if bytes.len() < 4 {
            return Err(PipelineError::Decode {
                key: key.to_string(),
                message: "File too small to be a valid image".to_string(),
            });
        }
        if !Self::is_valid_image_header(bytes) {
            return Err(PipelineError::Decode {
                key: key.to_string(),
                message: "Unrecognized image format (invalid magic bytes)".to_string(),
            });
        }
        Ok(())
    }

    /// Check if the leading bytes match a supported image format.
    fn is_valid_image_header(header: &[u8]) -> bool {
        match header {
            // JPEG
            [0xFF, 0xD8, 0xFF, ..] => true,
            // PNG
            [0x89, b'P', b'N', b'G', ..] => true,
            // GIF87a / GIF89a
            [b'G', b'I', b'F', b'8', ..] => true,
            // WebP: RIFF....WEBP
            [b'R', b'I', b'F', b'F', _, _, _, _, b'W', b'E', b'B', b'P', ..] => true,
            // TIFF, little- and big-endian
            [b'I', b'I', 0x2A, 0x00, ..] | [b'M', b'M', 0x00, 0x2A, ..] => true,
            _ => false,
        }
    }
}
