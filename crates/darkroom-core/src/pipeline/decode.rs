//! Full pixel decode of a fetched source object.
//!
//! Formats are detected from content, never from the key's extension.
//! Decoding runs on the blocking pool under the configured timeout, and
//! the dimension limit is handed to the decoder itself so oversized images
//! are refused before their pixel buffer is allocated.

use image::{DynamicImage, GenericImageView, ImageFormat, ImageReader};
use std::io::Cursor;
use std::time::Duration;

use crate::config::LimitsConfig;
use crate::error::PipelineError;

/// Decodes source bytes within the configured limits.
#[derive(Debug, Clone)]
pub struct ImageDecoder {
    limits: LimitsConfig,
}

/// A decoded source image and the format it was stored in.
#[derive(Debug)]
pub struct DecodedImage {
    pub image: DynamicImage,
    pub format: ImageFormat,
}

impl DecodedImage {
    /// Stored (pre-rotation) dimensions.
    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }
}

impl ImageDecoder {
    pub fn new(limits: LimitsConfig) -> Self {
        Self { limits }
    }

    /// Decode a whole object. `key` is only used for error context.
    pub async fn decode(&self, bytes: Vec<u8>, key: &str) -> Result<DecodedImage, PipelineError> {
        let failure = |message: String| PipelineError::Decode {
            key: key.to_string(),
            message,
        };

        let max_dimension = self.limits.max_image_dimension;
        let task = tokio::task::spawn_blocking(move || decode_bytes(bytes, max_dimension));
        let budget = Duration::from_millis(self.limits.decode_timeout_ms);

        let decoded = tokio::time::timeout(budget, task)
            .await
            .map_err(|_| failure(format!("Timed out after {}ms", self.limits.decode_timeout_ms)))?
            .map_err(|e| failure(format!("Decode task failed: {e}")))?
            .map_err(&failure)?;

        let (width, height) = decoded.dimensions();
        tracing::trace!(key, ?decoded.format, width, height, "Decoded source");
        Ok(decoded)
    }
}

fn decode_bytes(bytes: Vec<u8>, max_dimension: u32) -> Result<DecodedImage, String> {
    let mut reader = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| format!("Cannot detect image format: {e}"))?;
    let format = reader
        .format()
        .ok_or_else(|| "Unrecognized image format".to_string())?;

    let mut limits = image::Limits::default();
    limits.max_image_width = Some(max_dimension);
    limits.max_image_height = Some(max_dimension);
    limits.max_alloc = None;
    reader.limits(limits);

    let too_large = || format!("Image too large: exceeds {max_dimension}px on a side");
    let image = reader.decode().map_err(|e| match e {
        image::ImageError::Limits(_) => too_large(),
        other => other.to_string(),
    })?;
    let (width, height) = image.dimensions();
    if width > max_dimension || height > max_dimension {
        return Err(too_large());
    }
    Ok(DecodedImage { image, format })
}
