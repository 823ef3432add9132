//! Configuration validation with range checks.

use crate::error::ConfigError;

use super::Config;

impl Config {
    /// Validate configuration values are within acceptable ranges.
    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if self.pipeline.workers == 0 {
            return Err(ConfigError::ValidationError(
                "pipeline.workers must be > 0".into(),
            ));
        }
        if self.pipeline.queue_capacity == 0 {
            return Err(ConfigError::ValidationError(
                "pipeline.queue_capacity must be > 0".into(),
            ));
        }
        if self.pipeline.max_collected_errors == 0 {
            return Err(ConfigError::ValidationError(
                "pipeline.max_collected_errors must be > 0".into(),
            ));
        }
        if self.derivatives.tile_widths.is_empty() {
            return Err(ConfigError::ValidationError(
                "derivatives.tile_widths must not be empty".into(),
            ));
        }
        let all_widths = self
            .derivatives
            .tile_widths
            .iter()
            .chain(self.derivatives.thumbnail_widths.iter());
        for width in all_widths {
            if *width == 0 {
                return Err(ConfigError::ValidationError(
                    "derivatives widths must be > 0".into(),
                ));
            }
        }
        if !(1..=100).contains(&self.derivatives.jpeg_quality) {
            return Err(ConfigError::ValidationError(
                "derivatives.jpeg_quality must be between 1 and 100".into(),
            ));
        }
        if self.derivatives.blur_long_side == 0 {
            return Err(ConfigError::ValidationError(
                "derivatives.blur_long_side must be > 0".into(),
            ));
        }
        if self.limits.max_file_size_mb == 0 {
            return Err(ConfigError::ValidationError(
                "limits.max_file_size_mb must be > 0".into(),
            ));
        }
        if self.limits.max_image_dimension == 0 {
            return Err(ConfigError::ValidationError(
                "limits.max_image_dimension must be > 0".into(),
            ));
        }
        if self.limits.decode_timeout_ms == 0 {
            return Err(ConfigError::ValidationError(
                "limits.decode_timeout_ms must be > 0".into(),
            ));
        }
        if self.storage.staging_prefix.trim_matches('/').is_empty() {
            return Err(ConfigError::ValidationError(
                "storage.staging_prefix must not be empty".into(),
            ));
        }
        Ok(())
    }
}
