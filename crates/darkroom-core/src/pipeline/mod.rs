//! Image ingestion pipeline components.
//!
//! This module contains all the stages an upload event goes through:
//! - **validate**: Size limit and magic-byte checks
//! - **metadata**: Best-effort EXIF extraction
//! - **decode**: Full pixel decode with limits and timeout
//! - **transform**: Orientation correction
//! - **derivative**: Tile, thumbnail and blur rendering
//! - **task_group**: Fan-out/fan-in with a bounded error collector
//! - **processor**: The per-event state machine
//! - **worker**: Bounded queue and worker pool

pub mod decode;
pub mod derivative;
pub mod metadata;
pub mod processor;
pub mod task_group;
pub mod transform;
pub mod validate;
pub mod worker;

#[cfg(test)]
pub(crate) mod test_images;

// Re-exports for convenient access
pub use decode::{DecodedImage, ImageDecoder};
pub use derivative::DerivativeGenerator;
pub use metadata::MetadataExtractor;
pub use processor::EventProcessor;
pub use task_group::{GroupError, TaskFailure, TaskGroup};
pub use transform::Rotation;
pub use validate::Validator;
pub use worker::{DrainSummary, EnqueueError, Pipeline, PipelineHandle};
