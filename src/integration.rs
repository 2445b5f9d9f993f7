//! Integration module connecting object detectors, the SORT tracker and the
//! line counter.
//!
//! This module provides the traits and glue to run a full counting loop:
//! detector output is filtered, tracked, and tracks reaching the counting
//! line are counted once per identity.

mod builder;
mod detector;
mod filter;
mod line_counter;
mod pipeline;

pub use builder::DetectionBuilder;
pub use detector::{DetectionSource, IntoDetections};
pub use filter::{COCO_CLASSES, DetectionFilter, coco_class_id, coco_class_name};
pub use line_counter::{CountingLine, LineCounter, pixel_centroid};
pub use pipeline::{CounterPipeline, FrameReport, PipelineError};
