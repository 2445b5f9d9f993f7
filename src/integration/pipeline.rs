//! CounterPipeline for combining detection, tracking and line counting.

use thiserror::Error;
use tracing::debug;

use crate::config::CounterConfig;
use crate::error::TrackerError;
use crate::tracker::{Detection, SortTracker, TrackId, TrackedObject};

use super::{DetectionFilter, DetectionSource, LineCounter};

/// Errors from a single [`CounterPipeline`] frame.
#[derive(Debug, Error)]
pub enum PipelineError<E> {
    #[error("detector failed: {0}")]
    Detector(E),

    #[error(transparent)]
    Tracker(#[from] TrackerError),
}

/// Result of processing one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameReport {
    /// 1-based index of the processed frame
    pub frame: u64,
    /// Tracks reported by the tracker this frame
    pub tracks: Vec<TrackedObject>,
    /// Ids that reached the counting line for the first time this frame
    pub newly_counted: Vec<TrackId>,
    /// Distinct ids counted since the pipeline started
    pub total_count: usize,
}

/// Runs an object detector, filters its output, tracks the survivors and
/// counts tracks that reach a line.
pub struct CounterPipeline<D: DetectionSource> {
    detector: D,
    filter: DetectionFilter,
    tracker: SortTracker,
    counter: LineCounter,
}

impl<D: DetectionSource> CounterPipeline<D> {
    /// Create a pipeline, validating `config` first.
    pub fn new(detector: D, config: CounterConfig) -> Result<Self, TrackerError> {
        config.validate()?;
        Ok(Self {
            detector,
            filter: config.filter,
            tracker: SortTracker::new(config.tracker),
            counter: LineCounter::new(config.line),
        })
    }

    /// Create a pipeline with the default vehicle-counting configuration.
    pub fn with_default_config(detector: D) -> Self {
        let config = CounterConfig::default();
        Self {
            detector,
            filter: config.filter,
            tracker: SortTracker::new(config.tracker),
            counter: LineCounter::new(config.line),
        }
    }

    /// Detect, filter, track and count one frame.
    ///
    /// # Arguments
    /// * `input` - Raw image bytes
    /// * `width` - Image width in pixels
    /// * `height` - Image height in pixels
    pub fn process_frame(
        &mut self,
        input: &[u8],
        width: u32,
        height: u32,
    ) -> Result<FrameReport, PipelineError<D::Error>> {
        let detections = self
            .detector
            .detect(input, width, height)
            .map_err(PipelineError::Detector)?;
        Ok(self.process_detections(detections)?)
    }

    /// Filter, track and count detections produced elsewhere.
    pub fn process_detections(
        &mut self,
        detections: Vec<Detection>,
    ) -> Result<FrameReport, TrackerError> {
        let detections = self.filter.apply(detections);
        let tracks = self.tracker.update(&detections)?;
        let newly_counted = self.counter.observe(&tracks);

        let report = FrameReport {
            frame: self.tracker.frame_count(),
            tracks,
            newly_counted,
            total_count: self.counter.count(),
        };
        debug!(
            frame = report.frame,
            tracks = report.tracks.len(),
            total_count = report.total_count,
            "frame processed"
        );
        Ok(report)
    }

    /// Distinct ids counted so far.
    pub fn total_count(&self) -> usize {
        self.counter.count()
    }

    /// Get a reference to the underlying detector.
    pub fn detector(&self) -> &D {
        &self.detector
    }

    /// Get a mutable reference to the underlying detector.
    pub fn detector_mut(&mut self) -> &mut D {
        &mut self.detector
    }

    /// Get a reference to the underlying tracker.
    pub fn tracker(&self) -> &SortTracker {
        &self.tracker
    }

    /// Get a reference to the line counter.
    pub fn counter(&self) -> &LineCounter {
        &self.counter
    }
}
