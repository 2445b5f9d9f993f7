//! SORT (Simple Online and Realtime Tracking) with line-crossing counting.
//!
//! The [`tracker`] module contains the Kalman/IoU tracker itself, while
//! [`integration`] wires an external detector, a detection filter and a
//! [`LineCounter`] around it.
//!
//! ```
//! use sort_counter::{Detection, SortTracker, TrackerConfig};
//!
//! let mut tracker = SortTracker::new(TrackerConfig::default());
//! for _ in 0..3 {
//!     let tracks = tracker
//!         .update(&[Detection::new(0.0, 0.0, 10.0, 10.0, 0.9)])
//!         .unwrap();
//!     if let Some(track) = tracks.first() {
//!         assert_eq!(track.track_id, 1);
//!     }
//! }
//! ```

pub mod config;
pub mod error;
pub mod integration;
pub mod tracker;

pub use config::CounterConfig;
pub use error::TrackerError;
pub use integration::{
    CounterPipeline, CountingLine, DetectionBuilder, DetectionFilter, DetectionSource,
    FrameReport, IntoDetections, LineCounter, PipelineError,
};
pub use tracker::{
    Detection, Rect, SortTracker, Track, TrackId, TrackState, TrackedObject, TrackerConfig,
};
