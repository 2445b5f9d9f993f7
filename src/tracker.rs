mod kalman_filter;
mod matching;
mod rect;
mod sort_tracker;
mod track;
mod track_state;

pub use kalman_filter::KalmanFilter;
pub use matching::{AssignmentResult, Detection, associate, iou_distance, linear_assignment};
pub use rect::{Rect, iou_batch};
pub use sort_tracker::{SortTracker, TrackedObject, TrackerConfig};
pub use track::{Track, TrackId};
pub use track_state::TrackState;
