use serde::{Deserialize, Serialize};

/// Lifecycle state of a track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TrackState {
    /// Newly created track, not yet exposed to consumers
    #[default]
    Tentative,
    /// Matched often enough in a row to be reported
    Confirmed,
    /// Unmatched for longer than `max_age`, about to be dropped
    Deleted,
}
