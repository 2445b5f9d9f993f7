//! Counting tracked objects as their centroid reaches a line.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::TrackerError;
use crate::tracker::{Rect, TrackId, TrackedObject};

/// A line segment with a tolerance band around it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CountingLine {
    /// Segment start `(x, y)`
    pub start: [f32; 2],
    /// Segment end `(x, y)`
    pub end: [f32; 2],
    /// Maximum perpendicular distance (exclusive) from the segment
    pub tolerance: f32,
}

impl Default for CountingLine {
    fn default() -> Self {
        Self {
            start: [400.0, 297.0],
            end: [673.0, 297.0],
            tolerance: 15.0,
        }
    }
}

impl CountingLine {
    pub fn new(start: [f32; 2], end: [f32; 2], tolerance: f32) -> Self {
        Self {
            start,
            end,
            tolerance,
        }
    }

    /// Horizontal line at `y` spanning `x_start..x_end`.
    pub fn horizontal(y: f32, x_start: f32, x_end: f32, tolerance: f32) -> Self {
        Self::new([x_start, y], [x_end, y], tolerance)
    }

    pub fn validate(&self) -> Result<(), TrackerError> {
        let coords = [self.start[0], self.start[1], self.end[0], self.end[1]];
        if coords.iter().any(|c| !c.is_finite()) {
            return Err(TrackerError::InvalidConfig(format!(
                "counting line has non-finite coordinates {coords:?}"
            )));
        }
        if self.start == self.end {
            return Err(TrackerError::InvalidConfig(
                "counting line has zero length".to_string(),
            ));
        }
        if self.tolerance.is_nan() || self.tolerance <= 0.0 {
            return Err(TrackerError::InvalidConfig(format!(
                "counting line tolerance {} must be positive",
                self.tolerance
            )));
        }
        Ok(())
    }

    /// Whether `point` projects strictly inside the segment and lies within
    /// the tolerance band.
    pub fn contains(&self, point: (f32, f32)) -> bool {
        let (dx, dy) = (self.end[0] - self.start[0], self.end[1] - self.start[1]);
        let (px, py) = (point.0 - self.start[0], point.1 - self.start[1]);
        let length_sq = dx * dx + dy * dy;
        if length_sq == 0.0 {
            return false;
        }

        let t = (px * dx + py * dy) / length_sq;
        if t <= 0.0 || t >= 1.0 {
            return false;
        }
        let distance = (dx * py - dy * px).abs() / length_sq.sqrt();
        distance < self.tolerance
    }
}

/// Centroid of `rect` on the pixel grid: corners truncated to whole pixels,
/// then half the integer width and height added with floor division.
pub fn pixel_centroid(rect: &Rect) -> (f32, f32) {
    let [x1, y1, x2, y2] = rect.to_tlbr().map(f32::trunc);
    (x1 + ((x2 - x1) / 2.0).floor(), y1 + ((y2 - y1) / 2.0).floor())
}

/// Counts each track id once, the first time its centroid is on the line.
#[derive(Debug, Clone, Default)]
pub struct LineCounter {
    line: CountingLine,
    counted: HashSet<TrackId>,
}

impl LineCounter {
    pub fn new(line: CountingLine) -> Self {
        Self {
            line,
            counted: HashSet::new(),
        }
    }

    pub fn line(&self) -> &CountingLine {
        &self.line
    }

    /// Total distinct ids counted so far.
    pub fn count(&self) -> usize {
        self.counted.len()
    }

    pub fn has_counted(&self, id: TrackId) -> bool {
        self.counted.contains(&id)
    }

    /// Feed one frame of tracker output. Returns the ids counted in this frame.
    pub fn observe(&mut self, tracks: &[TrackedObject]) -> Vec<TrackId> {
        let mut newly_counted = Vec::new();
        for track in tracks {
            if !self.line.contains(pixel_centroid(&track.bbox)) {
                continue;
            }
            if self.counted.insert(track.track_id) {
                info!(
                    track_id = track.track_id,
                    total = self.counted.len(),
                    "object crossed counting line"
                );
                newly_counted.push(track.track_id);
            }
        }
        newly_counted
    }

    pub fn reset(&mut self) {
        self.counted.clear();
    }
}
