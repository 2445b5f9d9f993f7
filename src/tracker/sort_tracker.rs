//! Main SORT tracker: predict, associate, correct, spawn and prune per frame.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace, warn};

use crate::error::TrackerError;
use crate::tracker::kalman_filter::KalmanFilter;
use crate::tracker::matching::{self, AssignmentResult, Detection};
use crate::tracker::rect::Rect;
use crate::tracker::track::{Track, TrackId};

/// Configuration for the [`SortTracker`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// Frames a track may go unmatched before it is deleted
    pub max_age: u32,
    /// Consecutive matches needed to confirm a track
    pub min_hits: u32,
    /// Minimum IoU for a detection/track pair to count as a match
    pub iou_threshold: f32,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            max_age: 20,
            min_hits: 3,
            iou_threshold: 0.3,
        }
    }
}

impl TrackerConfig {
    pub fn validate(&self) -> Result<(), TrackerError> {
        if self.min_hits == 0 {
            return Err(TrackerError::InvalidConfig(
                "min_hits must be at least 1".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.iou_threshold) {
            return Err(TrackerError::InvalidConfig(format!(
                "iou_threshold {} outside [0, 1]",
                self.iou_threshold
            )));
        }
        Ok(())
    }
}

/// A confirmed track reported for the current frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackedObject {
    pub track_id: TrackId,
    /// Filtered box estimate after this frame's correction
    pub bbox: Rect,
    pub score: f32,
    pub class_id: Option<u32>,
}

impl TrackedObject {
    /// `[x1, y1, x2, y2, id]`, the layout SORT consumers expect.
    pub fn to_tlbr_id(&self) -> [f32; 5] {
        let [x1, y1, x2, y2] = self.bbox.to_tlbr();
        [x1, y1, x2, y2, self.track_id as f32]
    }
}

/// Live tracks keyed by id, plus their creation order.
#[derive(Debug, Clone)]
struct TrackSet {
    tracks: HashMap<TrackId, Track>,
    order: Vec<TrackId>,
    next_id: TrackId,
}

impl TrackSet {
    fn new() -> Self {
        Self {
            tracks: HashMap::new(),
            order: Vec::new(),
            next_id: 1,
        }
    }

    fn spawn(&mut self, detection: &Detection, kalman_filter: &KalmanFilter) -> TrackId {
        let id = self.next_id;
        self.next_id += 1;
        self.tracks.insert(id, Track::new(id, detection, kalman_filter));
        self.order.push(id);
        id
    }

    fn remove(&mut self, id: TrackId) -> Option<Track> {
        let track = self.tracks.remove(&id)?;
        self.order.retain(|&other| other != id);
        Some(track)
    }

    fn iter(&self) -> impl Iterator<Item = &Track> {
        self.order.iter().filter_map(|id| self.tracks.get(id))
    }
}

/// SORT multi-object tracker.
///
/// Each call to [`SortTracker::update`] processes one frame. A frame either
/// completes or leaves the tracker exactly as it was.
#[derive(Debug, Clone)]
pub struct SortTracker {
    active: TrackSet,
    deleted: Vec<Track>,
    frame_count: u64,
    config: TrackerConfig,
    kalman_filter: KalmanFilter,
}

impl Default for SortTracker {
    fn default() -> Self {
        Self::new(TrackerConfig::default())
    }
}

impl SortTracker {
    /// Create a tracker without checking `config`; see [`SortTracker::try_new`].
    pub fn new(config: TrackerConfig) -> Self {
        Self {
            active: TrackSet::new(),
            deleted: Vec::new(),
            frame_count: 0,
            config,
            kalman_filter: KalmanFilter::default(),
        }
    }

    pub fn try_new(config: TrackerConfig) -> Result<Self, TrackerError> {
        config.validate()?;
        Ok(Self::new(config))
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    /// Number of frames processed successfully.
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// All live tracks, tentative ones included, in creation order.
    pub fn tracks(&self) -> impl Iterator<Item = &Track> {
        self.active.iter()
    }

    pub fn track(&self, id: TrackId) -> Option<&Track> {
        self.active.tracks.get(&id)
    }

    /// Tracks deleted by the last successful update, in the `Deleted` state.
    pub fn deleted_tracks(&self) -> &[Track] {
        &self.deleted
    }

    /// Drop every track and restart ids at 1.
    pub fn reset(&mut self) {
        self.active = TrackSet::new();
        self.deleted.clear();
        self.frame_count = 0;
    }

    /// Whether `track` has gone unmatched for too long.
    ///
    /// Tentative tracks leave after `max_age` misses, confirmed ones after
    /// more than `max_age`.
    fn is_expired(&self, track: &Track) -> bool {
        let max_age = self.config.max_age;
        if track.is_confirmed() {
            track.time_since_update > max_age
        } else {
            track.time_since_update >= max_age.max(1)
        }
    }

    /// Process one frame of detections and return the reportable tracks.
    ///
    /// A track is reported when it is confirmed and was matched in this
    /// frame. Malformed detections reject the whole frame.
    pub fn update(&mut self, detections: &[Detection]) -> Result<Vec<TrackedObject>, TrackerError> {
        for (index, detection) in detections.iter().enumerate() {
            detection.validate(index)?;
        }

        let mut working = self.active.clone();
        let frame = self.frame_count + 1;
        let (output, deleted) = self.step(&mut working, detections, frame)?;

        self.active = working;
        self.deleted = deleted;
        self.frame_count = frame;
        Ok(output)
    }

    fn step(
        &self,
        set: &mut TrackSet,
        detections: &[Detection],
        frame: u64,
    ) -> Result<(Vec<TrackedObject>, Vec<Track>), TrackerError> {
        debug!(
            frame,
            detections = detections.len(),
            tracks = set.order.len(),
            "updating tracker"
        );

        // Step 1: Predict, dropping tracks whose state diverged
        let mut predicted_ids = Vec::with_capacity(set.order.len());
        let mut predicted_rects = Vec::with_capacity(set.order.len());
        let mut diverged = Vec::new();
        for &id in &set.order {
            let Some(track) = set.tracks.get_mut(&id) else {
                continue;
            };
            let rect = track.predict(&self.kalman_filter);
            if rect.is_finite() {
                predicted_ids.push(id);
                predicted_rects.push(rect);
            } else {
                diverged.push(id);
            }
        }
        for id in diverged {
            warn!(frame, track_id = id, "dropping track with non-finite prediction");
            set.remove(id);
        }

        // Step 2: Associate detections with predicted boxes
        let det_rects: Vec<Rect> = detections.iter().map(|d| d.bbox).collect();
        let AssignmentResult {
            matches,
            unmatched_detections,
            unmatched_tracks,
        } = matching::associate(&det_rects, &predicted_rects, self.config.iou_threshold)?;
        trace!(
            frame,
            matched = matches.len(),
            unmatched_detections = unmatched_detections.len(),
            unmatched_tracks = unmatched_tracks.len(),
            "association done"
        );

        // Step 3: Correct matched tracks
        for (det_idx, track_idx) in matches {
            let id = predicted_ids[track_idx];
            if let Some(track) = set.tracks.get_mut(&id) {
                track.correct(&detections[det_idx], &self.kalman_filter)?;
            }
        }

        // Step 4: Init new tracks
        for det_idx in unmatched_detections {
            let id = set.spawn(&detections[det_idx], &self.kalman_filter);
            trace!(frame, track_id = id, "new tentative track");
        }

        // Step 5: Confirm, report and prune
        let mut output = Vec::new();
        let mut expired = Vec::new();
        for &id in &set.order {
            let Some(track) = set.tracks.get_mut(&id) else {
                continue;
            };
            if track.try_confirm(self.config.min_hits) {
                info!(frame, track_id = id, hits = track.hits, "track confirmed");
            }
            if track.is_confirmed() && track.time_since_update == 0 {
                output.push(TrackedObject {
                    track_id: id,
                    bbox: track.rect(),
                    score: track.score,
                    class_id: track.class_id,
                });
            }
            if self.is_expired(track) {
                expired.push(id);
            }
        }
        let mut deleted = Vec::with_capacity(expired.len());
        for id in expired {
            if let Some(mut track) = set.remove(id) {
                debug!(
                    frame,
                    track_id = id,
                    age = track.age,
                    confirmed = track.is_confirmed(),
                    "track deleted"
                );
                track.mark_deleted();
                deleted.push(track);
            }
        }

        Ok((output, deleted))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracker::TrackState;

    fn det(x1: f32, y1: f32, x2: f32, y2: f32) -> Detection {
        Detection::new(x1, y1, x2, y2, 0.9)
    }

    #[test]
    fn test_config_validate() {
        assert!(TrackerConfig::default().validate().is_ok());

        let config = TrackerConfig {
            min_hits: 0,
            ..TrackerConfig::default()
        };
        assert!(matches!(
            SortTracker::try_new(config),
            Err(TrackerError::InvalidConfig(_))
        ));

        let config = TrackerConfig {
            iou_threshold: 1.5,
            ..TrackerConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_first_detection_creates_tentative_track() {
        let mut tracker = SortTracker::default();
        let output = tracker.update(&[det(0.0, 0.0, 10.0, 10.0)]).unwrap();

        assert!(output.is_empty());
        let tracks: Vec<&Track> = tracker.tracks().collect();
        assert_eq!(tracks.len(), 1);
        assert_eq!(tracks[0].track_id, 1);
        assert_eq!(tracks[0].state, TrackState::Tentative);
    }

    #[test]
    fn test_confirmed_after_min_hits() {
        let mut tracker = SortTracker::default();
        let box_ = det(0.0, 0.0, 10.0, 10.0);

        assert!(tracker.update(std::slice::from_ref(&box_)).unwrap().is_empty());
        assert!(tracker.update(std::slice::from_ref(&box_)).unwrap().is_empty());
        let output = tracker.update(std::slice::from_ref(&box_)).unwrap();

        assert_eq!(output.len(), 1);
        assert_eq!(output[0].track_id, 1);
        let [x1, y1, x2, y2] = output[0].bbox.to_tlbr();
        assert!(x1.abs() < 0.5 && y1.abs() < 0.5);
        assert!((x2 - 10.0).abs() < 0.5 && (y2 - 10.0).abs() < 0.5);
        assert_eq!(output[0].to_tlbr_id()[4], 1.0);
    }

    #[test]
    fn test_empty_frames_are_not_errors() {
        let mut tracker = SortTracker::default();
        assert!(tracker.update(&[]).unwrap().is_empty());
        assert!(tracker.update(&[]).unwrap().is_empty());
        assert_eq!(tracker.frame_count(), 2);
    }

    #[test]
    fn test_malformed_detection_leaves_state_untouched() {
        let mut tracker = SortTracker::default();
        tracker.update(&[det(0.0, 0.0, 10.0, 10.0)]).unwrap();

        let err = tracker
            .update(&[det(0.0, 0.0, 10.0, 10.0), det(5.0, 5.0, 1.0, 1.0)])
            .unwrap_err();
        assert!(matches!(err, TrackerError::InvalidDetection { index: 1, .. }));

        assert_eq!(tracker.frame_count(), 1);
        let track = tracker.track(1).unwrap();
        assert_eq!(track.age, 0);
        assert_eq!(track.time_since_update, 0);
        assert!(tracker.track(2).is_none());
    }

    #[test]
    fn test_tentative_track_is_deleted_at_max_age() {
        let config = TrackerConfig {
            max_age: 2,
            ..TrackerConfig::default()
        };
        let mut tracker = SortTracker::new(config);
        // Frame 1
        tracker.update(&[det(0.0, 0.0, 10.0, 10.0)]).unwrap();

        // Frame 2
        tracker.update(&[]).unwrap();
        assert_eq!(tracker.track(1).map(|t| t.time_since_update), Some(1));
        assert!(tracker.deleted_tracks().is_empty());

        // Frame 3 = 1 + max_age
        tracker.update(&[]).unwrap();
        assert!(tracker.track(1).is_none());
        assert_eq!(tracker.tracks().count(), 0);

        let deleted = tracker.deleted_tracks();
        assert_eq!(deleted.len(), 1);
        assert_eq!(deleted[0].track_id, 1);
        assert_eq!(deleted[0].state, TrackState::Deleted);

        tracker.update(&[]).unwrap();
        assert!(tracker.deleted_tracks().is_empty());
    }

    #[test]
    fn test_confirmed_track_outlives_max_age_misses() {
        let config = TrackerConfig {
            max_age: 2,
            min_hits: 1,
            ..TrackerConfig::default()
        };
        let mut tracker = SortTracker::new(config);
        tracker.update(&[det(0.0, 0.0, 10.0, 10.0)]).unwrap();
        assert!(tracker.track(1).unwrap().is_confirmed());

        tracker.update(&[]).unwrap();
        tracker.update(&[]).unwrap();
        assert_eq!(tracker.track(1).map(|t| t.time_since_update), Some(2));

        tracker.update(&[]).unwrap();
        assert!(tracker.track(1).is_none());
        assert_eq!(tracker.deleted_tracks()[0].state, TrackState::Deleted);
    }

    #[test]
    fn test_diverged_track_is_dropped() {
        let mut tracker = SortTracker::default();
        let kf = KalmanFilter::default();
        // Negative aspect ratio has no real box.
        let track = Track::from_state(1, [50.0, 50.0, 100.0, -1.0, 0.0, 0.0, 0.0], &kf);
        tracker.active.tracks.insert(1, track);
        tracker.active.order.push(1);
        tracker.active.next_id = 2;

        let output = tracker.update(&[det(40.0, 40.0, 60.0, 60.0)]).unwrap();
        assert!(output.is_empty());
        assert!(tracker.track(1).is_none());
        let ids: Vec<TrackId> = tracker.tracks().map(|t| t.track_id).collect();
        assert_eq!(ids, vec![2]);
        assert_eq!(tracker.frame_count(), 1);
    }

    #[test]
    fn test_ids_are_never_reused() {
        let config = TrackerConfig {
            max_age: 0,
            ..TrackerConfig::default()
        };
        let mut tracker = SortTracker::new(config);
        tracker.update(&[det(0.0, 0.0, 10.0, 10.0)]).unwrap();
        tracker.update(&[]).unwrap();
        assert!(tracker.track(1).is_none());

        tracker.update(&[det(0.0, 0.0, 10.0, 10.0)]).unwrap();
        let ids: Vec<TrackId> = tracker.tracks().map(|t| t.track_id).collect();
        assert_eq!(ids, vec![2]);
    }

    #[test]
    fn test_reset() {
        let mut tracker = SortTracker::default();
        tracker.update(&[det(0.0, 0.0, 10.0, 10.0)]).unwrap();
        tracker.reset();
        assert_eq!(tracker.frame_count(), 0);
        tracker.update(&[det(50.0, 50.0, 60.0, 60.0)]).unwrap();
        assert!(tracker.track(1).is_some());
    }
}
