//! Single object track driven by a Kalman filter.

use ndarray::{Array1, Array2};

use crate::error::TrackerError;
use crate::tracker::kalman_filter::KalmanFilter;
use crate::tracker::matching::Detection;
use crate::tracker::rect::Rect;
use crate::tracker::track_state::TrackState;

/// Identifier handed out by a [`SortTracker`](crate::SortTracker), starting at 1.
pub type TrackId = u64;

/// Single object track.
#[derive(Debug, Clone)]
pub struct Track {
    /// Unique track identifier
    pub track_id: TrackId,
    /// Current lifecycle state
    pub state: TrackState,
    /// Confidence of the last matched detection
    pub score: f32,
    /// Class of the last matched detection, if the detector reports one
    pub class_id: Option<u32>,
    /// Consecutive frames matched
    pub hit_streak: u32,
    /// Total frames matched, including creation
    pub hits: u32,
    /// Frames since the last successful match
    pub time_since_update: u32,
    /// Frames since creation
    pub age: u32,
    /// Kalman filter state mean (7-dim)
    mean: Array1<f64>,
    /// Kalman filter state covariance (7x7)
    covariance: Array2<f64>,
}

impl Track {
    /// Start a new tentative track from an unmatched detection.
    ///
    /// Creation counts as the first hit.
    pub fn new(track_id: TrackId, detection: &Detection, kalman_filter: &KalmanFilter) -> Self {
        let (mean, covariance) = kalman_filter.initiate(detection.bbox.to_xysr());
        Self {
            track_id,
            state: TrackState::Tentative,
            score: detection.score,
            class_id: detection.class_id,
            hit_streak: 1,
            hits: 1,
            time_since_update: 0,
            age: 0,
            mean,
            covariance,
        }
    }

    /// Build a tentative track around an arbitrary state vector.
    #[cfg(test)]
    pub(crate) fn from_state(
        track_id: TrackId,
        state: [f64; 7],
        kalman_filter: &KalmanFilter,
    ) -> Self {
        let (_, covariance) = kalman_filter.initiate([state[0], state[1], state[2], state[3]]);
        Self {
            track_id,
            state: TrackState::Tentative,
            score: 1.0,
            class_id: None,
            hit_streak: 1,
            hits: 1,
            time_since_update: 0,
            age: 0,
            mean: Array1::from_vec(state.to_vec()),
            covariance,
        }
    }

    /// Current bounding box estimate.
    pub fn rect(&self) -> Rect {
        Rect::from_xysr(self.mean[0], self.mean[1], self.mean[2], self.mean[3])
    }

    /// Velocity of the box center in pixels per frame.
    pub fn velocity(&self) -> (f64, f64) {
        (self.mean[4], self.mean[5])
    }

    pub fn is_confirmed(&self) -> bool {
        self.state == TrackState::Confirmed
    }

    /// Advance the track one frame and return the predicted box.
    pub fn predict(&mut self, kalman_filter: &KalmanFilter) -> Rect {
        let (mean, covariance) = kalman_filter.predict(&self.mean, &self.covariance);
        self.mean = mean;
        self.covariance = covariance;

        self.age += 1;
        if self.time_since_update > 0 {
            self.hit_streak = 0;
        }
        self.time_since_update += 1;

        self.rect()
    }

    /// Correct the track with its matched detection.
    pub fn correct(
        &mut self,
        detection: &Detection,
        kalman_filter: &KalmanFilter,
    ) -> Result<(), TrackerError> {
        let (mean, covariance) =
            kalman_filter.update(&self.mean, &self.covariance, detection.bbox.to_xysr())?;
        self.mean = mean;
        self.covariance = covariance;

        self.time_since_update = 0;
        self.hit_streak += 1;
        self.hits += 1;
        self.score = detection.score;
        if detection.class_id.is_some() {
            self.class_id = detection.class_id;
        }
        Ok(())
    }

    /// Promote a tentative track once its hit streak reaches `min_hits`.
    ///
    /// Returns true if the track was confirmed by this call.
    pub fn try_confirm(&mut self, min_hits: u32) -> bool {
        if self.state == TrackState::Tentative && self.hit_streak >= min_hits {
            self.state = TrackState::Confirmed;
            return true;
        }
        false
    }

    pub fn mark_deleted(&mut self) {
        self.state = TrackState::Deleted;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn track_at(x1: f32, y1: f32, x2: f32, y2: f32) -> (Track, KalmanFilter) {
        let kf = KalmanFilter::new();
        let track = Track::new(7, &Detection::new(x1, y1, x2, y2, 0.8), &kf);
        (track, kf)
    }

    #[test]
    fn test_new_track_is_tentative_with_one_hit() {
        let (track, _) = track_at(0.0, 0.0, 10.0, 20.0);
        assert_eq!(track.track_id, 7);
        assert_eq!(track.state, TrackState::Tentative);
        assert_eq!(track.hit_streak, 1);
        assert_eq!(track.time_since_update, 0);
        assert_eq!(track.age, 0);

        let rect = track.rect();
        assert!((rect.x - 0.0).abs() < 1e-3);
        assert!((rect.width - 10.0).abs() < 1e-3);
        assert!((rect.height - 20.0).abs() < 1e-3);
    }

    #[test]
    fn test_predict_ages_track() {
        let (mut track, kf) = track_at(0.0, 0.0, 10.0, 10.0);

        track.predict(&kf);
        assert_eq!(track.age, 1);
        assert_eq!(track.time_since_update, 1);
        // First miss keeps the streak, the next prediction resets it.
        assert_eq!(track.hit_streak, 1);

        track.predict(&kf);
        assert_eq!(track.age, 2);
        assert_eq!(track.time_since_update, 2);
        assert_eq!(track.hit_streak, 0);
    }

    #[test]
    fn test_correct_resets_time_since_update() {
        let (mut track, kf) = track_at(0.0, 0.0, 10.0, 10.0);
        track.predict(&kf);
        track
            .correct(&Detection::new(1.0, 0.0, 11.0, 10.0, 0.6), &kf)
            .unwrap();

        assert_eq!(track.time_since_update, 0);
        assert_eq!(track.hit_streak, 2);
        assert_eq!(track.hits, 2);
        assert_eq!(track.score, 0.6);
        assert!(track.velocity().0 > 0.0);
    }

    #[test]
    fn test_try_confirm() {
        let (mut track, kf) = track_at(0.0, 0.0, 10.0, 10.0);
        assert!(!track.try_confirm(2));

        track.predict(&kf);
        track
            .correct(&Detection::new(0.0, 0.0, 10.0, 10.0, 0.9), &kf)
            .unwrap();
        assert!(track.try_confirm(2));
        assert!(track.is_confirmed());
        assert!(!track.try_confirm(2));
    }
}
