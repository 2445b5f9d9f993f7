//! Detection-to-track association for multi-object tracking.

use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::error::TrackerError;
use crate::tracker::rect::{Rect, iou_batch};

/// Cost assigned to padding cells when the cost matrix is squared up.
const PADDING_COST: f64 = 1e6;

/// Detection input for the tracker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    /// Bounding box, constructed from TLBR format (x1, y1, x2, y2)
    pub bbox: Rect,
    /// Detection confidence score
    pub score: f32,
    /// Detector class id, e.g. a COCO category
    #[serde(default)]
    pub class_id: Option<u32>,
}

impl Detection {
    pub fn new(x1: f32, y1: f32, x2: f32, y2: f32, score: f32) -> Self {
        Self {
            bbox: Rect::from_tlbr(x1, y1, x2, y2),
            score,
            class_id: None,
        }
    }

    pub fn from_rect(bbox: Rect, score: f32) -> Self {
        Self {
            bbox,
            score,
            class_id: None,
        }
    }

    pub fn with_class(mut self, class_id: u32) -> Self {
        self.class_id = Some(class_id);
        self
    }

    /// Check the box and score. `index` is only used for the error message.
    pub fn validate(&self, index: usize) -> Result<(), TrackerError> {
        self.bbox
            .validate()
            .map_err(|reason| TrackerError::InvalidDetection { index, reason })?;
        if !(0.0..=1.0).contains(&self.score) {
            return Err(TrackerError::InvalidDetection {
                index,
                reason: format!("score {} outside [0, 1]", self.score),
            });
        }
        Ok(())
    }
}

/// Compute the IoU distance matrix (1 - IoU) between detections and tracks.
pub fn iou_distance(det_boxes: &[Rect], track_boxes: &[Rect]) -> Array2<f32> {
    iou_batch(det_boxes, track_boxes).mapv(|iou| 1.0 - iou)
}

/// Outcome of one association round.
///
/// Indices refer to the detection and track slices given to [`associate`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AssignmentResult {
    /// `(detection_index, track_index)` pairs
    pub matches: Vec<(usize, usize)>,
    pub unmatched_detections: Vec<usize>,
    pub unmatched_tracks: Vec<usize>,
}

/// Solve the rectangular assignment problem for `cost_matrix`.
///
/// Returns `(row, col)` pairs minimising the total cost. Every row is paired
/// when there are at least as many columns, and vice versa.
pub fn linear_assignment(cost_matrix: &Array2<f32>) -> Result<Vec<(usize, usize)>, TrackerError> {
    let (num_rows, num_cols) = cost_matrix.dim();
    if num_rows == 0 || num_cols == 0 {
        return Ok(Vec::new());
    }

    let size = num_rows.max(num_cols);
    let mut padded = Array2::<f64>::from_elem((size, size), PADDING_COST);
    for ((i, j), &cost) in cost_matrix.indexed_iter() {
        padded[[i, j]] = cost as f64;
    }

    let (row_to_col, _) =
        lapjv::lapjv(&padded).map_err(|e| TrackerError::Assignment(format!("{e:?}")))?;

    Ok(row_to_col
        .into_iter()
        .enumerate()
        .filter(|&(row, col)| row < num_rows && col < num_cols)
        .collect())
}

/// Match detections to predicted track boxes by maximising total IoU.
///
/// Assigned pairs with an IoU below `iou_threshold` are split back into
/// unmatched detections and tracks.
pub fn associate(
    det_boxes: &[Rect],
    track_boxes: &[Rect],
    iou_threshold: f32,
) -> Result<AssignmentResult, TrackerError> {
    if det_boxes.is_empty() || track_boxes.is_empty() {
        return Ok(AssignmentResult {
            matches: Vec::new(),
            unmatched_detections: (0..det_boxes.len()).collect(),
            unmatched_tracks: (0..track_boxes.len()).collect(),
        });
    }

    let ious = iou_batch(det_boxes, track_boxes);
    let cost = ious.mapv(|iou| 1.0 - iou);
    let assignment = linear_assignment(&cost)?;

    let mut detection_matched = vec![false; det_boxes.len()];
    let mut track_matched = vec![false; track_boxes.len()];
    let mut matches = Vec::with_capacity(assignment.len());

    for (det_idx, track_idx) in assignment {
        if ious[[det_idx, track_idx]] < iou_threshold {
            continue;
        }
        detection_matched[det_idx] = true;
        track_matched[track_idx] = true;
        matches.push((det_idx, track_idx));
    }
    matches.sort_unstable();

    Ok(AssignmentResult {
        matches,
        unmatched_detections: unmatched_indices(&detection_matched),
        unmatched_tracks: unmatched_indices(&track_matched),
    })
}

fn unmatched_indices(matched: &[bool]) -> Vec<usize> {
    matched
        .iter()
        .enumerate()
        .filter_map(|(i, &m)| if m { None } else { Some(i) })
        .collect()
}
