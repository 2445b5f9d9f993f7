//! Pre-tracker filtering of raw detector output.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::error::TrackerError;
use crate::tracker::Detection;

/// COCO category names in detector class-id order.
pub const COCO_CLASSES: [&str; 80] = [
    "person", "bicycle", "car", "motorbike", "aeroplane", "bus", "train", "truck", "boat",
    "traffic light", "fire hydrant", "stop sign", "parking meter", "bench", "bird", "cat", "dog",
    "horse", "sheep", "cow", "elephant", "bear", "zebra", "giraffe", "backpack", "umbrella",
    "handbag", "tie", "suitcase", "frisbee", "skis", "snowboard", "sports ball", "kite",
    "baseball bat", "baseball glove", "skateboard", "surfboard", "tennis racket", "bottle",
    "wine glass", "cup", "fork", "knife", "spoon", "bowl", "banana", "apple", "sandwich",
    "orange", "broccoli", "carrot", "hot dog", "pizza", "donut", "cake", "chair", "sofa",
    "pottedplant", "bed", "diningtable", "toilet", "tvmonitor", "laptop", "mouse", "remote",
    "keyboard", "cell phone", "microwave", "oven", "toaster", "sink", "refrigerator", "book",
    "clock", "vase", "scissors", "teddy bear", "hair drier", "toothbrush",
];

/// Class id of a COCO category name.
pub fn coco_class_id(name: &str) -> Option<u32> {
    COCO_CLASSES
        .iter()
        .position(|&class| class == name)
        .map(|i| i as u32)
}

/// Name of a COCO class id.
pub fn coco_class_name(class_id: u32) -> Option<&'static str> {
    COCO_CLASSES.get(class_id as usize).copied()
}

/// Keeps detections above a confidence threshold and, optionally, of a
/// given set of classes. Malformed boxes are always dropped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionFilter {
    /// Detections must score strictly above this
    pub min_confidence: f32,
    /// Accepted class ids; `None` accepts everything, including unclassified
    /// detections
    pub classes: Option<BTreeSet<u32>>,
}

impl Default for DetectionFilter {
    fn default() -> Self {
        Self::vehicles()
    }
}

impl DetectionFilter {
    /// Accept every well-formed detection with a positive score.
    pub fn accept_all() -> Self {
        Self {
            min_confidence: 0.0,
            classes: None,
        }
    }

    /// Cars, motorbikes and trucks scoring above 0.3.
    pub fn vehicles() -> Self {
        let classes = ["car", "motorbike", "truck"]
            .into_iter()
            .filter_map(coco_class_id)
            .collect();
        Self {
            min_confidence: 0.3,
            classes: Some(classes),
        }
    }

    /// Build a filter from COCO class names.
    pub fn for_class_names<'a>(
        names: impl IntoIterator<Item = &'a str>,
        min_confidence: f32,
    ) -> Result<Self, TrackerError> {
        let classes = names
            .into_iter()
            .map(|name| {
                coco_class_id(name).ok_or_else(|| {
                    TrackerError::InvalidConfig(format!("unknown COCO class {name:?}"))
                })
            })
            .collect::<Result<_, _>>()?;
        Ok(Self {
            min_confidence,
            classes: Some(classes),
        })
    }

    pub fn validate(&self) -> Result<(), TrackerError> {
        if !(0.0..=1.0).contains(&self.min_confidence) {
            return Err(TrackerError::InvalidConfig(format!(
                "min_confidence {} outside [0, 1]",
                self.min_confidence
            )));
        }
        Ok(())
    }

    pub fn accepts(&self, detection: &Detection) -> bool {
        if detection.validate(0).is_err() {
            return false;
        }
        if detection.score <= self.min_confidence {
            return false;
        }
        match (&self.classes, detection.class_id) {
            (None, _) => true,
            (Some(classes), Some(class_id)) => classes.contains(&class_id),
            (Some(_), None) => false,
        }
    }

    pub fn apply(&self, detections: Vec<Detection>) -> Vec<Detection> {
        let before = detections.len();
        let kept: Vec<Detection> = detections.into_iter().filter(|d| self.accepts(d)).collect();
        trace!(before, kept = kept.len(), "filtered detections");
        kept
    }
}
