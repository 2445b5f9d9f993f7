use ndarray::Array2;
use serde::{Deserialize, Serialize};

/// Bounding box representation with format conversion utilities.
///
/// Supports three bounding box formats:
/// - TLWH: Top-Left X, Top-Left Y, Width, Height
/// - TLBR: Top-Left X, Top-Left Y, Bottom-Right X, Bottom-Right Y
/// - XYSR: Center X, Center Y, Scale (area), Aspect Ratio (w/h), the SORT
///   measurement space
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    /// Top-left x coordinate
    pub x: f32,
    /// Top-left y coordinate
    pub y: f32,
    /// Width of the bounding box
    pub width: f32,
    /// Height of the bounding box
    pub height: f32,
}

impl Rect {
    /// Create a new Rect from top-left coordinates and dimensions (TLWH format).
    #[inline]
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Create a Rect from TLBR format (top-left x, top-left y, bottom-right x, bottom-right y).
    #[inline]
    pub fn from_tlbr(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self {
            x: x1,
            y: y1,
            width: x2 - x1,
            height: y2 - y1,
        }
    }

    /// Create a Rect from XYSR format (center x, center y, area, aspect ratio).
    ///
    /// A non-positive `scale * aspect_ratio` has no real width; the result is
    /// then non-finite, which callers detect with [`Rect::is_finite`].
    #[inline]
    pub fn from_xysr(cx: f64, cy: f64, scale: f64, aspect_ratio: f64) -> Self {
        let width = (scale * aspect_ratio).sqrt();
        let height = scale / width;
        Self {
            x: (cx - width / 2.0) as f32,
            y: (cy - height / 2.0) as f32,
            width: width as f32,
            height: height as f32,
        }
    }

    /// Convert to TLBR format: (x1, y1, x2, y2).
    #[inline]
    pub fn to_tlbr(&self) -> [f32; 4] {
        [self.x, self.y, self.x + self.width, self.y + self.height]
    }

    /// Convert to TLWH format: (x, y, width, height).
    #[inline]
    pub fn to_tlwh(&self) -> [f32; 4] {
        [self.x, self.y, self.width, self.height]
    }

    /// Convert to XYSR format: (center_x, center_y, area, aspect_ratio).
    #[inline]
    pub fn to_xysr(&self) -> [f64; 4] {
        let (cx, cy) = self.center();
        let width = self.width as f64;
        let height = self.height as f64;
        let aspect_ratio = if height > 0.0 { width / height } else { 0.0 };
        [cx as f64, cy as f64, width * height, aspect_ratio]
    }

    /// Get the center point of the bounding box.
    #[inline]
    pub fn center(&self) -> (f32, f32) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// Get the area of the bounding box.
    #[inline]
    pub fn area(&self) -> f32 {
        self.width * self.height
    }

    /// Whether every coordinate is a finite number.
    #[inline]
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.width.is_finite() && self.height.is_finite()
    }

    /// Check that the box is usable as tracker input.
    ///
    /// Returns a human readable reason when it is not.
    pub fn validate(&self) -> Result<(), String> {
        if !self.is_finite() {
            return Err(format!("non-finite coordinates {:?}", self.to_tlbr()));
        }
        if self.x < 0.0 || self.y < 0.0 {
            return Err(format!("negative coordinates ({}, {})", self.x, self.y));
        }
        if self.width <= 0.0 || self.height <= 0.0 {
            return Err(format!(
                "empty box: x2 - x1 = {}, y2 - y1 = {}",
                self.width, self.height
            ));
        }
        Ok(())
    }

    /// Calculate Intersection over Union (IoU) with another bounding box.
    pub fn iou(&self, other: &Rect) -> f32 {
        let x1 = self.x.max(other.x);
        let y1 = self.y.max(other.y);
        let x2 = (self.x + self.width).min(other.x + other.width);
        let y2 = (self.y + self.height).min(other.y + other.height);

        let inter_width = (x2 - x1).max(0.0);
        let inter_height = (y2 - y1).max(0.0);
        let inter_area = inter_width * inter_height;

        let union_area = self.area() + other.area() - inter_area;

        if union_area > 0.0 {
            inter_area / union_area
        } else {
            0.0
        }
    }
}

/// Calculate IoU matrix between two sets of bounding boxes.
///
/// Returns a matrix of shape (M, N) where M is the length of `boxes_a`
/// and N is the length of `boxes_b`.
pub fn iou_batch(boxes_a: &[Rect], boxes_b: &[Rect]) -> Array2<f32> {
    let mut ious = Array2::zeros((boxes_a.len(), boxes_b.len()));
    for (i, a) in boxes_a.iter().enumerate() {
        for (j, b) in boxes_b.iter().enumerate() {
            ious[[i, j]] = a.iou(b);
        }
    }
    ious
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rect_conversions() {
        let rect = Rect::new(10.0, 20.0, 30.0, 40.0);

        assert_eq!(rect.to_tlwh(), [10.0, 20.0, 30.0, 40.0]);
        assert_eq!(rect.to_tlbr(), [10.0, 20.0, 40.0, 60.0]);

        let xysr = rect.to_xysr();
        assert_eq!(xysr[0], 25.0); // cx
        assert_eq!(xysr[1], 40.0); // cy
        assert_eq!(xysr[2], 1200.0); // area
        assert!((xysr[3] - 0.75).abs() < 1e-9); // aspect ratio = 30/40
    }

    #[test]
    fn test_from_tlbr() {
        let rect = Rect::from_tlbr(10.0, 20.0, 40.0, 60.0);
        assert_eq!(rect.to_tlwh(), [10.0, 20.0, 30.0, 40.0]);
    }

    #[test]
    fn test_from_xysr() {
        let rect = Rect::from_xysr(25.0, 40.0, 1200.0, 0.75);
        assert!((rect.x - 10.0).abs() < 1e-4);
        assert!((rect.y - 20.0).abs() < 1e-4);
        assert!((rect.width - 30.0).abs() < 1e-4);
        assert!((rect.height - 40.0).abs() < 1e-4);
    }

    #[test]
    fn test_from_xysr_negative_scale_is_not_finite() {
        let rect = Rect::from_xysr(25.0, 40.0, -5.0, 0.75);
        assert!(!rect.is_finite());
    }

    #[test]
    fn test_validate() {
        assert!(Rect::from_tlbr(0.0, 0.0, 10.0, 10.0).validate().is_ok());
        assert!(Rect::from_tlbr(10.0, 0.0, 5.0, 10.0).validate().is_err());
        assert!(Rect::from_tlbr(0.0, 10.0, 10.0, 10.0).validate().is_err());
        assert!(Rect::from_tlbr(-1.0, 0.0, 10.0, 10.0).validate().is_err());
        assert!(Rect::new(f32::NAN, 0.0, 1.0, 1.0).validate().is_err());
    }

    #[test]
    fn test_iou() {
        let a = Rect::new(0.0, 0.0, 10.0, 10.0);
        let b = Rect::new(5.0, 5.0, 10.0, 10.0);

        // Intersection: 5x5 = 25
        // Union: 100 + 100 - 25 = 175
        let iou = a.iou(&b);
        assert!((iou - 25.0 / 175.0).abs() < 1e-6);
    }

    #[test]
    fn test_iou_no_overlap() {
        let a = Rect::new(0.0, 0.0, 10.0, 10.0);
        let b = Rect::new(20.0, 20.0, 10.0, 10.0);
        assert_eq!(a.iou(&b), 0.0);
    }

    #[test]
    fn test_iou_touching_edges() {
        let a = Rect::from_tlbr(0.0, 0.0, 1.0, 2.0);
        let b = Rect::from_tlbr(1.0, 2.0, 3.0, 3.0);
        assert_eq!(a.iou(&b), 0.0);
    }

    #[test]
    fn test_iou_same_box() {
        let a = Rect::new(3.0, 7.0, 12.5, 4.0);
        assert_eq!(a.iou(&a), 1.0);
    }

    #[test]
    fn test_iou_batch_shape() {
        let a = [Rect::new(0.0, 0.0, 10.0, 10.0), Rect::new(50.0, 50.0, 10.0, 10.0)];
        let b = [Rect::new(0.0, 0.0, 10.0, 10.0)];
        let ious = iou_batch(&a, &b);
        assert_eq!(ious.dim(), (2, 1));
        assert_eq!(ious[[0, 0]], 1.0);
        assert_eq!(ious[[1, 0]], 0.0);
    }
}
