//! Bounding box geometry and IoU calculations

use ndarray::Array2;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Axis-aligned box in pixel coordinates, corners inclusive-exclusive
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bbox<T = f32> {
    pub xmin: T,
    pub ymin: T,
    pub xmax: T,
    pub ymax: T,
}

impl Bbox<f32> {
    pub fn new(xmin: f32, ymin: f32, xmax: f32, ymax: f32) -> Self {
        Self {
            xmin,
            ymin,
            xmax,
            ymax,
        }
    }

    /// Build from a top-left corner and a size, the layout used by the
    /// on-disk annotation formats.
    pub fn from_xywh(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self::new(x, y, x + width, y + height)
    }

    pub fn width(&self) -> f32 {
        self.xmax - self.xmin
    }

    pub fn height(&self) -> f32 {
        self.ymax - self.ymin
    }

    pub fn area(&self) -> f32 {
        self.width() * self.height()
    }

    pub fn center_x(&self) -> f32 {
        (self.xmin + self.xmax) / 2.0
    }

    pub fn center_y(&self) -> f32 {
        (self.ymin + self.ymax) / 2.0
    }

    /// Both extents strictly positive and finite.
    pub fn is_valid(&self) -> bool {
        self.xmin.is_finite()
            && self.ymin.is_finite()
            && self.xmax.is_finite()
            && self.ymax.is_finite()
            && self.xmin < self.xmax
            && self.ymin < self.ymax
    }

    /// Shift by an offset, used to bring region-local boxes back into frame
    /// coordinates.
    pub fn translate(&self, dx: f32, dy: f32) -> Self {
        Self::new(self.xmin + dx, self.ymin + dy, self.xmax + dx, self.ymax + dy)
    }
}

impl<T: fmt::Display> fmt::Display for Bbox<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Bbox({}, {}, {}, {})",
            self.xmin, self.ymin, self.xmax, self.ymax
        )
    }
}

/// Area shared by two boxes, 0 when they do not overlap
pub fn intersection_area(bbox1: &Bbox<f32>, bbox2: &Bbox<f32>) -> f32 {
    let x1 = bbox1.xmin.max(bbox2.xmin);
    let y1 = bbox1.ymin.max(bbox2.ymin);
    let x2 = bbox1.xmax.min(bbox2.xmax);
    let y2 = bbox1.ymax.min(bbox2.ymax);

    if x2 <= x1 || y2 <= y1 {
        return 0.0;
    }

    (x2 - x1) * (y2 - y1)
}

/// Calculate IoU between two bounding boxes
pub fn calculate_iou(bbox1: &Bbox<f32>, bbox2: &Bbox<f32>) -> f32 {
    let intersection = intersection_area(bbox1, bbox2);
    if intersection <= 0.0 {
        return 0.0;
    }

    let union = bbox1.area() + bbox2.area() - intersection;

    if union > 0.0 {
        intersection / union
    } else {
        0.0
    }
}

/// Intersection divided by the area of the smaller box.
///
/// Always >= IoU for the same pair; a small box fully inside a large one
/// scores 1.0.
pub fn intersection_over_min(bbox1: &Bbox<f32>, bbox2: &Bbox<f32>) -> f32 {
    let intersection = intersection_area(bbox1, bbox2);
    if intersection <= 0.0 {
        return 0.0;
    }

    let smaller = bbox1.area().min(bbox2.area());
    if smaller > 0.0 {
        intersection / smaller
    } else {
        0.0
    }
}

/// Compute IoU matrix between detections and ground truth with parallel processing
/// Returns: (n_detections, n_truths) IoU matrix
pub fn ious(detections: &[Bbox<f32>], truths: &[Bbox<f32>]) -> Array2<f32> {
    let n_dets = detections.len();
    let n_truths = truths.len();

    if n_dets == 0 || n_truths == 0 {
        return Array2::zeros((n_dets, n_truths));
    }

    let iou_data: Vec<f32> = detections
        .par_iter()
        .flat_map_iter(|det| truths.iter().map(move |gt| calculate_iou(det, gt)))
        .collect();

    Array2::from_shape_vec((n_dets, n_truths), iou_data)
        .unwrap_or_else(|_| Array2::zeros((n_dets, n_truths)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_bbox_creation() {
        let bbox = Bbox::new(0.0, 0.0, 10.0, 10.0);
        assert_eq!(bbox.xmin, 0.0);
        assert_eq!(bbox.ymin, 0.0);
        assert_eq!(bbox.xmax, 10.0);
        assert_eq!(bbox.ymax, 10.0);
        assert_eq!(Bbox::from_xywh(2.0, 3.0, 4.0, 5.0), Bbox::new(2.0, 3.0, 6.0, 8.0));
    }

    #[test]
    fn test_bbox_properties() {
        let bbox = Bbox::new(0.0, 0.0, 10.0, 5.0);
        assert_eq!(bbox.width(), 10.0);
        assert_eq!(bbox.height(), 5.0);
        assert_eq!(bbox.area(), 50.0);
        assert_eq!(bbox.center_x(), 5.0);
        assert_eq!(bbox.center_y(), 2.5);
    }

    #[test]
    fn test_bbox_validity() {
        assert!(Bbox::new(0.0, 0.0, 1.0, 1.0).is_valid());
        assert!(!Bbox::new(5.0, 0.0, 5.0, 1.0).is_valid());
        assert!(!Bbox::new(0.0, 4.0, 1.0, 2.0).is_valid());
        assert!(!Bbox::new(0.0, 0.0, f32::NAN, 1.0).is_valid());
    }

    #[test]
    fn test_iou_calculation() {
        let bbox1 = Bbox::new(0.0, 0.0, 10.0, 10.0);
        let bbox2 = Bbox::new(5.0, 5.0, 15.0, 15.0);
        let iou = calculate_iou(&bbox1, &bbox2);
        assert_abs_diff_eq!(iou, 25.0 / 175.0, epsilon = 0.001);
    }

    #[test]
    fn test_iou_identity_and_symmetry() {
        let a = Bbox::new(3.0, 4.0, 20.0, 31.0);
        let b = Bbox::new(10.0, 0.0, 25.0, 12.0);
        assert_abs_diff_eq!(calculate_iou(&a, &a), 1.0, epsilon = 1e-6);
        assert_abs_diff_eq!(calculate_iou(&a, &b), calculate_iou(&b, &a), epsilon = 1e-6);
    }

    #[test]
    fn test_iou_disjoint_and_touching() {
        let a = Bbox::new(0.0, 0.0, 10.0, 10.0);
        let far = Bbox::new(50.0, 50.0, 60.0, 60.0);
        let touching = Bbox::new(10.0, 0.0, 20.0, 10.0);
        assert_eq!(calculate_iou(&a, &far), 0.0);
        assert_eq!(calculate_iou(&a, &touching), 0.0);
    }

    #[test]
    fn test_intersection_over_min_nested() {
        let outer = Bbox::new(0.0, 0.0, 100.0, 100.0);
        let inner = Bbox::new(10.0, 10.0, 20.0, 20.0);
        assert_abs_diff_eq!(intersection_over_min(&outer, &inner), 1.0, epsilon = 1e-6);
        assert!(calculate_iou(&outer, &inner) < 0.02);
    }

    #[test]
    fn test_iou_matrix_shape() {
        let dets = vec![Bbox::new(0.0, 0.0, 10.0, 10.0), Bbox::new(20.0, 20.0, 30.0, 30.0)];
        let gts = vec![
            Bbox::new(0.0, 0.0, 10.0, 10.0),
            Bbox::new(100.0, 100.0, 110.0, 110.0),
            Bbox::new(20.0, 20.0, 30.0, 30.0),
        ];
        let m = ious(&dets, &gts);
        assert_eq!(m.dim(), (2, 3));
        assert_abs_diff_eq!(m[[0, 0]], 1.0, epsilon = 1e-6);
        assert_eq!(m[[0, 1]], 0.0);
        assert_abs_diff_eq!(m[[1, 2]], 1.0, epsilon = 1e-6);

        assert_eq!(ious(&[], &gts).dim(), (0, 3));
    }
}
