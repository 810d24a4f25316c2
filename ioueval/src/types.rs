//! Annotated boxes shared by detections and ground truth

use crate::bbox::Bbox;
use serde::{Deserialize, Serialize};

/// Method tag carried by ground-truth rows
pub const GROUND_TRUTH_METHOD: &str = "gt";

/// A box with the metadata the evaluation needs.
///
/// Detections carry a `score`; ground truth does not. A box without a label
/// or with a non-positive extent is invalid and never reaches the matcher.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    #[serde(flatten)]
    pub bbox: Bbox<f32>,
    pub label: Option<String>,
    pub score: Option<f32>,
    pub frame_id: u64,
    pub method: Option<String>,
}

impl BoundingBox {
    /// Ground-truth box for one frame
    pub fn ground_truth(frame_id: u64, label: impl Into<String>, bbox: Bbox<f32>) -> Self {
        Self {
            bbox,
            label: Some(label.into()),
            score: None,
            frame_id,
            method: Some(GROUND_TRUTH_METHOD.to_string()),
        }
    }

    /// Scored detection produced by `method`
    pub fn detection(
        frame_id: u64,
        method: impl Into<String>,
        label: impl Into<String>,
        score: f32,
        bbox: Bbox<f32>,
    ) -> Self {
        Self {
            bbox,
            label: Some(label.into()),
            score: Some(score),
            frame_id,
            method: Some(method.into()),
        }
    }

    pub fn is_valid(&self) -> bool {
        self.label.is_some() && self.bbox.is_valid()
    }

    pub fn has_label(&self, label: &str) -> bool {
        self.label.as_deref() == Some(label)
    }

    pub fn has_method(&self, method: &str) -> bool {
        self.method.as_deref() == Some(method)
    }
}

/// Sort detections by descending score, unscored boxes last.
///
/// The matcher consumes detections in the order given; pre-sorting gives
/// the usual average-precision behaviour.
pub fn sort_by_score(boxes: &mut [BoundingBox]) {
    boxes.sort_by(|a, b| {
        let sa = a.score.unwrap_or(f32::NEG_INFINITY);
        let sb = b.score.unwrap_or(f32::NEG_INFINITY);
        sb.total_cmp(&sa)
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_required() {
        let mut b = BoundingBox::ground_truth(3, "person", Bbox::new(0.0, 0.0, 4.0, 4.0));
        assert!(b.is_valid());
        b.label = None;
        assert!(!b.is_valid());
    }

    #[test]
    fn test_degenerate_extent_invalid() {
        let b = BoundingBox::detection(1, "mog", "car", 0.7, Bbox::new(5.0, 5.0, 5.0, 9.0));
        assert!(!b.is_valid());
    }

    #[test]
    fn test_sort_by_score() {
        let bb = Bbox::new(0.0, 0.0, 1.0, 1.0);
        let mut boxes = vec![
            BoundingBox::detection(0, "mog", "person", 0.2, bb),
            BoundingBox::ground_truth(0, "person", bb),
            BoundingBox::detection(0, "mog", "person", 0.9, bb),
        ];
        sort_by_score(&mut boxes);
        assert_eq!(boxes[0].score, Some(0.9));
        assert_eq!(boxes[1].score, Some(0.2));
        assert_eq!(boxes[2].score, None);
    }
}
