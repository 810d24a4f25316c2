//! Score-free non-maximum suppression for motion boxes

use ioueval::{calculate_iou, intersection_over_min, Bbox};
use serde::{Deserialize, Serialize};

/// How the overlap between two boxes is measured
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverlapMetric {
    /// Intersection over the smaller box's area
    #[default]
    SmallerArea,
    /// Intersection over union
    Iou,
}

impl OverlapMetric {
    pub fn overlap(&self, a: &Bbox<f32>, b: &Bbox<f32>) -> f32 {
        match self {
            Self::SmallerArea => intersection_over_min(a, b),
            Self::Iou => calculate_iou(a, b),
        }
    }
}

/// Suppress overlapping boxes without scores.
///
/// Boxes are ordered by `ymax` ascending (stable, so equal `ymax` keeps input
/// order). The last remaining box is kept each round and every remaining
/// box whose overlap with it exceeds `threshold` is dropped. Kept boxes come
/// out in selection order, largest `ymax` first.
pub fn non_max_suppression_fast(
    boxes: &[Bbox<f32>],
    threshold: f32,
    metric: OverlapMetric,
) -> Vec<Bbox<f32>> {
    if boxes.is_empty() {
        return Vec::new();
    }

    let mut remaining: Vec<usize> = (0..boxes.len()).collect();
    remaining.sort_by(|&a, &b| boxes[a].ymax.total_cmp(&boxes[b].ymax));

    let mut keep = Vec::new();
    while let Some(last) = remaining.pop() {
        let picked = boxes[last];
        remaining.retain(|&i| metric.overlap(&picked, &boxes[i]) <= threshold);
        keep.push(picked);
    }

    if keep.len() < boxes.len() {
        log::trace!("NMS kept {} of {} boxes", keep.len(), boxes.len());
    }
    keep
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nested_boxes_collapse() {
        let boxes = vec![
            Bbox::new(0.0, 0.0, 10.0, 10.0),
            Bbox::new(2.0, 2.0, 8.0, 8.0),
            Bbox::new(50.0, 50.0, 60.0, 60.0),
        ];
        let kept = non_max_suppression_fast(&boxes, 0.3, OverlapMetric::SmallerArea);
        // the far box has the largest ymax and is picked first, then the
        // outer box swallows the nested one
        assert_eq!(kept, vec![boxes[2], boxes[0]]);
    }

    #[test]
    fn test_iou_metric_keeps_nested_box() {
        let boxes = vec![Bbox::new(0.0, 0.0, 10.0, 10.0), Bbox::new(4.0, 4.0, 6.0, 6.0)];
        assert_eq!(non_max_suppression_fast(&boxes, 0.3, OverlapMetric::Iou).len(), 2);
        assert_eq!(
            non_max_suppression_fast(&boxes, 0.3, OverlapMetric::SmallerArea).len(),
            1
        );
    }

    #[test]
    fn test_overlapping_pair_keeps_lower_box() {
        // IoU 0.6, 0.75 of the smaller area
        let boxes = vec![Bbox::new(0.0, 0.0, 10.0, 10.0), Bbox::new(0.0, 2.5, 10.0, 12.5)];
        for metric in [OverlapMetric::SmallerArea, OverlapMetric::Iou] {
            let kept = non_max_suppression_fast(&boxes, 0.5, metric);
            assert_eq!(kept, vec![boxes[1]], "{:?}", metric);
        }
    }

    #[test]
    fn test_equal_ymax_prefers_later_input() {
        let boxes = vec![Bbox::new(0.0, 0.0, 10.0, 10.0), Bbox::new(1.0, 0.0, 11.0, 10.0)];
        let kept = non_max_suppression_fast(&boxes, 0.3, OverlapMetric::SmallerArea);
        assert_eq!(kept, vec![boxes[1]]);
    }

    #[test]
    fn test_empty_and_single() {
        assert!(non_max_suppression_fast(&[], 0.3, OverlapMetric::default()).is_empty());
        let one = [Bbox::new(1.0, 1.0, 2.0, 2.0)];
        assert_eq!(non_max_suppression_fast(&one, 0.3, OverlapMetric::default()), one);
    }

    fn grid_boxes() -> Vec<Bbox<f32>> {
        (0..40)
            .map(|i| {
                let x = (i * 7 % 53) as f32;
                let y = (i * 11 % 37) as f32;
                let s = 4.0 + (i % 5) as f32 * 3.0;
                Bbox::new(x, y, x + s, y + s)
            })
            .collect()
    }

    #[test]
    fn test_kept_pairs_within_threshold() {
        let boxes = grid_boxes();
        for metric in [OverlapMetric::SmallerArea, OverlapMetric::Iou] {
            let kept = non_max_suppression_fast(&boxes, 0.3, metric);
            assert!(kept.len() <= boxes.len());
            for (i, a) in kept.iter().enumerate() {
                for b in &kept[i + 1..] {
                    assert!(metric.overlap(a, b) <= 0.3);
                }
            }
        }
    }

    #[test]
    fn test_idempotent() {
        let boxes = grid_boxes();
        let once = non_max_suppression_fast(&boxes, 0.3, OverlapMetric::SmallerArea);
        let twice = non_max_suppression_fast(&once, 0.3, OverlapMetric::SmallerArea);
        assert_eq!(once.len(), twice.len());
        for b in &once {
            assert!(twice.contains(b));
        }
    }
}
