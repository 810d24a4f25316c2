//! Greedy IoU matching of one frame's detections against ground truth

use crate::bbox::{ious, Bbox};
use crate::types::BoundingBox;
use serde::{Deserialize, Serialize};

/// Default IoU a detection needs to claim a ground-truth box
pub const DEFAULT_MATCH_THRESHOLD: f32 = 0.5;

/// Outcome of matching one (frame, class, method) key.
///
/// `tp` holds the detection that claimed a ground-truth box, so the counts
/// satisfy `tp + fn_ == ground truth` and `tp + fp == detections`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    /// Detections that claimed a ground-truth box
    pub tp: Vec<BoundingBox>,
    /// Detections left unmatched
    pub fp: Vec<BoundingBox>,
    /// Ground-truth boxes nobody claimed
    pub fn_: Vec<BoundingBox>,
}

impl MatchResult {
    pub fn is_empty(&self) -> bool {
        self.tp.is_empty() && self.fp.is_empty() && self.fn_.is_empty()
    }
}

/// Greedy single-pass matcher
#[derive(Debug, Clone, Copy)]
pub struct DetectionMatcher {
    iou_threshold: f32,
}

impl Default for DetectionMatcher {
    fn default() -> Self {
        Self::new(DEFAULT_MATCH_THRESHOLD)
    }
}

impl DetectionMatcher {
    pub fn new(iou_threshold: f32) -> Self {
        Self { iou_threshold }
    }

    /// Match `detections` against `ground_truth` for a single `class`.
    ///
    /// Boxes of other classes are ignored and invalid boxes are dropped
    /// before matching. Detections are consumed in the order given: each one
    /// takes the unclaimed ground-truth box with the highest IoU (first one
    /// wins on ties) if that IoU reaches the threshold.
    pub fn evaluate(
        &self,
        detections: &[BoundingBox],
        ground_truth: &[BoundingBox],
        class: &str,
    ) -> MatchResult {
        let dets = select_class(detections, class);
        let gts = select_class(ground_truth, class);

        let mut result = MatchResult::default();
        if dets.is_empty() && gts.is_empty() {
            return result;
        }

        let det_boxes: Vec<Bbox<f32>> = dets.iter().map(|d| d.bbox).collect();
        let gt_boxes: Vec<Bbox<f32>> = gts.iter().map(|g| g.bbox).collect();
        let iou_matrix = ious(&det_boxes, &gt_boxes);

        let mut claimed = vec![false; gts.len()];

        for (det_idx, det) in dets.iter().enumerate() {
            let mut best: Option<(usize, f32)> = None;
            for (gt_idx, is_claimed) in claimed.iter().enumerate() {
                if *is_claimed {
                    continue;
                }
                let iou = iou_matrix[[det_idx, gt_idx]];
                match best {
                    Some((_, best_iou)) if iou <= best_iou => {}
                    _ => best = Some((gt_idx, iou)),
                }
            }

            match best {
                Some((gt_idx, iou)) if iou >= self.iou_threshold => {
                    claimed[gt_idx] = true;
                    result.tp.push((*det).clone());
                }
                _ => result.fp.push((*det).clone()),
            }
        }

        result.fn_ = gts
            .iter()
            .zip(claimed.iter())
            .filter(|(_, is_claimed)| !**is_claimed)
            .map(|(gt, _)| (*gt).clone())
            .collect();

        log::trace!(
            "class {}: {} detections, {} ground truth -> TP {} FP {} FN {}",
            class,
            dets.len(),
            gts.len(),
            result.tp.len(),
            result.fp.len(),
            result.fn_.len()
        );

        result
    }
}

fn select_class<'a>(boxes: &'a [BoundingBox], class: &str) -> Vec<&'a BoundingBox> {
    boxes
        .iter()
        .filter(|b| {
            if !b.has_label(class) {
                return false;
            }
            if !b.bbox.is_valid() {
                log::debug!("Dropping invalid box {} in frame {}", b.bbox, b.frame_id);
                return false;
            }
            true
        })
        .collect()
}
