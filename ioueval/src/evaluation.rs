//! Video-level accuracy of several offloading methods against ground truth

use crate::accuracy::AccuracyAggregator;
use crate::error::{EvalError, Result};
use crate::matcher::{DetectionMatcher, DEFAULT_MATCH_THRESHOLD};
use crate::types::BoundingBox;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Which methods and classes to score, and from which frame on
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaluationConfig {
    pub methods: Vec<String>,
    pub classes: Vec<String>,
    /// Detections before this frame are ignored
    pub start_frame: u64,
    pub iou_threshold: f32,
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            methods: ["gt", "full_frame", "mog", "mean", "hybrid"]
                .iter()
                .map(|m| m.to_string())
                .collect(),
            classes: vec!["person".to_string()],
            start_frame: 50,
            iou_threshold: DEFAULT_MATCH_THRESHOLD,
        }
    }
}

impl EvaluationConfig {
    pub fn validate(&self) -> Result<()> {
        if self.methods.is_empty() {
            return Err(EvalError::config("at least one method is required"));
        }
        if self.classes.is_empty() {
            return Err(EvalError::config("at least one class is required"));
        }
        if !(0.0..=1.0).contains(&self.iou_threshold) {
            return Err(EvalError::config(format!(
                "iou_threshold must be within [0, 1], got {}",
                self.iou_threshold
            )));
        }
        Ok(())
    }
}

/// Score stored detections of every configured method against ground truth.
///
/// Detections are filtered to `start_frame` onward, to the configured methods
/// and to valid boxes. The frames visited are the distinct frame ids that
/// remain in the detection set; each method is matched class by class on
/// every one of those frames. Methods run in parallel, each with its own
/// aggregator, and the results are merged.
pub fn evaluate_video(
    detections: &[BoundingBox],
    ground_truth: &[BoundingBox],
    config: &EvaluationConfig,
) -> Result<AccuracyAggregator> {
    config.validate()?;

    let wanted: BTreeSet<&str> = config.methods.iter().map(String::as_str).collect();
    let kept: Vec<&BoundingBox> = detections
        .iter()
        .filter(|d| d.frame_id >= config.start_frame)
        .filter(|d| d.bbox.is_valid())
        .filter(|d| d.method.as_deref().is_some_and(|m| wanted.contains(m)))
        .collect();

    let frames: BTreeSet<u64> = kept.iter().map(|d| d.frame_id).collect();
    let truth_by_frame = group_by_frame(ground_truth.iter());

    log::info!(
        "Evaluating {} detections over {} frames for {} methods",
        kept.len(),
        frames.len(),
        config.methods.len()
    );

    let matcher = DetectionMatcher::new(config.iou_threshold);

    let partials: Vec<AccuracyAggregator> = config
        .methods
        .par_iter()
        .map(|method| {
            let by_frame = group_by_frame(kept.iter().copied().filter(|d| d.has_method(method)));
            let mut agg = AccuracyAggregator::new();
            for class in &config.classes {
                agg.register(method, class);
            }

            for frame_id in &frames {
                let frame_dets = by_frame.get(frame_id).map(Vec::as_slice).unwrap_or(&[]);
                let frame_truth = truth_by_frame
                    .get(frame_id)
                    .map(Vec::as_slice)
                    .unwrap_or(&[]);

                for class in &config.classes {
                    let result = matcher.evaluate(frame_dets, frame_truth, class);
                    agg.accumulate(method, class, &result);
                }
            }

            log::debug!("Method {} evaluated", method);
            agg
        })
        .collect();

    let mut total = AccuracyAggregator::new();
    for partial in partials {
        total.merge(partial);
    }
    Ok(total)
}

fn group_by_frame<'a>(
    boxes: impl Iterator<Item = &'a BoundingBox>,
) -> BTreeMap<u64, Vec<BoundingBox>> {
    let mut grouped: BTreeMap<u64, Vec<BoundingBox>> = BTreeMap::new();
    for b in boxes {
        grouped.entry(b.frame_id).or_default().push(b.clone());
    }
    grouped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accuracy::MatchCounts;
    use crate::bbox::Bbox;
    use approx::assert_abs_diff_eq;

    fn config(methods: &[&str]) -> EvaluationConfig {
        EvaluationConfig {
            methods: methods.iter().map(|m| m.to_string()).collect(),
            classes: vec!["person".to_string(), "car".to_string()],
            start_frame: 0,
            ..Default::default()
        }
    }

    fn person_at(x: f32) -> Bbox<f32> {
        Bbox::new(x, 0.0, x + 10.0, 20.0)
    }

    #[test]
    fn test_methods_scored_independently() {
        let truth = vec![
            BoundingBox::ground_truth(1, "person", person_at(0.0)),
            BoundingBox::ground_truth(2, "person", person_at(5.0)),
        ];
        let dets = vec![
            BoundingBox::detection(1, "mog", "person", 0.9, person_at(0.0)),
            BoundingBox::detection(2, "mog", "person", 0.9, person_at(5.0)),
            BoundingBox::detection(1, "mean", "person", 0.9, person_at(50.0)),
        ];

        let agg = evaluate_video(&dets, &truth, &config(&["mog", "mean"])).unwrap();
        let table = agg.finalize();

        let mog = table.get("mog", "person").unwrap();
        assert_eq!((mog.counts.tp, mog.counts.fp, mog.counts.fn_), (2, 0, 0));
        assert_abs_diff_eq!(mog.precision, 1.0);

        // "mean" found nothing useful: its box on frame 1 is a false positive
        // and both truths are missed.
        let mean = table.get("mean", "person").unwrap();
        assert_eq!((mean.counts.tp, mean.counts.fp, mean.counts.fn_), (0, 1, 2));
        assert_eq!(mean.recall, 0.0);

        let car = table.get("mog", "car").unwrap();
        assert_eq!(car.counts, MatchCounts::default());
    }

    #[test]
    fn test_start_frame_and_invalid_boxes_filtered() {
        let truth = vec![BoundingBox::ground_truth(60, "person", person_at(0.0))];
        let dets = vec![
            BoundingBox::detection(10, "mog", "person", 0.9, person_at(0.0)),
            BoundingBox::detection(60, "mog", "person", 0.9, Bbox::new(9.0, 0.0, 3.0, 20.0)),
            BoundingBox::detection(60, "mog", "person", 0.9, person_at(0.0)),
        ];
        let cfg = EvaluationConfig {
            start_frame: 50,
            ..config(&["mog"])
        };
        let agg = evaluate_video(&dets, &truth, &cfg).unwrap();
        let c = agg.counts("mog", "person").unwrap();
        assert_eq!((c.tp, c.fp, c.fn_), (1, 0, 0));
    }

    #[test]
    fn test_unlisted_methods_ignored() {
        let dets = vec![BoundingBox::detection(1, "hybrid", "person", 0.9, person_at(0.0))];
        let agg = evaluate_video(&dets, &[], &config(&["mog"])).unwrap();
        assert!(agg.counts("hybrid", "person").is_none());
        assert_eq!(agg.counts("mog", "person").unwrap(), MatchCounts::default());
    }

    #[test]
    fn test_invalid_config_rejected() {
        let cfg = EvaluationConfig {
            methods: Vec::new(),
            ..Default::default()
        };
        assert!(matches!(
            evaluate_video(&[], &[], &cfg),
            Err(EvalError::ConfigError(_))
        ));
    }
}
