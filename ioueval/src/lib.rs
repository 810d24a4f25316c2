//! Pure Rust detection-evaluation library
//!
//! Scores the output of video offloading methods against ground truth:
//! box geometry and IoU, greedy per-frame matching into TP/FP/FN sets,
//! per-(method, class) precision/recall aggregation, plus readers and
//! writers for the annotation and detection files used around it.
//!
//! ```rust,ignore
//! use ioueval::{AccuracyAggregator, Bbox, BoundingBox, DetectionMatcher};
//!
//! let truth = vec![BoundingBox::ground_truth(0, "person", Bbox::new(0.0, 0.0, 10.0, 10.0))];
//! let dets = vec![BoundingBox::detection(0, "mog", "person", 0.9, Bbox::new(0.0, 0.0, 10.0, 10.0))];
//!
//! let mut accuracy = AccuracyAggregator::new();
//! let result = DetectionMatcher::default().evaluate(&dets, &truth, "person");
//! accuracy.accumulate("mog", "person", &result);
//! let table = accuracy.finalize();
//! ```

pub mod accuracy;
pub mod bbox;
pub mod dataset;
pub mod error;
pub mod evaluation;
pub mod export;
pub mod matcher;
pub mod types;

pub use accuracy::{
    AccuracyAggregator, AccuracySummary, AccuracyTable, MatchCounts, Metric, MetricRow,
    SharedAccuracy,
};
pub use bbox::{calculate_iou, intersection_over_min, Bbox};
pub use error::{EvalError, Result};
pub use evaluation::{evaluate_video, EvaluationConfig};
pub use matcher::{DetectionMatcher, MatchResult, DEFAULT_MATCH_THRESHOLD};
pub use types::{sort_by_score, BoundingBox, GROUND_TRUTH_METHOD};
