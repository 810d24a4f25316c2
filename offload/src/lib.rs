//! Edge video offloading library
//!
//! Decides which parts of each video frame are worth sending to an object
//! detector. A filter stage either forwards the whole frame or, after a
//! warm-up period, only the regions where a background model sees motion.
//! The pipeline crops those regions, runs the detector on them and maps the
//! detections back to frame coordinates so they can be scored with
//! [`ioueval`].

pub mod background;
pub mod config;
pub mod detector;
pub mod error;
pub mod filter;
pub mod motion;
pub mod nms;
pub mod pipeline;
pub mod types;

pub use background::{
    build_background, BackgroundModel, FrameDifference, GaussianMixture, RunningAverage,
};
pub use config::{BackgroundConfig, BackgroundKind, FilterConfig, FilterKind, MotionConfig};
pub use detector::{Detector, FnDetector};
pub use error::{OffloadError, Result};
pub use filter::{Filter, FilterStage, MotionGated, Passthrough};
pub use motion::{MotionDetector, MotionOutput};
pub use nms::{non_max_suppression_fast, OverlapMetric};
pub use pipeline::{OffloadPipeline, PipelineStats};
pub use types::{Detection, Frame, Region};

/// Get library version information
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
