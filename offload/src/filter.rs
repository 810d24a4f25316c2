//! Filter stages deciding which parts of a frame reach the detector

use crate::config::{FilterConfig, FilterKind};
use crate::error::{OffloadError, Result};
use crate::motion::MotionDetector;
use crate::types::{Frame, Region};

/// A stage that sees every frame of a video once, in order, and returns the
/// regions worth sending to the detector.
///
/// After [`epilogue`](Self::epilogue) the stage accepts no more frames.
pub trait FilterStage: Send {
    fn filter(&mut self, frame: &Frame) -> Result<Vec<Region>>;

    /// Called once when the frame source is exhausted
    fn epilogue(&mut self);
}

/// Sends every frame in full
#[derive(Debug, Clone, Default)]
pub struct Passthrough {
    finished: bool,
}

impl Passthrough {
    pub fn new() -> Self {
        Self::default()
    }
}

impl FilterStage for Passthrough {
    fn filter(&mut self, frame: &Frame) -> Result<Vec<Region>> {
        if self.finished {
            return Err(OffloadError::StageFinished);
        }
        if frame.is_empty() {
            log::warn!("Frame {} has zero size, skipping", frame.frame_id);
            return Ok(Vec::new());
        }
        Ok(vec![Region::full(frame)])
    }

    fn epilogue(&mut self) {
        finish(&mut self.finished, "passthrough");
    }
}

/// Sends only the regions where motion was detected.
///
/// The first `warmup` frames train the background model and produce no
/// regions.
pub struct MotionGated {
    detector: MotionDetector,
    warmup: u64,
    processed_frames: u64,
    finished: bool,
}

impl MotionGated {
    pub fn new(detector: MotionDetector, warmup: u64) -> Self {
        Self {
            detector,
            warmup,
            processed_frames: 0,
            finished: false,
        }
    }

    pub fn processed_frames(&self) -> u64 {
        self.processed_frames
    }

    pub fn warmup(&self) -> u64 {
        self.warmup
    }

    pub fn in_warmup(&self) -> bool {
        self.processed_frames < self.warmup
    }
}

impl FilterStage for MotionGated {
    fn filter(&mut self, frame: &Frame) -> Result<Vec<Region>> {
        if self.finished {
            return Err(OffloadError::StageFinished);
        }

        let warming_up = self.in_warmup();
        let output = self.detector.detect(frame)?;
        self.processed_frames += 1;

        if warming_up {
            if !self.in_warmup() {
                log::info!(
                    "Background model warmed up after {} frames",
                    self.processed_frames
                );
            }
            return Ok(Vec::new());
        }
        Ok(output.boxes)
    }

    fn epilogue(&mut self) {
        finish(&mut self.finished, "motion-gated");
    }
}

fn finish(finished: &mut bool, name: &str) {
    if *finished {
        log::warn!("Epilogue called twice on {} filter, ignoring", name);
        return;
    }
    *finished = true;
    log::debug!("{} filter finished", name);
}

/// The available filter stages
pub enum Filter {
    Passthrough(Passthrough),
    MotionGated(MotionGated),
}

impl Filter {
    pub fn from_config(config: &FilterConfig) -> Result<Self> {
        config.validate()?;
        let filter = match config.kind {
            FilterKind::Passthrough => Self::Passthrough(Passthrough::new()),
            FilterKind::MotionGated => {
                let detector = MotionDetector::new(config.motion.clone())?;
                Self::MotionGated(MotionGated::new(detector, config.warmup))
            }
        };
        log::info!("Created {} filter", filter.name());
        Ok(filter)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Passthrough(_) => "passthrough",
            Self::MotionGated(_) => "motion_gated",
        }
    }
}

impl FilterStage for Filter {
    fn filter(&mut self, frame: &Frame) -> Result<Vec<Region>> {
        match self {
            Self::Passthrough(f) => f.filter(frame),
            Self::MotionGated(f) => f.filter(frame),
        }
    }

    fn epilogue(&mut self) {
        match self {
            Self::Passthrough(f) => f.epilogue(),
            Self::MotionGated(f) => f.epilogue(),
        }
    }
}
