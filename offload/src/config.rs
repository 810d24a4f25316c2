//! Configuration for background models, motion detection and filter stages

use crate::error::{OffloadError, Result};
use crate::nms::OverlapMetric;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;

/// Upper bound on mixture components per pixel
pub const MAX_MIXTURE_COMPONENTS: usize = 8;

/// Background model selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackgroundKind {
    /// Absolute difference against the previous frame ("diff")
    FrameDifference,
    /// Exponential running mean ("mean")
    RunningAverage,
    /// Per-pixel Gaussian mixture ("mog")
    #[default]
    GaussianMixture,
}

impl BackgroundKind {
    /// Short name used as the offloading method label
    pub fn method_name(&self) -> &'static str {
        match self {
            Self::FrameDifference => "diff",
            Self::RunningAverage => "mean",
            Self::GaussianMixture => "mog",
        }
    }
}

impl FromStr for BackgroundKind {
    type Err = OffloadError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "diff" | "frame_difference" => Ok(Self::FrameDifference),
            "mean" | "running_average" => Ok(Self::RunningAverage),
            "mog" | "gaussian_mixture" => Ok(Self::GaussianMixture),
            other => Err(OffloadError::config(format!(
                "unknown background model '{}'",
                other
            ))),
        }
    }
}

/// Parameters shared by all background models; each model reads the ones it
/// uses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackgroundConfig {
    pub kind: BackgroundKind,
    /// Intensity difference marking a pixel as foreground (diff, mean)
    pub threshold: u8,
    /// Floor on the adaptation rate of the running mean
    pub alpha: f32,
    /// Gaussians per pixel
    pub components: usize,
    /// Floor on the mixture adaptation rate
    pub learning_rate: f32,
    /// Squared Mahalanobis distance for a pixel to match a component
    pub variance_threshold: f32,
    /// Share of total weight explained by background components
    pub background_ratio: f32,
    /// Variance given to a freshly created component
    pub initial_variance: f32,
    pub min_variance: f32,
}

impl Default for BackgroundConfig {
    fn default() -> Self {
        Self {
            kind: BackgroundKind::default(),
            threshold: 25,
            alpha: 0.05,
            components: 3,
            learning_rate: 0.005,
            variance_threshold: 6.25,
            background_ratio: 0.7,
            initial_variance: 225.0,
            min_variance: 4.0,
        }
    }
}

impl BackgroundConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.alpha > 0.0 && self.alpha <= 1.0) {
            return Err(OffloadError::config(format!(
                "alpha must be in (0, 1], got {}",
                self.alpha
            )));
        }
        if !(self.learning_rate > 0.0 && self.learning_rate <= 1.0) {
            return Err(OffloadError::config(format!(
                "learning_rate must be in (0, 1], got {}",
                self.learning_rate
            )));
        }
        if self.components == 0 || self.components > MAX_MIXTURE_COMPONENTS {
            return Err(OffloadError::config(format!(
                "components must be in 1..={}, got {}",
                MAX_MIXTURE_COMPONENTS, self.components
            )));
        }
        if !(self.background_ratio > 0.0 && self.background_ratio <= 1.0) {
            return Err(OffloadError::config(format!(
                "background_ratio must be in (0, 1], got {}",
                self.background_ratio
            )));
        }
        if self.variance_threshold <= 0.0 || self.min_variance <= 0.0 {
            return Err(OffloadError::config("variances must be positive"));
        }
        if self.initial_variance < self.min_variance {
            return Err(OffloadError::config(
                "initial_variance must not be below min_variance",
            ));
        }
        Ok(())
    }
}

/// Motion detector parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MotionConfig {
    pub background: BackgroundConfig,
    /// Erosion radius (L-infinity) applied to the raw mask, 0 to skip
    pub erode_radius: u8,
    /// Dilation radius applied after erosion, 0 to skip
    pub dilate_radius: u8,
    /// Components with fewer foreground pixels are dropped
    pub min_area: u32,
    /// Overlap above which NMS discards a box
    pub nms_threshold: f32,
    pub overlap_metric: OverlapMetric,
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self {
            background: BackgroundConfig::default(),
            erode_radius: 1,
            dilate_radius: 2,
            min_area: 16,
            nms_threshold: 0.3,
            overlap_metric: OverlapMetric::default(),
        }
    }
}

impl MotionConfig {
    pub fn validate(&self) -> Result<()> {
        self.background.validate()?;
        if !(0.0..=1.0).contains(&self.nms_threshold) {
            return Err(OffloadError::config(format!(
                "nms_threshold must be within [0, 1], got {}",
                self.nms_threshold
            )));
        }
        Ok(())
    }
}

/// Filter stage selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterKind {
    /// Whole frame, every frame
    Passthrough,
    /// Regions of motion after a warm-up period
    #[default]
    MotionGated,
}

impl FromStr for FilterKind {
    type Err = OffloadError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "passthrough" | "dummy" | "full_frame" => Ok(Self::Passthrough),
            "motion_gated" | "motion" | "static" => Ok(Self::MotionGated),
            other => Err(OffloadError::config(format!("unknown filter '{}'", other))),
        }
    }
}

/// Filter stage configuration, loadable from JSON
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    pub kind: FilterKind,
    /// Frames fed to the background model before any region is emitted
    pub warmup: u64,
    pub motion: MotionConfig,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            kind: FilterKind::default(),
            warmup: 100,
            motion: MotionConfig::default(),
        }
    }
}

impl FilterConfig {
    pub fn passthrough() -> Self {
        Self {
            kind: FilterKind::Passthrough,
            warmup: 0,
            ..Default::default()
        }
    }

    pub fn motion_gated(warmup: u64, motion: MotionConfig) -> Self {
        Self {
            kind: FilterKind::MotionGated,
            warmup,
            motion,
        }
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        let config = Self::from_json_str(&text)?;
        log::info!(
            "Loaded {:?} filter config from {}",
            config.kind,
            path.as_ref().display()
        );
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        match self.kind {
            FilterKind::Passthrough => Ok(()),
            FilterKind::MotionGated => self.motion.validate(),
        }
    }
}
