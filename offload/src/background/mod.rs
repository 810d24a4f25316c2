//! Background subtraction models
//!
//! Every model turns a grayscale frame into a foreground mask (255 for
//! foreground, 0 for background) and adapts its state to the frame:
//! - FrameDifference: difference against the previous frame
//! - RunningAverage: difference against an exponential running mean
//! - GaussianMixture: per-pixel adaptive mixture of Gaussians

use crate::config::{BackgroundConfig, BackgroundKind};
use crate::error::Result;
use image::GrayImage;

mod frame_difference;
mod mixture;
mod running_average;

pub use frame_difference::FrameDifference;
pub use mixture::GaussianMixture;
pub use running_average::RunningAverage;

/// Mask value marking a foreground pixel
pub const FOREGROUND: u8 = 255;

/// Common interface for background models
///
/// Models are stateful and fed frames in order. The first frame only seeds
/// the model and yields an empty mask. A blank frame is absorbed like any
/// other but always yields an empty mask.
pub trait BackgroundModel: Send {
    /// Absorb `frame` and return its foreground mask, same dimensions
    fn update(&mut self, frame: &GrayImage) -> GrayImage;

    /// Forget everything learned so far
    fn reset(&mut self);

    fn name(&self) -> &str;
}

/// Build the configured model
pub fn build_background(config: &BackgroundConfig) -> Result<Box<dyn BackgroundModel>> {
    config.validate()?;
    let model: Box<dyn BackgroundModel> = match config.kind {
        BackgroundKind::FrameDifference => Box::new(FrameDifference::new(config.threshold)),
        BackgroundKind::RunningAverage => {
            Box::new(RunningAverage::new(config.alpha, config.threshold))
        }
        BackgroundKind::GaussianMixture => Box::new(GaussianMixture::from_config(config)),
    };
    log::debug!("Built {} background model", model.name());
    Ok(model)
}

/// Adaptation rate for the `seen`-th frame: 1/seen until it drops to `floor`
pub(crate) fn adaptation_rate(seen: u64, floor: f32) -> f32 {
    if seen == 0 {
        return 1.0;
    }
    (1.0 / seen as f32).max(floor)
}

pub(crate) fn is_blank(frame: &GrayImage) -> bool {
    frame.as_raw().iter().all(|&p| p == 0)
}

/// Replace the mask with an empty one when the frame was blank
pub(crate) fn suppress_blank(frame: &GrayImage, mask: GrayImage) -> GrayImage {
    if is_blank(frame) {
        GrayImage::new(frame.width(), frame.height())
    } else {
        mask
    }
}

#[cfg(test)]
pub(crate) mod test_frames {
    use image::{GrayImage, Luma};

    pub fn uniform(width: u32, height: u32, value: u8) -> GrayImage {
        GrayImage::from_pixel(width, height, Luma([value]))
    }

    /// Uniform frame with a bright square at (x, y)
    pub fn with_square(width: u32, height: u32, x: u32, y: u32, size: u32) -> GrayImage {
        let mut img = uniform(width, height, 100);
        for py in y..(y + size).min(height) {
            for px in x..(x + size).min(width) {
                img.put_pixel(px, py, Luma([250]));
            }
        }
        img
    }

    pub fn foreground_count(mask: &GrayImage) -> usize {
        mask.as_raw().iter().filter(|&&p| p != 0).count()
    }
}
