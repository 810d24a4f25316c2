use super::{adaptation_rate, suppress_blank, BackgroundModel, FOREGROUND};
use image::GrayImage;
use ndarray::{Array2, ArrayView2, ArrayViewMut2, Zip};

/// Exponential running mean of the scene.
///
/// A pixel is foreground when it differs from the mean by more than
/// `threshold`. The mean then moves toward the frame at rate
/// `max(1/n, alpha)` for the n-th frame.
#[derive(Debug, Clone)]
pub struct RunningAverage {
    alpha: f32,
    threshold: u8,
    mean: Option<Array2<f32>>,
    seen: u64,
}

impl RunningAverage {
    pub fn new(alpha: f32, threshold: u8) -> Self {
        Self {
            alpha,
            threshold,
            mean: None,
            seen: 0,
        }
    }

    /// Current background estimate, (height, width)
    pub fn mean(&self) -> Option<&Array2<f32>> {
        self.mean.as_ref()
    }
}

impl BackgroundModel for RunningAverage {
    fn update(&mut self, frame: &GrayImage) -> GrayImage {
        let (width, height) = frame.dimensions();
        let shape = (height as usize, width as usize);
        let mut mask = GrayImage::new(width, height);

        let pixels = match ArrayView2::from_shape(shape, frame.as_raw().as_slice()) {
            Ok(view) => view,
            Err(_) => return mask,
        };

        if self.mean.as_ref().map(|m| m.dim()) != Some(shape) {
            self.mean = Some(pixels.mapv(f32::from));
            self.seen = 1;
            return mask;
        }
        let Some(mean) = self.mean.as_mut() else {
            return mask;
        };

        self.seen += 1;
        let rate = adaptation_rate(self.seen, self.alpha);
        let threshold = self.threshold as f32;

        if let Ok(mut out) = ArrayViewMut2::from_shape(shape, &mut *mask) {
            Zip::from(mean)
                .and(&pixels)
                .and(&mut out)
                .par_for_each(|m, &p, o| {
                    let value = p as f32;
                    if (value - *m).abs() > threshold {
                        *o = FOREGROUND;
                    }
                    *m += rate * (value - *m);
                });
        }

        suppress_blank(frame, mask)
    }

    fn reset(&mut self) {
        self.mean = None;
        self.seen = 0;
    }

    fn name(&self) -> &str {
        "mean"
    }
}
