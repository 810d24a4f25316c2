use super::{suppress_blank, BackgroundModel, FOREGROUND};
use image::GrayImage;

/// Foreground where a pixel changed by more than `threshold` since the
/// previous frame
#[derive(Debug, Clone)]
pub struct FrameDifference {
    threshold: u8,
    previous: Option<GrayImage>,
}

impl FrameDifference {
    pub fn new(threshold: u8) -> Self {
        Self {
            threshold,
            previous: None,
        }
    }
}

impl BackgroundModel for FrameDifference {
    fn update(&mut self, frame: &GrayImage) -> GrayImage {
        let (width, height) = frame.dimensions();
        let mut mask = GrayImage::new(width, height);

        if let Some(previous) = self
            .previous
            .as_ref()
            .filter(|p| p.dimensions() == frame.dimensions())
        {
            for ((out, &cur), &prev) in mask
                .iter_mut()
                .zip(frame.as_raw().iter())
                .zip(previous.as_raw().iter())
            {
                if cur.abs_diff(prev) > self.threshold {
                    *out = FOREGROUND;
                }
            }
        }

        self.previous = Some(frame.clone());
        suppress_blank(frame, mask)
    }

    fn reset(&mut self) {
        self.previous = None;
    }

    fn name(&self) -> &str {
        "diff"
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_frames::*;
    use super::*;

    #[test]
    fn test_only_changed_pixels_flagged() {
        let mut model = FrameDifference::new(25);
        model.update(&uniform(20, 20, 100));
        let mask = model.update(&with_square(20, 20, 2, 2, 3));
        assert_eq!(foreground_count(&mask), 9);

        // a square that stays put is no longer motion
        let mask = model.update(&with_square(20, 20, 2, 2, 3));
        assert_eq!(foreground_count(&mask), 0);
    }

    #[test]
    fn test_small_changes_ignored() {
        let mut model = FrameDifference::new(25);
        model.update(&uniform(8, 8, 100));
        assert_eq!(foreground_count(&model.update(&uniform(8, 8, 120))), 0);
    }

    #[test]
    fn test_reset_reseeds() {
        let mut model = FrameDifference::new(25);
        model.update(&uniform(8, 8, 100));
        model.reset();
        assert_eq!(foreground_count(&model.update(&uniform(8, 8, 250))), 0);
    }
}
