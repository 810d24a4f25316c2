//! Motion detection: background subtraction, mask cleanup and box extraction

use crate::background::{build_background, BackgroundModel};
use crate::config::MotionConfig;
use crate::error::{OffloadError, Result};
use crate::nms::non_max_suppression_fast;
use crate::types::{Frame, Region};
use image::imageops::grayscale;
use image::{GrayImage, Luma};
use imageproc::distance_transform::Norm;
use imageproc::morphology::{dilate, erode};
use imageproc::region_labelling::{connected_components, Connectivity};
use ioueval::Bbox;

/// Boxes around moving regions plus the cleaned foreground mask
#[derive(Debug, Clone, Default)]
pub struct MotionOutput {
    pub boxes: Vec<Region>,
    pub mask: GrayImage,
}

impl MotionOutput {
    fn empty() -> Self {
        Self::default()
    }
}

/// Finds moving regions in a stream of frames.
///
/// Owns its background model. Frames must arrive with strictly increasing
/// `frame_id`; all frames must share the dimensions of the first one.
pub struct MotionDetector {
    config: MotionConfig,
    background: Box<dyn BackgroundModel>,
    frame_size: Option<(u32, u32)>,
    last_frame_id: Option<u64>,
}

impl MotionDetector {
    pub fn new(config: MotionConfig) -> Result<Self> {
        config.validate()?;
        let background = build_background(&config.background)?;
        Ok(Self::with_background(config, background))
    }

    /// Use a caller-supplied background model instead of the configured one
    pub fn with_background(config: MotionConfig, background: Box<dyn BackgroundModel>) -> Self {
        Self {
            config,
            background,
            frame_size: None,
            last_frame_id: None,
        }
    }

    pub fn config(&self) -> &MotionConfig {
        &self.config
    }

    pub fn background_name(&self) -> &str {
        self.background.name()
    }

    /// Detect moving regions in `frame`.
    ///
    /// A frame that is empty or differs in size from the first frame yields
    /// no boxes and leaves the background model untouched.
    pub fn detect(&mut self, frame: &Frame) -> Result<MotionOutput> {
        if let Some(last) = self.last_frame_id {
            if frame.frame_id <= last {
                return Err(OffloadError::SequenceViolation {
                    last,
                    got: frame.frame_id,
                });
            }
        }
        self.last_frame_id = Some(frame.frame_id);

        if frame.is_empty() {
            log::warn!("Frame {} has zero size, skipping", frame.frame_id);
            return Ok(MotionOutput::empty());
        }
        match self.frame_size {
            Some(size) if size != frame.dimensions() => {
                log::warn!(
                    "Frame {} is {}x{}, expected {}x{}, skipping",
                    frame.frame_id,
                    frame.width(),
                    frame.height(),
                    size.0,
                    size.1
                );
                return Ok(MotionOutput::empty());
            }
            Some(_) => {}
            None => self.frame_size = Some(frame.dimensions()),
        }

        let gray = grayscale(&frame.image);
        let raw = self.background.update(&gray);
        let mask = self.clean_mask(&raw);

        let candidates = component_boxes(&mask, self.config.min_area);
        let kept = non_max_suppression_fast(
            &candidates,
            self.config.nms_threshold,
            self.config.overlap_metric,
        );
        let boxes: Vec<Region> = kept.iter().map(Region::from_bbox).collect();

        log::debug!(
            "Frame {}: {} components, {} boxes after NMS",
            frame.frame_id,
            candidates.len(),
            boxes.len()
        );

        Ok(MotionOutput { boxes, mask })
    }

    /// Drop the background model's state and the established frame geometry
    pub fn reset(&mut self) {
        self.background.reset();
        self.frame_size = None;
        self.last_frame_id = None;
    }

    /// Erode away speckle, then dilate to reconnect fragments
    fn clean_mask(&self, mask: &GrayImage) -> GrayImage {
        let eroded = match self.config.erode_radius {
            0 => mask.clone(),
            r => erode(mask, Norm::LInf, r),
        };
        match self.config.dilate_radius {
            0 => eroded,
            r => dilate(&eroded, Norm::LInf, r),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Extent {
    xmin: u32,
    ymin: u32,
    xmax: u32,
    ymax: u32,
    pixels: u64,
}

impl Extent {
    fn at(x: u32, y: u32) -> Self {
        Self {
            xmin: x,
            ymin: y,
            xmax: x,
            ymax: y,
            pixels: 1,
        }
    }

    fn include(&mut self, x: u32, y: u32) {
        self.xmin = self.xmin.min(x);
        self.ymin = self.ymin.min(y);
        self.xmax = self.xmax.max(x);
        self.ymax = self.ymax.max(y);
        self.pixels += 1;
    }

    fn to_bbox(self) -> Bbox<f32> {
        Bbox::new(
            self.xmin as f32,
            self.ymin as f32,
            (self.xmax + 1) as f32,
            (self.ymax + 1) as f32,
        )
    }
}

/// Enclosing rectangles of the 8-connected foreground components of `mask`
/// covering at least `min_area` pixels
pub fn component_boxes(mask: &GrayImage, min_area: u32) -> Vec<Bbox<f32>> {
    let labels = connected_components(mask, Connectivity::Eight, Luma([0u8]));

    let mut extents: Vec<Option<Extent>> = Vec::new();
    for (x, y, label) in labels.enumerate_pixels() {
        let id = label.0[0] as usize;
        if id == 0 {
            continue;
        }
        if extents.len() < id {
            extents.resize(id, None);
        }
        match &mut extents[id - 1] {
            Some(extent) => extent.include(x, y),
            slot => *slot = Some(Extent::at(x, y)),
        }
    }

    extents
        .into_iter()
        .flatten()
        .filter(|e| e.pixels >= min_area as u64)
        .map(Extent::to_bbox)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{BackgroundConfig, BackgroundKind};
    use image::{Rgb, RgbImage};

    fn frame(frame_id: u64, squares: &[(u32, u32, u32)]) -> Frame {
        let mut img = RgbImage::from_pixel(64, 48, Rgb([100, 100, 100]));
        for &(x, y, size) in squares {
            for py in y..y + size {
                for px in x..x + size {
                    img.put_pixel(px, py, Rgb([250, 250, 250]));
                }
            }
        }
        Frame::new(frame_id, img)
    }

    fn warmed_detector(config: MotionConfig) -> MotionDetector {
        let mut detector = MotionDetector::new(config).unwrap();
        for i in 0..10 {
            detector.detect(&frame(i, &[])).unwrap();
        }
        detector
    }

    #[test]
    fn test_square_found_after_warmup() {
        let mut detector = warmed_detector(MotionConfig::default());
        let out = detector.detect(&frame(10, &[(20, 20, 10)])).unwrap();
        assert_eq!(out.boxes.len(), 1);
        let b = out.boxes[0];
        assert!(b.x <= 20 && b.y <= 20);
        assert!(b.x + b.width >= 30 && b.y + b.height >= 30);
        assert_eq!(out.mask.dimensions(), (64, 48));
    }

    #[test]
    fn test_static_scene_has_no_boxes() {
        let mut detector = warmed_detector(MotionConfig::default());
        let out = detector.detect(&frame(10, &[])).unwrap();
        assert!(out.boxes.is_empty());
    }

    #[test]
    fn test_speckle_removed_by_erosion() {
        let mut detector = warmed_detector(MotionConfig::default());
        let out = detector.detect(&frame(10, &[(5, 5, 1)])).unwrap();
        assert!(out.boxes.is_empty());
    }

    #[test]
    fn test_separate_squares_give_separate_boxes() {
        let mut detector = warmed_detector(MotionConfig::default());
        let out = detector
            .detect(&frame(10, &[(4, 4, 8), (44, 30, 8)]))
            .unwrap();
        assert_eq!(out.boxes.len(), 2);
    }

    #[test]
    fn test_min_area_filter() {
        let config = MotionConfig {
            erode_radius: 0,
            dilate_radius: 0,
            min_area: 16,
            background: BackgroundConfig {
                kind: BackgroundKind::FrameDifference,
                ..Default::default()
            },
            ..Default::default()
        };
        let mut detector = warmed_detector(config);
        let out = detector
            .detect(&frame(10, &[(4, 4, 3), (30, 30, 5)]))
            .unwrap();
        assert_eq!(out.boxes, vec![Region::new(30, 30, 5, 5)]);
    }

    #[test]
    fn test_out_of_order_frame_rejected() {
        let mut detector = MotionDetector::new(MotionConfig::default()).unwrap();
        detector.detect(&frame(5, &[])).unwrap();
        let err = detector.detect(&frame(5, &[])).unwrap_err();
        assert!(matches!(
            err,
            OffloadError::SequenceViolation { last: 5, got: 5 }
        ));
        assert!(detector.detect(&frame(3, &[])).is_err());
        assert!(detector.detect(&frame(6, &[])).is_ok());
    }

    #[test]
    fn test_malformed_frames_skipped() {
        let mut detector = warmed_detector(MotionConfig::default());
        let empty = Frame::new(10, RgbImage::new(0, 0));
        assert!(detector.detect(&empty).unwrap().boxes.is_empty());

        let resized = Frame::new(11, RgbImage::from_pixel(32, 32, Rgb([250, 250, 250])));
        let out = detector.detect(&resized).unwrap();
        assert!(out.boxes.is_empty());
        assert_eq!(out.mask.dimensions(), (0, 0));

        // the model was not disturbed by the odd frames
        assert!(detector.detect(&frame(12, &[])).unwrap().boxes.is_empty());
    }

    #[test]
    fn test_reset_allows_restart() {
        let mut detector = warmed_detector(MotionConfig::default());
        detector.reset();
        assert!(detector.detect(&frame(0, &[])).is_ok());
        assert_eq!(detector.background_name(), "mog");
    }

    #[test]
    fn test_diagonal_pixels_join() {
        let mut mask = GrayImage::new(8, 8);
        for i in 0..5 {
            mask.put_pixel(i, i, Luma([255]));
        }
        mask.put_pixel(7, 0, Luma([255]));
        let boxes = component_boxes(&mask, 1);
        assert_eq!(boxes.len(), 2);
        assert!(boxes.contains(&Bbox::new(0.0, 0.0, 5.0, 5.0)));
        assert!(boxes.contains(&Bbox::new(7.0, 0.0, 8.0, 1.0)));
        assert_eq!(component_boxes(&mask, 2).len(), 1);
    }
}
