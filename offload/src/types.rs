//! Frame, region and detection types

use image::RgbImage;
use ioueval::Bbox;
use serde::{Deserialize, Serialize};

/// Decoded frame with its position in the video
#[derive(Debug, Clone)]
pub struct Frame {
    pub frame_id: u64,
    pub image: RgbImage,
}

impl Frame {
    pub fn new(frame_id: u64, image: RgbImage) -> Self {
        Self { frame_id, image }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    /// Zero width or height
    pub fn is_empty(&self) -> bool {
        self.width() == 0 || self.height() == 0
    }
}

/// Region of a frame in pixel coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Region {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Region {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// The whole frame as one region
    pub fn full(frame: &Frame) -> Self {
        Self::new(0, 0, frame.width(), frame.height())
    }

    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Corner form, `xmax`/`ymax` exclusive
    pub fn to_bbox(&self) -> Bbox<f32> {
        Bbox::new(
            self.x as f32,
            self.y as f32,
            self.x.saturating_add(self.width) as f32,
            self.y.saturating_add(self.height) as f32,
        )
    }

    /// Smallest pixel region covering `bbox`, clamped at the origin
    pub fn from_bbox(bbox: &Bbox<f32>) -> Self {
        let x = bbox.xmin.max(0.0).floor() as u32;
        let y = bbox.ymin.max(0.0).floor() as u32;
        let xmax = bbox.xmax.max(0.0).ceil() as u32;
        let ymax = bbox.ymax.max(0.0).ceil() as u32;
        Self::new(x, y, xmax.saturating_sub(x), ymax.saturating_sub(y))
    }

    /// Intersection with a `width` x `height` frame
    pub fn clamp_to(&self, width: u32, height: u32) -> Self {
        let x = self.x.min(width);
        let y = self.y.min(height);
        let xmax = self.x.saturating_add(self.width).min(width);
        let ymax = self.y.saturating_add(self.height).min(height);
        Self::new(x, y, xmax - x, ymax - y)
    }
}

/// One detector output, in the coordinates of the image it was given
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub bbox: Bbox<f32>,
    pub label: String,
    /// Confidence in [0, 1]
    pub score: f32,
}

impl Detection {
    pub fn new(label: impl Into<String>, score: f32, bbox: Bbox<f32>) -> Self {
        Self {
            bbox,
            label: label.into(),
            score,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_region_bbox_conversion() {
        let r = Region::new(4, 6, 10, 3);
        let b = r.to_bbox();
        assert_eq!(b, Bbox::new(4.0, 6.0, 14.0, 9.0));
        assert_eq!(Region::from_bbox(&b), r);
    }

    #[test]
    fn test_region_bbox_saturates() {
        let b = Region::new(u32::MAX - 1, 3, 10, u32::MAX).to_bbox();
        assert_eq!(b.xmax, u32::MAX as f32);
        assert_eq!(b.ymax, u32::MAX as f32);
    }

    #[test]
    fn test_region_from_fractional_bbox() {
        let r = Region::from_bbox(&Bbox::new(-2.0, 1.5, 3.2, 4.0));
        assert_eq!(r, Region::new(0, 1, 4, 3));
    }

    #[test]
    fn test_region_clamp() {
        let r = Region::new(90, 50, 20, 20).clamp_to(100, 60);
        assert_eq!(r, Region::new(90, 50, 10, 10));
        assert!(Region::new(120, 0, 5, 5).clamp_to(100, 60).is_empty());
    }

    #[test]
    fn test_full_region() {
        let frame = Frame::new(0, RgbImage::new(32, 24));
        assert_eq!(Region::full(&frame), Region::new(0, 0, 32, 24));
        assert!(Frame::new(1, RgbImage::new(0, 24)).is_empty());
    }
}
