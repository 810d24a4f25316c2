//! Object detector interface consumed by the offloading pipeline
//!
//! The pipeline works with any detector as long as it implements this
//! interface; plain closures do.

use crate::error::Result;
use crate::types::Detection;
use image::RgbImage;

/// Common interface for object detectors
pub trait Detector: Send {
    /// Detect objects in one image, boxes in that image's coordinates
    fn infer(&mut self, image: &RgbImage) -> Result<Vec<Detection>>;

    /// Detector name for logging
    fn name(&self) -> &str;
}

impl<F> Detector for F
where
    F: FnMut(&RgbImage) -> Result<Vec<Detection>> + Send,
{
    fn infer(&mut self, image: &RgbImage) -> Result<Vec<Detection>> {
        self(image)
    }

    fn name(&self) -> &str {
        "closure"
    }
}

/// Named wrapper around a detection function
pub struct FnDetector<F> {
    name: String,
    infer: F,
}

impl<F> FnDetector<F>
where
    F: FnMut(&RgbImage) -> Result<Vec<Detection>> + Send,
{
    pub fn new(name: impl Into<String>, infer: F) -> Self {
        Self {
            name: name.into(),
            infer,
        }
    }
}

impl<F> Detector for FnDetector<F>
where
    F: FnMut(&RgbImage) -> Result<Vec<Detection>> + Send,
{
    fn infer(&mut self, image: &RgbImage) -> Result<Vec<Detection>> {
        (self.infer)(image)
    }

    fn name(&self) -> &str {
        &self.name
    }
}
