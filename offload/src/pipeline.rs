/// Offloading pipeline: filter stage, region crops, detector, frame-level boxes
use crate::config::FilterConfig;
use crate::detector::Detector;
use crate::error::Result;
use crate::filter::{Filter, FilterStage};
use crate::types::{Frame, Region};
use image::imageops::crop_imm;
use ioueval::BoundingBox;
use serde::Serialize;
use std::time::Instant;

/// Counters and timing for one pipeline run
#[derive(Clone, Debug, Default, Serialize)]
pub struct PipelineStats {
    pub frames: u64,
    /// Frames that produced at least one region
    pub offloaded_frames: u64,
    pub regions: u64,
    pub detector_calls: u64,
    pub detections: u64,
    pub filter_ms: f32,
    pub detector_ms: f32,
}

impl PipelineStats {
    /// Share of frames that reached the detector
    pub fn offload_ratio(&self) -> f64 {
        if self.frames == 0 {
            0.0
        } else {
            self.offloaded_frames as f64 / self.frames as f64
        }
    }
}

/// Runs one offloading method over a video.
///
/// Each frame goes through the filter; every region it returns is cropped,
/// handed to the detector, and the detections are translated back into
/// frame coordinates and tagged with the frame id and method name.
pub struct OffloadPipeline<D: Detector> {
    method: String,
    filter: Filter,
    detector: D,
    stats: PipelineStats,
    finished: bool,
}

impl<D: Detector> OffloadPipeline<D> {
    pub fn new(method: impl Into<String>, filter: Filter, detector: D) -> Self {
        Self {
            method: method.into(),
            filter,
            detector,
            stats: PipelineStats::default(),
            finished: false,
        }
    }

    pub fn from_config(method: impl Into<String>, config: &FilterConfig, detector: D) -> Result<Self> {
        let filter = Filter::from_config(config)?;
        Ok(Self::new(method, filter, detector))
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn stats(&self) -> &PipelineStats {
        &self.stats
    }

    /// Filter, detect and collect boxes for one frame
    pub fn process(&mut self, frame: &Frame) -> Result<Vec<BoundingBox>> {
        let filter_start = Instant::now();
        let regions = self.filter.filter(frame)?;
        self.stats.filter_ms += filter_start.elapsed().as_secs_f32() * 1000.0;
        self.stats.frames += 1;

        let (width, height) = frame.dimensions();
        let regions: Vec<Region> = regions
            .iter()
            .map(|r| r.clamp_to(width, height))
            .filter(|r| !r.is_empty())
            .collect();
        if regions.is_empty() {
            return Ok(Vec::new());
        }
        self.stats.offloaded_frames += 1;
        self.stats.regions += regions.len() as u64;

        let mut boxes = Vec::new();
        for region in &regions {
            let crop = crop_imm(&frame.image, region.x, region.y, region.width, region.height)
                .to_image();

            let detect_start = Instant::now();
            let detections = self.detector.infer(&crop)?;
            self.stats.detector_ms += detect_start.elapsed().as_secs_f32() * 1000.0;
            self.stats.detector_calls += 1;

            for det in detections {
                let bbox = det.bbox.translate(region.x as f32, region.y as f32);
                if !bbox.is_valid() {
                    log::debug!("Dropping invalid detection {} in frame {}", bbox, frame.frame_id);
                    continue;
                }
                boxes.push(BoundingBox::detection(
                    frame.frame_id,
                    self.method.as_str(),
                    det.label,
                    det.score,
                    bbox,
                ));
            }
        }

        self.stats.detections += boxes.len() as u64;
        log::debug!(
            "Frame {}: {} regions, {} detections",
            frame.frame_id,
            regions.len(),
            boxes.len()
        );
        Ok(boxes)
    }

    /// Drain `source` and finish the filter. The filter's epilogue runs even
    /// when a frame fails.
    pub fn run<I>(&mut self, source: I) -> Result<Vec<BoundingBox>>
    where
        I: IntoIterator<Item = Frame>,
    {
        let mut all = Vec::new();
        for frame in source {
            match self.process(&frame) {
                Ok(boxes) => all.extend(boxes),
                Err(e) => {
                    log::error!("Method {} failed on frame {}: {}", self.method, frame.frame_id, e);
                    self.finish();
                    return Err(e);
                }
            }
        }
        self.finish();
        Ok(all)
    }

    /// Signal the end of the video; later calls are no-ops
    pub fn finish(&mut self) -> &PipelineStats {
        if !self.finished {
            self.finished = true;
            self.filter.epilogue();
            log::info!(
                "Method {} ({} filter, {} detector): {} frames, {} offloaded, {} regions, {} detector calls, {} detections, filter {:.1}ms, detector {:.1}ms",
                self.method,
                self.filter.name(),
                self.detector.name(),
                self.stats.frames,
                self.stats.offloaded_frames,
                self.stats.regions,
                self.stats.detector_calls,
                self.stats.detections,
                self.stats.filter_ms,
                self.stats.detector_ms
            );
        }
        &self.stats
    }
}
