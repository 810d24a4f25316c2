/// Offloading methods compared on a synthetic video
///
/// Renders a scene with two people walking across a static background, runs
/// it through the full-frame method and the motion-gated methods ("mog",
/// "mean", "diff") with a toy detector that reports bright blobs, and scores
/// every method against the known positions.
///
/// Usage:
///   cargo run --release --example offload_video [output_dir] [warmup]
///
/// Writes per-frame detection files for each method and `accuracy.csv` to
/// `output_dir` (default: a directory under the system temp dir).
use anyhow::Context;
use edge_offload::{
    BackgroundConfig, BackgroundKind, Detection, FilterConfig, Frame, MotionConfig,
    OffloadPipeline,
};
use image::{GrayImage, Luma, Rgb, RgbImage};
use imageproc::region_labelling::{connected_components, Connectivity};
use ioueval::export::{write_accuracy_summary, write_frame_detections, write_ground_truth};
use ioueval::{evaluate_video, Bbox, BoundingBox, EvaluationConfig};
use std::env;
use std::path::PathBuf;

const WIDTH: u32 = 320;
const HEIGHT: u32 = 180;
const FRAMES: u64 = 200;

/// (x, y, width, height) of each walker in `frame_id`
fn walkers(frame_id: u64) -> Vec<(u32, u32, u32, u32)> {
    let t = frame_id as u32;
    vec![
        (10 + (t * 2) % (WIDTH - 40), 40, 14, 36),
        (WIDTH - 30 - (t * 3) % (WIDTH - 40), 110, 16, 40),
    ]
}

fn render(frame_id: u64) -> Frame {
    let mut img = RgbImage::from_fn(WIDTH, HEIGHT, |x, y| {
        // static textured background
        let v = 70 + ((x / 16 + y / 16) % 2) as u8 * 20;
        Rgb([v, v, v])
    });
    for (x, y, w, h) in walkers(frame_id) {
        for py in y..(y + h).min(HEIGHT) {
            for px in x..(x + w).min(WIDTH) {
                img.put_pixel(px, py, Rgb([235, 225, 210]));
            }
        }
    }
    Frame::new(frame_id, img)
}

fn ground_truth() -> Vec<BoundingBox> {
    (0..FRAMES)
        .flat_map(|frame_id| {
            walkers(frame_id).into_iter().map(move |(x, y, w, h)| {
                BoundingBox::ground_truth(
                    frame_id,
                    "person",
                    Bbox::from_xywh(x as f32, y as f32, w as f32, h as f32),
                )
            })
        })
        .collect()
}

/// Toy detector: every connected bright blob is a person
fn bright_blobs(crop: &RgbImage) -> edge_offload::Result<Vec<Detection>> {
    let bright = GrayImage::from_fn(crop.width(), crop.height(), |x, y| {
        Luma([if crop.get_pixel(x, y).0[0] > 200 { 255 } else { 0 }])
    });
    let labels = connected_components(&bright, Connectivity::Eight, Luma([0u8]));

    let mut extents: Vec<(u32, u32, u32, u32)> = Vec::new();
    for (x, y, label) in labels.enumerate_pixels() {
        let id = label.0[0] as usize;
        if id == 0 {
            continue;
        }
        if extents.len() < id {
            extents.resize(id, (u32::MAX, u32::MAX, 0, 0));
        }
        let e = &mut extents[id - 1];
        *e = (e.0.min(x), e.1.min(y), e.2.max(x), e.3.max(y));
    }

    Ok(extents
        .into_iter()
        .filter(|e| e.0 != u32::MAX)
        .map(|(x0, y0, x1, y1)| {
            Detection::new(
                "person",
                0.9,
                Bbox::new(x0 as f32, y0 as f32, (x1 + 1) as f32, (y1 + 1) as f32),
            )
        })
        .collect())
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = env::args().collect();
    let out_dir = args
        .get(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| env::temp_dir().join("edge-offload-demo"));
    let warmup: u64 = match args.get(2) {
        Some(w) => w.parse().context("warmup must be a frame count")?,
        None => 30,
    };

    let mut methods = vec![("full_frame".to_string(), FilterConfig::passthrough())];
    for kind in [
        BackgroundKind::GaussianMixture,
        BackgroundKind::RunningAverage,
        BackgroundKind::FrameDifference,
    ] {
        let motion = MotionConfig {
            background: BackgroundConfig {
                kind,
                ..Default::default()
            },
            ..Default::default()
        };
        methods.push((
            kind.method_name().to_string(),
            FilterConfig::motion_gated(warmup, motion),
        ));
    }

    let mut detections = Vec::new();
    for (method, config) in &methods {
        let mut pipeline = OffloadPipeline::from_config(method.as_str(), config, bright_blobs)?;
        detections.extend(pipeline.run((0..FRAMES).map(render))?);
        let stats = pipeline.stats();
        println!(
            "{:>10}: {:>3}/{} frames offloaded ({:.0}%), {} detector calls",
            method,
            stats.offloaded_frames,
            stats.frames,
            stats.offload_ratio() * 100.0,
            stats.detector_calls
        );
    }

    let truth = ground_truth();
    let eval_config = EvaluationConfig {
        methods: methods.iter().map(|(m, _)| m.clone()).collect(),
        start_frame: warmup,
        ..Default::default()
    };
    let table = evaluate_video(&detections, &truth, &eval_config)?.finalize();

    println!();
    println!("{:>10} {:>6} {:>5} {:>5} {:>9} {:>7}", "method", "TP", "FP", "FN", "precision", "recall");
    for s in &table.summaries {
        println!(
            "{:>10} {:>6} {:>5} {:>5} {:>9.3} {:>7.3}",
            s.method, s.counts.tp, s.counts.fp, s.counts.fn_, s.precision, s.recall
        );
    }

    write_frame_detections(out_dir.join("detections"), &detections)?;
    write_ground_truth(out_dir.join("ground_truth"), &truth)?;
    write_accuracy_summary(out_dir.join("accuracy.csv"), &table)?;
    println!("\nResults written to {}", out_dir.display());

    Ok(())
}
