use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use edge_offload::{
    non_max_suppression_fast, BackgroundConfig, BackgroundKind, Frame, MotionConfig,
    MotionDetector, OverlapMetric,
};
use image::{Rgb, RgbImage};
use ioueval::Bbox;
use rand::prelude::*;

fn moving_square(frame_id: u64, width: u32, height: u32) -> Frame {
    let mut img = RgbImage::from_pixel(width, height, Rgb([80, 80, 80]));
    let x = (frame_id as u32 * 5) % (width - 40);
    for py in height / 3..height / 3 + 40 {
        for px in x..x + 40 {
            img.put_pixel(px, py, Rgb([220, 220, 220]));
        }
    }
    Frame::new(frame_id, img)
}

fn bench_motion_detection(c: &mut Criterion) {
    let mut group = c.benchmark_group("motion_detect_640x360");

    for kind in [
        BackgroundKind::FrameDifference,
        BackgroundKind::RunningAverage,
        BackgroundKind::GaussianMixture,
    ] {
        let config = MotionConfig {
            background: BackgroundConfig {
                kind,
                ..Default::default()
            },
            ..Default::default()
        };
        let frames: Vec<Frame> = (0..64).map(|i| moving_square(i, 640, 360)).collect();

        group.bench_with_input(
            BenchmarkId::from_parameter(kind.method_name()),
            &frames,
            |b, frames| {
                b.iter(|| {
                    let mut detector = MotionDetector::new(config.clone()).unwrap();
                    for frame in frames {
                        black_box(detector.detect(frame).unwrap());
                    }
                })
            },
        );
    }

    group.finish();
}

fn bench_nms(c: &mut Criterion) {
    let mut rng = thread_rng();
    let boxes: Vec<Bbox<f32>> = (0..200)
        .map(|_| {
            let x = rng.gen_range(0.0..600.0);
            let y = rng.gen_range(0.0..320.0);
            Bbox::new(x, y, x + rng.gen_range(5.0..60.0), y + rng.gen_range(5.0..60.0))
        })
        .collect();

    c.bench_function("nms_200_boxes", |b| {
        b.iter(|| non_max_suppression_fast(black_box(&boxes), 0.3, OverlapMetric::SmallerArea))
    });
}

criterion_group!(benches, bench_motion_detection, bench_nms);
criterion_main!(benches);
