/// Score stored detections against ground truth
///
/// Usage:
///   cargo run --release --example score_detections <ground_truth> <detections.csv> [summary.csv] [config.json]
///
/// `<ground_truth>` is either a VIRAT `*.viratdata.objects.txt` file or a CSV
/// with `frame_id,label,xmin,ymin,xmax,ymax` columns. The detection table needs
/// `frame_id,method,label,score,xmin,ymin,xmax,ymax`. The optional JSON config
/// overrides the evaluated methods, classes, start frame and IoU threshold.
use anyhow::{bail, Context};
use ioueval::dataset::{read_boxes_csv, read_virat_annotations};
use ioueval::export::write_accuracy_summary;
use ioueval::{evaluate_video, EvaluationConfig};
use std::env;
use std::fs;

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = env::args().collect();
    if args.len() < 3 {
        bail!(
            "usage: {} <ground_truth> <detections.csv> [summary.csv] [config.json]",
            args[0]
        );
    }

    let truth = if args[1].ends_with(".csv") {
        read_boxes_csv(&args[1])
    } else {
        read_virat_annotations(&args[1])
    }
    .with_context(|| format!("reading ground truth {}", args[1]))?;
    let detections =
        read_boxes_csv(&args[2]).with_context(|| format!("reading detections {}", args[2]))?;

    let config: EvaluationConfig = match args.get(4) {
        Some(path) => serde_json::from_str(&fs::read_to_string(path)?)
            .with_context(|| format!("parsing {}", path))?,
        None => EvaluationConfig::default(),
    };

    let table = evaluate_video(&detections, &truth, &config)?.finalize();
    for s in &table.summaries {
        println!(
            "{:<12} {:<8} TP {:>6} FP {:>6} FN {:>6}  precision {:.3}  recall {:.3}",
            s.method, s.label, s.counts.tp, s.counts.fp, s.counts.fn_, s.precision, s.recall
        );
    }

    if let Some(out) = args.get(3) {
        write_accuracy_summary(out, &table)?;
    }
    Ok(())
}
