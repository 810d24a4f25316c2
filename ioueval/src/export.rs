//! Writers for the on-disk files consumed by external mAP tooling

use crate::accuracy::AccuracyTable;
use crate::error::Result;
use crate::types::BoundingBox;
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Write one `<frame_id>.txt` per frame under `<root>/<method>/`.
///
/// Each row is `label score xmin ymin width height`, space separated.
/// Boxes without a method, label or score cannot be represented and are
/// skipped. Returns the directories written, one per method.
pub fn write_frame_detections(
    root: impl AsRef<Path>,
    boxes: &[BoundingBox],
) -> Result<Vec<PathBuf>> {
    let mut by_method: BTreeMap<&str, BTreeMap<u64, Vec<&BoundingBox>>> = BTreeMap::new();
    let mut skipped = 0usize;

    for b in boxes {
        match (b.method.as_deref(), &b.label, b.score) {
            (Some(method), Some(_), Some(_)) => by_method
                .entry(method)
                .or_default()
                .entry(b.frame_id)
                .or_default()
                .push(b),
            _ => skipped += 1,
        }
    }
    if skipped > 0 {
        log::warn!("Skipped {} boxes without method, label or score", skipped);
    }

    let mut written = Vec::with_capacity(by_method.len());
    for (method, frames) in by_method {
        let dir = root.as_ref().join(method);
        fs::create_dir_all(&dir)?;

        for (frame_id, frame_boxes) in frames {
            let mut out = BufWriter::new(File::create(dir.join(format!("{}.txt", frame_id)))?);
            for b in frame_boxes {
                writeln!(
                    out,
                    "{} {} {} {} {} {}",
                    b.label.as_deref().unwrap_or_default(),
                    b.score.unwrap_or_default(),
                    b.bbox.xmin,
                    b.bbox.ymin,
                    b.bbox.width(),
                    b.bbox.height()
                )?;
            }
            out.flush()?;
        }

        log::debug!("Wrote detections for method {} to {}", method, dir.display());
        written.push(dir);
    }

    Ok(written)
}

/// Write ground truth as `<dir>/<frame_id>.txt` with rows
/// `label xmin ymin width height`.
pub fn write_ground_truth(dir: impl AsRef<Path>, boxes: &[BoundingBox]) -> Result<usize> {
    let dir = dir.as_ref();
    fs::create_dir_all(dir)?;

    let mut frames: BTreeMap<u64, Vec<&BoundingBox>> = BTreeMap::new();
    for b in boxes.iter().filter(|b| b.label.is_some()) {
        frames.entry(b.frame_id).or_default().push(b);
    }

    for (frame_id, frame_boxes) in &frames {
        let mut out = BufWriter::new(File::create(dir.join(format!("{}.txt", frame_id)))?);
        for b in frame_boxes {
            writeln!(
                out,
                "{} {} {} {} {}",
                b.label.as_deref().unwrap_or_default(),
                b.bbox.xmin,
                b.bbox.ymin,
                b.bbox.width(),
                b.bbox.height()
            )?;
        }
        out.flush()?;
    }

    Ok(frames.len())
}

/// Write the long-format summary `method,label,metric,value`.
pub fn write_accuracy_summary(path: impl AsRef<Path>, table: &AccuracyTable) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let mut out = BufWriter::new(File::create(path)?);
    writeln!(out, "method,label,metric,value")?;
    for row in table.rows() {
        writeln!(out, "{},{},{},{}", row.method, row.label, row.metric, row.value)?;
    }
    out.flush()?;

    log::info!(
        "Wrote accuracy summary for {} keys to {}",
        table.summaries.len(),
        path.display()
    );
    Ok(())
}
