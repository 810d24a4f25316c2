//! Readers for ground-truth annotations and stored detection tables

use crate::bbox::Bbox;
use crate::error::{EvalError, Result};
use crate::types::{BoundingBox, GROUND_TRUTH_METHOD};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// VIRAT object types 1..=5
const VIRAT_LABELS: [&str; 5] = ["person", "car", "vehicle", "object", "bike"];

/// Labels dropped from VIRAT ground truth before evaluation
const VIRAT_EXCLUDED: [&str; 2] = ["object", "bike"];

/// Load a VIRAT `*.viratdata.objects.txt` annotation file as ground truth.
pub fn read_virat_annotations(path: impl AsRef<Path>) -> Result<Vec<BoundingBox>> {
    let file = File::open(path.as_ref())?;
    let boxes = parse_virat_annotations(BufReader::new(file))?;
    log::info!(
        "Loaded {} ground-truth boxes from {}",
        boxes.len(),
        path.as_ref().display()
    );
    Ok(boxes)
}

/// Parse VIRAT object rows:
/// `object_id duration frame xmin ymin width height object_type`.
///
/// Rows with object type 0 (unknown) and the `object`/`bike` categories are
/// skipped.
pub fn parse_virat_annotations(reader: impl BufRead) -> Result<Vec<BoundingBox>> {
    let mut boxes = Vec::new();

    for (idx, line) in reader.lines().enumerate() {
        let line_no = idx + 1;
        let line = line?;
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.is_empty() {
            continue;
        }
        if fields.len() < 8 {
            return Err(EvalError::parse(
                line_no,
                format!("expected 8 columns, got {}", fields.len()),
            ));
        }

        let frame_id: u64 = parse_field(fields[2], line_no, "frame")?;
        let xmin: f32 = parse_field(fields[3], line_no, "xmin")?;
        let ymin: f32 = parse_field(fields[4], line_no, "ymin")?;
        let width: f32 = parse_field(fields[5], line_no, "width")?;
        let height: f32 = parse_field(fields[6], line_no, "height")?;
        let object_type: usize = parse_field(fields[7], line_no, "object_type")?;

        if object_type == 0 {
            continue;
        }
        let label = VIRAT_LABELS.get(object_type - 1).ok_or_else(|| {
            EvalError::parse(line_no, format!("unknown object type {}", object_type))
        })?;
        if VIRAT_EXCLUDED.contains(label) {
            continue;
        }

        boxes.push(BoundingBox::ground_truth(
            frame_id,
            *label,
            Bbox::from_xywh(xmin, ymin, width, height),
        ));
    }

    Ok(boxes)
}

/// Load a comma-separated box table with a header row.
///
/// Required columns: `frame_id, label, xmin, ymin, xmax, ymax`. Optional:
/// `method` and `score`. Extra columns (such as an index column) are
/// ignored; an empty score cell means "no score".
pub fn read_boxes_csv(path: impl AsRef<Path>) -> Result<Vec<BoundingBox>> {
    let file = File::open(path.as_ref())?;
    let boxes = parse_boxes_csv(BufReader::new(file))?;
    log::info!("Loaded {} boxes from {}", boxes.len(), path.as_ref().display());
    Ok(boxes)
}

pub fn parse_boxes_csv(reader: impl BufRead) -> Result<Vec<BoundingBox>> {
    let mut lines = reader.lines().enumerate();

    let header = match lines.next() {
        Some((_, line)) => line?,
        None => return Ok(Vec::new()),
    };
    let columns: HashMap<&str, usize> = header
        .split(',')
        .enumerate()
        .map(|(i, name)| (name.trim(), i))
        .collect();

    let required = |name: &str| {
        columns
            .get(name)
            .copied()
            .ok_or_else(|| EvalError::parse(1, format!("missing column '{}'", name)))
    };
    let frame_col = required("frame_id")?;
    let label_col = required("label")?;
    let xmin_col = required("xmin")?;
    let ymin_col = required("ymin")?;
    let xmax_col = required("xmax")?;
    let ymax_col = required("ymax")?;
    let method_col = columns.get("method").copied();
    let score_col = columns.get("score").copied();

    let mut boxes = Vec::new();
    for (idx, line) in lines {
        let line_no = idx + 1;
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let cells: Vec<&str> = line.split(',').map(str::trim).collect();
        let cell = |col: usize| {
            cells
                .get(col)
                .copied()
                .ok_or_else(|| EvalError::parse(line_no, format!("missing cell {}", col)))
        };

        // frame ids are sometimes stored as floats, e.g. `51.0`
        let frame_id: f64 = parse_field(cell(frame_col)?, line_no, "frame_id")?;
        let bbox = Bbox::new(
            parse_field(cell(xmin_col)?, line_no, "xmin")?,
            parse_field(cell(ymin_col)?, line_no, "ymin")?,
            parse_field(cell(xmax_col)?, line_no, "xmax")?,
            parse_field(cell(ymax_col)?, line_no, "ymax")?,
        );
        let label = cell(label_col)?;
        let method = match method_col {
            Some(col) => Some(cell(col)?.to_string()),
            None => Some(GROUND_TRUTH_METHOD.to_string()),
        };
        let score = match score_col.map(cell).transpose()? {
            Some(s) if !s.is_empty() => Some(parse_field::<f32>(s, line_no, "score")?),
            _ => None,
        };

        if !frame_id.is_finite() || frame_id < 0.0 || frame_id.fract() != 0.0 {
            return Err(EvalError::parse(
                line_no,
                format!("frame_id must be a non-negative integer, got {}", frame_id),
            ));
        }

        boxes.push(BoundingBox {
            bbox,
            label: (!label.is_empty()).then(|| label.to_string()),
            score,
            frame_id: frame_id as u64,
            method,
        });
    }

    Ok(boxes)
}

fn parse_field<T: std::str::FromStr>(value: &str, line: usize, name: &str) -> Result<T> {
    value
        .parse::<T>()
        .map_err(|_| EvalError::parse(line, format!("invalid {} '{}'", name, value)))
}
