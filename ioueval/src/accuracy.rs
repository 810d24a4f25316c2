//! Per-method, per-class accumulation of match counts

use crate::matcher::MatchResult;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Mutex};

/// Running TP/FP/FN counts for one (method, class) key
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchCounts {
    pub tp: u64,
    pub fp: u64,
    pub fn_: u64,
}

impl MatchCounts {
    pub fn add(&mut self, other: MatchCounts) {
        self.tp += other.tp;
        self.fp += other.fp;
        self.fn_ += other.fn_;
    }

    /// TP / (TP + FP), 0 when there are no true positives
    pub fn precision(&self) -> f64 {
        if self.tp == 0 {
            0.0
        } else {
            self.tp as f64 / (self.tp + self.fp) as f64
        }
    }

    /// TP / (TP + FN), 0 when there are no true positives
    pub fn recall(&self) -> f64 {
        if self.tp == 0 {
            0.0
        } else {
            self.tp as f64 / (self.tp + self.fn_) as f64
        }
    }
}

impl From<&MatchResult> for MatchCounts {
    fn from(result: &MatchResult) -> Self {
        Self {
            tp: result.tp.len() as u64,
            fp: result.fp.len() as u64,
            fn_: result.fn_.len() as u64,
        }
    }
}

/// Metric names used in the accuracy summary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Metric {
    #[serde(rename = "TP")]
    TruePositives,
    #[serde(rename = "FP")]
    FalsePositives,
    #[serde(rename = "FN")]
    FalseNegatives,
    #[serde(rename = "precision")]
    Precision,
    #[serde(rename = "recall")]
    Recall,
}

impl Metric {
    pub const ALL: [Metric; 5] = [
        Metric::TruePositives,
        Metric::FalsePositives,
        Metric::FalseNegatives,
        Metric::Precision,
        Metric::Recall,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::TruePositives => "TP",
            Self::FalsePositives => "FP",
            Self::FalseNegatives => "FN",
            Self::Precision => "precision",
            Self::Recall => "recall",
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Finalized counts and ratios for one key
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccuracySummary {
    pub method: String,
    pub label: String,
    pub counts: MatchCounts,
    pub precision: f64,
    pub recall: f64,
}

impl AccuracySummary {
    pub fn value(&self, metric: Metric) -> f64 {
        match metric {
            Metric::TruePositives => self.counts.tp as f64,
            Metric::FalsePositives => self.counts.fp as f64,
            Metric::FalseNegatives => self.counts.fn_ as f64,
            Metric::Precision => self.precision,
            Metric::Recall => self.recall,
        }
    }
}

/// One `{method, label, metric, value}` row of the summary table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricRow {
    pub method: String,
    pub label: String,
    pub metric: Metric,
    pub value: f64,
}

/// Output of [`AccuracyAggregator::finalize`], ordered by method then label
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AccuracyTable {
    pub summaries: Vec<AccuracySummary>,
}

impl AccuracyTable {
    pub fn get(&self, method: &str, label: &str) -> Option<&AccuracySummary> {
        self.summaries
            .iter()
            .find(|s| s.method == method && s.label == label)
    }

    /// Long-format rows, five per key
    pub fn rows(&self) -> Vec<MetricRow> {
        self.summaries
            .iter()
            .flat_map(|s| {
                Metric::ALL.iter().map(move |m| MetricRow {
                    method: s.method.clone(),
                    label: s.label.clone(),
                    metric: *m,
                    value: s.value(*m),
                })
            })
            .collect()
    }
}

/// Accumulates counts keyed strictly by (method, class).
///
/// Owned by whoever drives the evaluation; independent videos or methods use
/// independent aggregators and combine them with [`merge`](Self::merge).
#[derive(Debug, Clone, Default)]
pub struct AccuracyAggregator {
    counts: BTreeMap<(String, String), MatchCounts>,
}

impl AccuracyAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make sure `(method, class)` is reported even if it never scores.
    pub fn register(&mut self, method: &str, class: &str) {
        self.counts
            .entry((method.to_string(), class.to_string()))
            .or_default();
    }

    pub fn accumulate(&mut self, method: &str, class: &str, result: &MatchResult) {
        self.add_counts(method, class, MatchCounts::from(result));
    }

    pub fn add_counts(&mut self, method: &str, class: &str, counts: MatchCounts) {
        self.counts
            .entry((method.to_string(), class.to_string()))
            .or_default()
            .add(counts);
    }

    pub fn counts(&self, method: &str, class: &str) -> Option<MatchCounts> {
        self.counts
            .get(&(method.to_string(), class.to_string()))
            .copied()
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Fold another aggregator's counts into this one
    pub fn merge(&mut self, other: AccuracyAggregator) {
        for ((method, class), counts) in other.counts {
            self.counts.entry((method, class)).or_default().add(counts);
        }
    }

    pub fn finalize(&self) -> AccuracyTable {
        let summaries = self
            .counts
            .iter()
            .map(|((method, label), counts)| AccuracySummary {
                method: method.clone(),
                label: label.clone(),
                counts: *counts,
                precision: counts.precision(),
                recall: counts.recall(),
            })
            .collect();
        AccuracyTable { summaries }
    }
}

/// Aggregator shared between worker threads
#[derive(Debug, Clone, Default)]
pub struct SharedAccuracy {
    inner: Arc<Mutex<AccuracyAggregator>>,
}

impl SharedAccuracy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn accumulate(&self, method: &str, class: &str, result: &MatchResult) {
        let counts = MatchCounts::from(result);
        // A poisoned lock still holds consistent counts: every update is a
        // single add on one entry.
        let mut guard = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        guard.add_counts(method, class, counts);
    }

    pub fn finalize(&self) -> AccuracyTable {
        let guard = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        guard.finalize()
    }

    /// Take the accumulated counts, leaving an empty aggregator behind
    pub fn take(&self) -> AccuracyAggregator {
        let mut guard = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        std::mem::take(&mut *guard)
    }
}
