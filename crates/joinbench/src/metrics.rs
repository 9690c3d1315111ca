//! Benchmark metrics: pair classification, edge-level micro averages and
//! threshold sweeps.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::error::{JoinBenchError, Result};
use crate::schema::CandidateEdge;

/// Tolerance for the inclusive stop of a threshold range, in steps.
const RANGE_EPSILON: f64 = 1e-12;

/// Most values a threshold range may expand to.
pub const MAX_THRESHOLDS: usize = 10_000;

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 { 0.0 } else { num as f64 / den as f64 }
}

/// Precision, recall and F1 from raw counts; 0 where undefined.
pub fn prf(tp: usize, fp: usize, fn_: usize) -> (f64, f64, f64) {
    let precision = ratio(tp, tp + fp);
    let recall = ratio(tp, tp + fn_);
    let f1 = if precision + recall > 0.0 {
        2.0 * precision * recall / (precision + recall)
    } else {
        0.0
    };
    (precision, recall, f1)
}

/// Binary confusion counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Counts {
    pub tp: usize,
    pub fp: usize,
    #[serde(rename = "fn")]
    pub fn_: usize,
    pub tn: usize,
}

impl Counts {
    pub fn record(&mut self, gold: bool, pred: bool) {
        match (gold, pred) {
            (true, true) => self.tp += 1,
            (false, true) => self.fp += 1,
            (true, false) => self.fn_ += 1,
            (false, false) => self.tn += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.tp + self.fp + self.fn_ + self.tn
    }
}

/// Pair-classification metrics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairMetrics {
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub accuracy: f64,
    /// `[[tn, fp], [fn, tp]]`
    pub confusion_matrix: [[usize; 2]; 2],
    pub counts: Counts,
}

impl PairMetrics {
    pub fn from_counts(counts: Counts) -> Self {
        let (precision, recall, f1) = prf(counts.tp, counts.fp, counts.fn_);
        Self {
            precision,
            recall,
            f1,
            accuracy: ratio(counts.tp + counts.tn, counts.total().max(1)),
            confusion_matrix: [[counts.tn, counts.fp], [counts.fn_, counts.tp]],
            counts,
        }
    }

    /// Metrics over `(gold, predicted)` label pairs.
    pub fn from_labels(labels: impl IntoIterator<Item = (bool, bool)>) -> Self {
        let mut counts = Counts::default();
        for (gold, pred) in labels {
            counts.record(gold, pred);
        }
        Self::from_counts(counts)
    }
}

/// Edge counts summed over queries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeCounts {
    pub tp: usize,
    pub fp: usize,
    #[serde(rename = "fn")]
    pub fn_: usize,
}

impl EdgeCounts {
    /// Add one query's gold and predicted edges.
    pub fn record(&mut self, gold: &[CandidateEdge], pred: &[CandidateEdge]) {
        let gold: BTreeSet<&CandidateEdge> = gold.iter().collect();
        let pred: BTreeSet<&CandidateEdge> = pred.iter().collect();
        self.tp += gold.intersection(&pred).count();
        self.fp += pred.difference(&gold).count();
        self.fn_ += gold.difference(&pred).count();
    }
}

/// Micro-averaged edge metrics for query-level join prediction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeMetrics {
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub edge_counts: EdgeCounts,
}

impl EdgeMetrics {
    pub fn from_counts(edge_counts: EdgeCounts) -> Self {
        let (precision, recall, f1) = prf(edge_counts.tp, edge_counts.fp, edge_counts.fn_);
        Self {
            precision,
            recall,
            f1,
            edge_counts,
        }
    }
}

/// One row of a threshold sweep.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepRow {
    pub threshold: f64,
    #[serde(flatten)]
    pub metrics: PairMetrics,
}

/// The row with the highest F1; the earliest wins ties.
pub fn best_by_f1(rows: &[SweepRow]) -> Option<&SweepRow> {
    rows.iter()
        .fold(None, |best: Option<&SweepRow>, row| match best {
            Some(b) if b.metrics.f1 >= row.metrics.f1 => Some(b),
            _ => Some(row),
        })
}

/// Parse `"0.01,0.05,0.1"` or an inclusive range `"start:stop:step"`.
///
/// Range values are `start + i * step`, rounded to six decimals. A range
/// that would expand past [`MAX_THRESHOLDS`] values is rejected.
pub fn parse_thresholds(input: &str) -> Result<Vec<f64>> {
    let input = input.trim();
    let number = |s: &str| -> Result<f64> {
        s.trim()
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .ok_or_else(|| JoinBenchError::Config(format!("invalid threshold: {:?}", s)))
    };

    if input.contains(':') {
        let parts: Vec<&str> = input.split(':').collect();
        let [start, stop, step] = parts[..] else {
            return Err(JoinBenchError::Config(format!(
                "threshold range must be start:stop:step, got {:?}",
                input
            )));
        };
        let (start, stop, step) = (number(start)?, number(stop)?, number(step)?);
        if step <= 0.0 {
            return Err(JoinBenchError::Config("threshold step must be positive".to_string()));
        }
        let steps = ((stop - start) / step + RANGE_EPSILON).floor();
        if steps < 0.0 {
            return Ok(Vec::new());
        }
        if steps >= MAX_THRESHOLDS as f64 {
            return Err(JoinBenchError::Config(format!(
                "threshold range {:?} expands past {} values",
                input, MAX_THRESHOLDS
            )));
        }
        let values: Vec<f64> = (0..=steps as usize)
            .map(|i| ((start + i as f64 * step) * 1e6).round() / 1e6)
            .collect();
        return Ok(values);
    }

    input.split(',')
        .filter(|s| !s.trim().is_empty())
        .map(number)
        .collect()
}
