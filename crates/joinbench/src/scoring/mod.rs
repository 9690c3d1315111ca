//! Pluggable column-pair scoring strategies.
//!
//! Every strategy maps a column pair and the two value sets to a
//! [`ScoreResult`]. Value-overlap strategies ([`Jaccard`], [`Containment`])
//! look only at values; [`NameHeuristic`] looks only at names;
//! [`SparseFallback`] routes between them depending on how much data there
//! is to look at.

mod fallback;
mod heuristic;
mod overlap;

pub use fallback::SparseFallback;
pub use heuristic::{NameHeuristic, NameScore, REFERENCE_TOKENS, name_score};
pub use overlap::{Containment, Jaccard, containment, jaccard};

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::JoinBenchError;
use crate::schema::{ColumnRef, ValueSet};

/// Default decision threshold for value-overlap scores.
pub const DEFAULT_OVERLAP_THRESHOLD: f64 = 0.05;

/// Default decision threshold for the name heuristic.
pub const DEFAULT_NAME_THRESHOLD: f64 = 0.90;

/// Below this many distinct values on either side, value overlap is not
/// trusted and the name heuristic decides.
pub const SPARSE_MIN_DISTINCT: usize = 3;

/// Outcome of scoring one column pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreResult {
    pub label: bool,
    /// Always within `[0, 1]`.
    pub score: f64,
    pub explanation: String,
}

impl ScoreResult {
    /// Apply `threshold` to `score`.
    pub fn thresholded(score: f64, threshold: f64, explanation: impl Into<String>) -> Self {
        let score = score.clamp(0.0, 1.0);
        Self {
            label: score >= threshold,
            score,
            explanation: explanation.into(),
        }
    }

    /// Negative result for pairs with nothing to compare.
    pub fn no_values() -> Self {
        Self {
            label: false,
            score: 0.0,
            explanation: "no values".to_string(),
        }
    }
}

/// A column-pair scoring strategy.
///
/// Implementations must be pure and thread-safe.
pub trait PairScorer: Send + Sync {
    /// Short name for logs and run metadata.
    fn name(&self) -> &str;

    fn score(
        &self,
        left: &ColumnRef,
        a: &ValueSet,
        right: &ColumnRef,
        b: &ValueSet,
    ) -> ScoreResult;
}

/// Value-overlap method selectable from the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Method {
    Jaccard,
    Containment,
    /// Names only; values are ignored.
    Name,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Method::Jaccard => "jaccard",
            Method::Containment => "containment",
            Method::Name => "name",
        };
        f.write_str(s)
    }
}

impl FromStr for Method {
    type Err = JoinBenchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "jaccard" => Ok(Method::Jaccard),
            "containment" => Ok(Method::Containment),
            "name" | "heuristic" => Ok(Method::Name),
            other => Err(JoinBenchError::Config(format!("unknown method: {}", other))),
        }
    }
}

/// Configuration for building a scorer.
#[derive(Debug, Clone)]
pub struct ScoringConfig {
    /// Decision threshold for value-overlap scores.
    pub threshold: f64,
    /// Decision threshold for the name heuristic.
    pub name_threshold: f64,
    /// Route sparse pairs to the name heuristic.
    pub sparse_fallback: bool,
    /// Minimum distinct values per side before overlap is trusted.
    pub min_distinct: usize,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_OVERLAP_THRESHOLD,
            name_threshold: DEFAULT_NAME_THRESHOLD,
            sparse_fallback: true,
            min_distinct: SPARSE_MIN_DISTINCT,
        }
    }
}

impl ScoringConfig {
    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn with_sparse_fallback(mut self, enabled: bool) -> Self {
        self.sparse_fallback = enabled;
        self
    }
}

/// Build the scorer for `method`, wrapped in the sparse fallback when enabled.
pub fn build_scorer(method: Method, config: &ScoringConfig) -> Arc<dyn PairScorer> {
    let heuristic = NameHeuristic::new(config.name_threshold);
    match (method, config.sparse_fallback) {
        (Method::Name, _) => Arc::new(heuristic),
        (Method::Jaccard, true) => Arc::new(
            SparseFallback::new(Jaccard::new(config.threshold), heuristic)
                .with_min_distinct(config.min_distinct),
        ),
        (Method::Containment, true) => Arc::new(
            SparseFallback::new(Containment::new(config.threshold), heuristic)
                .with_min_distinct(config.min_distinct),
        ),
        (Method::Jaccard, false) => Arc::new(Jaccard::new(config.threshold)),
        (Method::Containment, false) => Arc::new(Containment::new(config.threshold)),
    }
}
