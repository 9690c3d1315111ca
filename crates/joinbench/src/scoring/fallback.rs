//! Routing between value overlap and the name heuristic.

use tracing::trace;

use crate::schema::{ColumnRef, ValueSet};

use super::{NameHeuristic, PairScorer, SPARSE_MIN_DISTINCT, ScoreResult};

/// Scores with `inner` unless either side has fewer than `min_distinct`
/// values, in which case the name heuristic decides.
#[derive(Debug, Clone)]
pub struct SparseFallback<S> {
    inner: S,
    heuristic: NameHeuristic,
    min_distinct: usize,
    name: String,
}

impl<S: PairScorer> SparseFallback<S> {
    pub fn new(inner: S, heuristic: NameHeuristic) -> Self {
        let name = format!("{}+name", inner.name());
        Self {
            inner,
            heuristic,
            min_distinct: SPARSE_MIN_DISTINCT,
            name,
        }
    }

    pub fn with_min_distinct(mut self, min_distinct: usize) -> Self {
        self.min_distinct = min_distinct;
        self
    }

    fn is_sparse(&self, a: &ValueSet, b: &ValueSet) -> bool {
        a.len() < self.min_distinct || b.len() < self.min_distinct
    }
}

impl<S: PairScorer> PairScorer for SparseFallback<S> {
    fn name(&self) -> &str {
        &self.name
    }

    fn score(
        &self,
        left: &ColumnRef,
        a: &ValueSet,
        right: &ColumnRef,
        b: &ValueSet,
    ) -> ScoreResult {
        if self.is_sparse(a, b) {
            trace!(%left, %right, left_len = a.len(), right_len = b.len(), "sparse pair, scoring by name");
            return self.heuristic.score(left, a, right, b);
        }
        self.inner.score(left, a, right, b)
    }
}
