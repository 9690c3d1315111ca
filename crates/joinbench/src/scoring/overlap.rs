//! Value-overlap scores over distinct normalized values.

use crate::schema::{ColumnRef, ValueSet};

use super::{PairScorer, ScoreResult};

/// `|A∩B| / |A∪B|`; 0 when either set is empty.
pub fn jaccard(a: &ValueSet, b: &ValueSet) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    a.intersection_len(b) as f64 / a.union_len(b) as f64
}

/// `|A∩B| / min(|A|, |B|)`; 0 when either set is empty.
///
/// Never below [`jaccard`] for the same non-empty pair, since
/// `min(|A|, |B|) <= |A∪B|`.
pub fn containment(a: &ValueSet, b: &ValueSet) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    a.intersection_len(b) as f64 / a.len().min(b.len()) as f64
}

/// Jaccard similarity of the two value sets.
#[derive(Debug, Clone, Copy)]
pub struct Jaccard {
    pub threshold: f64,
}

impl Jaccard {
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }
}

impl PairScorer for Jaccard {
    fn name(&self) -> &str {
        "jaccard"
    }

    fn score(
        &self,
        _left: &ColumnRef,
        a: &ValueSet,
        _right: &ColumnRef,
        b: &ValueSet,
    ) -> ScoreResult {
        if a.is_empty() || b.is_empty() {
            return ScoreResult::no_values();
        }
        let j = jaccard(a, b);
        ScoreResult::thresholded(
            j,
            self.threshold,
            format!(
                "J={:.3} (|∩|={}, |∪|={})",
                j,
                a.intersection_len(b),
                a.union_len(b)
            ),
        )
    }
}

/// Containment of the smaller value set in the larger.
#[derive(Debug, Clone, Copy)]
pub struct Containment {
    pub threshold: f64,
}

impl Containment {
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }
}

impl PairScorer for Containment {
    fn name(&self) -> &str {
        "containment"
    }

    fn score(
        &self,
        _left: &ColumnRef,
        a: &ValueSet,
        _right: &ColumnRef,
        b: &ValueSet,
    ) -> ScoreResult {
        if a.is_empty() || b.is_empty() {
            return ScoreResult::no_values();
        }
        let c = containment(a, b);
        ScoreResult::thresholded(
            c,
            self.threshold,
            format!(
                "containment: |∩|={}, min(|A|,|B|)={}",
                a.intersection_len(b),
                a.len().min(b.len())
            ),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(vals: &[&str]) -> ValueSet {
        vals.iter().collect()
    }

    fn refs() -> (ColumnRef, ColumnRef) {
        (ColumnRef::new("a", "x"), ColumnRef::new("b", "y"))
    }

    #[test]
    fn test_scenario_one() {
        let a = set(&["1", "2", "3"]);
        let b = set(&["2", "3", "4"]);
        assert_eq!(jaccard(&a, &b), 0.5);
        assert!((containment(&a, &b) - 2.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_jaccard_scorer_explanation() {
        let (l, r) = refs();
        let result = Jaccard::new(0.5).score(&l, &set(&["1", "2", "3"]), &r, &set(&["2", "3", "4"]));
        assert!(result.label);
        assert_eq!(result.score, 0.5);
        assert_eq!(result.explanation, "J=0.500 (|∩|=2, |∪|=4)");
    }

    #[test]
    fn test_containment_scorer_explanation() {
        let (l, r) = refs();
        let result =
            Containment::new(0.7).score(&l, &set(&["1", "2", "3"]), &r, &set(&["2", "3", "4"]));
        assert!(!result.label);
        assert_eq!(result.explanation, "containment: |∩|=2, min(|A|,|B|)=3");
    }

    #[test]
    fn test_empty_side_is_zero_regardless_of_threshold() {
        let (l, r) = refs();
        let empty = ValueSet::new();
        let full = set(&["1"]);
        for result in [
            Jaccard::new(0.0).score(&l, &empty, &r, &full),
            Containment::new(0.0).score(&l, &full, &r, &empty),
        ] {
            assert!(!result.label);
            assert_eq!(result.score, 0.0);
            assert_eq!(result.explanation, "no values");
        }
    }

    #[test]
    fn test_containment_full_subset() {
        let a = set(&["1", "2"]);
        let b = set(&["1", "2", "3", "4", "5"]);
        assert_eq!(containment(&a, &b), 1.0);
        assert_eq!(jaccard(&a, &b), 0.4);
    }
}
