//! Name-only join heuristic, for pairs whose values are too sparse to trust.

use std::collections::HashSet;

use crate::schema::{ColumnRef, ValueSet, canonical_ident, name_tokens};

use super::{PairScorer, ScoreResult};

/// Column-name tokens that signal a reference to another table.
pub const REFERENCE_TOKENS: &[&str] = &[
    "ref", "refid", "fk", "foreign", "parent", "child", "source", "target", "cited", "citing",
];

const COLUMN_WEIGHT: f64 = 0.85;
const TABLE_WEIGHT: f64 = 0.15;
const ACRONYM_ID_SCORE: f64 = 0.95;

/// Components of a name-heuristic score.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NameScore {
    /// 1.0 when the column names agree case-insensitively or canonically.
    pub exact: f64,
    /// Token-set Jaccard of the column names.
    pub col_sim: f64,
    /// Token-set Jaccard of the table names.
    pub tab_sim: f64,
    /// 0.95 when the acronym-id pattern fires, else 0.
    pub acronym_id: f64,
    /// `max(exact, 0.85·col_sim + 0.15·tab_sim, acronym_id)`.
    pub score: f64,
}

fn token_jaccard(a: &[String], b: &[String]) -> f64 {
    let a: HashSet<&str> = a.iter().map(String::as_str).collect();
    let b: HashSet<&str> = b.iter().map(String::as_str).collect();
    let union = a.union(&b).count();
    if union == 0 {
        return 0.0;
    }
    a.intersection(&b).count() as f64 / union as f64
}

/// Initials of the table's name tokens followed by `id` (`publication` → `pid`).
fn acronym_id(table_tokens: &[String]) -> String {
    let mut acr: String = table_tokens.iter().filter_map(|t| t.chars().next()).collect();
    acr.push_str("id");
    acr
}

/// The right column is the right table's key by the acronym-id convention
/// and the left column reads like a reference to it.
fn acronym_id_fires(left: &ColumnRef, right: &ColumnRef) -> bool {
    let right_table_tokens = name_tokens(&right.table);
    let right_col = right.column.to_lowercase();
    if right_col != "id" && right_col != acronym_id(&right_table_tokens) {
        return false;
    }

    let left_col_tokens = name_tokens(&left.column);
    left_col_tokens
        .iter()
        .any(|t| REFERENCE_TOKENS.contains(&t.as_str()) || right_table_tokens.contains(t))
}

/// Score a column pair by names alone.
pub fn name_score(left: &ColumnRef, right: &ColumnRef) -> NameScore {
    let same_name = left.column.to_lowercase() == right.column.to_lowercase()
        || canonical_ident(&left.column) == canonical_ident(&right.column);
    let exact: f64 = if same_name { 1.0 } else { 0.0 };

    let col_sim = token_jaccard(&name_tokens(&left.column), &name_tokens(&right.column));
    let tab_sim = token_jaccard(&name_tokens(&left.table), &name_tokens(&right.table));
    let base = exact.max(COLUMN_WEIGHT * col_sim + TABLE_WEIGHT * tab_sim);

    let acronym_id = if acronym_id_fires(left, right) {
        ACRONYM_ID_SCORE
    } else {
        0.0
    };

    NameScore {
        exact,
        col_sim,
        tab_sim,
        acronym_id,
        score: base.max(acronym_id),
    }
}

/// Name-only strategy with its own, stricter threshold.
#[derive(Debug, Clone, Copy)]
pub struct NameHeuristic {
    pub threshold: f64,
}

impl NameHeuristic {
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }
}

impl Default for NameHeuristic {
    fn default() -> Self {
        Self::new(super::DEFAULT_NAME_THRESHOLD)
    }
}

impl PairScorer for NameHeuristic {
    fn name(&self) -> &str {
        "name"
    }

    fn score(
        &self,
        left: &ColumnRef,
        _a: &ValueSet,
        right: &ColumnRef,
        _b: &ValueSet,
    ) -> ScoreResult {
        let s = name_score(left, right);
        ScoreResult::thresholded(
            s.score,
            self.threshold,
            format!(
                "name heuristic: exact={:.2} col_sim={:.2} tab_sim={:.2} acronym_id={:.2}",
                s.exact, s.col_sim, s.tab_sim, s.acronym_id
            ),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair(lt: &str, lc: &str, rt: &str, rc: &str) -> (ColumnRef, ColumnRef) {
        (ColumnRef::new(lt, lc), ColumnRef::new(rt, rc))
    }

    #[test]
    fn test_acronym_id_citation() {
        let (l, r) = pair("cite", "citing", "publication", "pid");
        let s = name_score(&l, &r);
        assert_eq!(s.acronym_id, 0.95);
        assert_eq!(s.score, 0.95);

        let result = NameHeuristic::default().score(&l, &ValueSet::new(), &r, &ValueSet::new());
        assert!(result.label);
        assert!(result.explanation.contains("acronym_id=0.95"));
    }

    #[test]
    fn test_identical_names_are_exact() {
        let (l, r) = pair("orders", "user_id", "users", "user_id");
        let s = name_score(&l, &r);
        assert_eq!(s.exact, 1.0);
        assert_eq!(s.score, 1.0);
    }

    #[test]
    fn test_canonical_names_are_exact() {
        let (l, r) = pair("a", "User ID", "b", "user_id");
        assert_eq!(name_score(&l, &r).exact, 1.0);
    }

    #[test]
    fn test_acronym_id_via_shared_table_token() {
        // "paper_key" shares "paper" with the right table name.
        let (l, r) = pair("writes", "paper_key", "paper", "id");
        assert_eq!(name_score(&l, &r).acronym_id, 0.95);
    }

    #[test]
    fn test_acronym_requires_reference_signal() {
        let (l, r) = pair("cite", "year", "publication", "pid");
        let s = name_score(&l, &r);
        assert_eq!(s.acronym_id, 0.0);
        assert!(s.score < 0.90);
    }

    #[test]
    fn test_partial_overlap_below_threshold() {
        // col_sim = 1/3 ("id" shared), tab_sim = 0.
        let (l, r) = pair("song", "artist_id", "album", "album_id");
        let s = name_score(&l, &r);
        assert!((s.col_sim - 1.0 / 3.0).abs() < 1e-12);
        assert!((s.score - 0.85 / 3.0).abs() < 1e-12);

        let result = NameHeuristic::default().score(&l, &ValueSet::new(), &r, &ValueSet::new());
        assert!(!result.label);
    }

    #[test]
    fn test_different_names_fall_back_to_weighted_similarity() {
        // Only the table names share a token: tab_sim = 1/2.
        let (l, r) = pair("concert_singer", "name", "singer", "title");
        let s = name_score(&l, &r);
        assert_eq!(s.exact, 0.0);
        assert_eq!(s.col_sim, 0.0);
        assert!((s.score - 0.15 * 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_acronym_of_multi_token_table() {
        let tokens = name_tokens("customer_order");
        assert_eq!(acronym_id(&tokens), "coid");
    }
}
