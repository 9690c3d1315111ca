//! Candidate edge generation.
//!
//! Scoring every column of every table against every column of every
//! other table is quadratic in both. For the handful of tables a query
//! mentions we instead propose a short, ranked list of plausible pairs:
//!
//! 1. declared foreign keys,
//! 2. primary keys (or id-like columns) against id-like columns (or primary keys),
//! 3. id-like against id-like,
//! 4. identically named columns.
//!
//! Each pass appends only edges not seen before, and the result is capped.

use std::collections::HashSet;

use indexmap::IndexMap;
use tracing::debug;

use crate::schema::{CandidateEdge, ColumnMeta, ColumnRef, EdgeTier, TableMeta};

/// Default cap on the number of candidates per query.
pub const DEFAULT_MAX_CANDIDATES: usize = 25;

/// A generated edge and the pass that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub edge: CandidateEdge,
    pub tier: EdgeTier,
}

/// Configuration for candidate generation.
#[derive(Debug, Clone)]
pub struct CandidateConfig {
    /// Maximum number of distinct edges returned.
    pub max_candidates: usize,
}

impl Default for CandidateConfig {
    fn default() -> Self {
        Self {
            max_candidates: DEFAULT_MAX_CANDIDATES,
        }
    }
}

/// Ordered, deduplicating accumulator.
struct EdgeList {
    seen: HashSet<CandidateEdge>,
    out: Vec<Candidate>,
}

impl EdgeList {
    fn new() -> Self {
        Self {
            seen: HashSet::new(),
            out: Vec::new(),
        }
    }

    /// Returns true if the edge was new.
    fn push(&mut self, edge: CandidateEdge, tier: EdgeTier) -> bool {
        if self.seen.insert(edge.clone()) {
            self.out.push(Candidate { edge, tier });
            true
        } else {
            false
        }
    }

    fn push_cross(
        &mut self,
        lt: &str,
        lcols: &[&ColumnMeta],
        rt: &str,
        rcols: &[&ColumnMeta],
        tier: EdgeTier,
    ) {
        for lc in lcols {
            for rc in rcols {
                self.push(
                    CandidateEdge::new(ColumnRef::new(lt, &lc.name), ColumnRef::new(rt, &rc.name)),
                    tier,
                );
            }
        }
    }
}

/// `first` unless it is empty, then `second`.
fn or_else<'a>(first: Vec<&'a ColumnMeta>, second: Vec<&'a ColumnMeta>) -> Vec<&'a ColumnMeta> {
    if first.is_empty() { second } else { first }
}

/// Generates candidate edges for the tables of one query.
#[derive(Debug, Clone, Default)]
pub struct CandidateGenerator {
    config: CandidateConfig,
}

impl CandidateGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: CandidateConfig) -> Self {
        Self { config }
    }

    pub fn with_max_candidates(mut self, max_candidates: usize) -> Self {
        self.config.max_candidates = max_candidates;
        self
    }

    /// Generate candidates in priority order, deduplicated and capped.
    ///
    /// `tables` maps each table name to its metadata; iteration order
    /// determines pair order within a pass.
    pub fn generate(&self, tables: &IndexMap<String, TableMeta>) -> Vec<Candidate> {
        let mut list = EdgeList::new();
        let names: Vec<&String> = tables.keys().collect();
        let pairs: Vec<(usize, usize)> = (0..names.len())
            .flat_map(|i| (i + 1..names.len()).map(move |j| (i, j)))
            .collect();

        // 1) declared foreign keys among the given tables
        for (lt, meta) in tables {
            for fk in &meta.foreign_keys {
                let Some(rt) = names.iter().find(|n| n.eq_ignore_ascii_case(&fk.to_table)) else {
                    continue;
                };
                list.push(
                    CandidateEdge::from_parts(lt.as_str(), fk.from_column.as_str(), rt.as_str(), fk.to_column.as_str()),
                    EdgeTier::DeclaredFk,
                );
            }
        }

        // 2) keys against id-like columns, both directions
        for &(i, j) in &pairs {
            let (lt, rt) = (names[i].as_str(), names[j].as_str());
            let (lm, rm) = (&tables[i], &tables[j]);
            let l_pks: Vec<_> = lm.primary_keys().collect();
            let r_pks: Vec<_> = rm.primary_keys().collect();
            let l_ids: Vec<_> = lm.id_like().collect();
            let r_ids: Vec<_> = rm.id_like().collect();

            list.push_cross(
                lt,
                &or_else(l_pks.clone(), l_ids.clone()),
                rt,
                &or_else(r_ids.clone(), r_pks.clone()),
                EdgeTier::PkVsIdLike,
            );
            list.push_cross(
                rt,
                &or_else(r_pks, r_ids),
                lt,
                &or_else(l_ids, l_pks),
                EdgeTier::PkVsIdLike,
            );
        }

        // 3) id-like against id-like; edges pass 2 already made are skipped
        for &(i, j) in &pairs {
            let l_ids: Vec<_> = tables[i].id_like().collect();
            let r_ids: Vec<_> = tables[j].id_like().collect();
            list.push_cross(names[i], &l_ids, names[j], &r_ids, EdgeTier::IdLikeVsIdLike);
        }

        // 4) identical names, case-insensitively
        for &(i, j) in &pairs {
            let mut shared: Vec<(String, &ColumnMeta, &ColumnMeta)> = Vec::new();
            for lc in &tables[i].columns {
                let key = lc.name.to_lowercase();
                if shared.iter().any(|(k, _, _)| *k == key) {
                    continue;
                }
                if let Some(rc) = tables[j].columns.iter().find(|c| c.name.to_lowercase() == key) {
                    shared.push((key, lc, rc));
                }
            }
            shared.sort_by(|a, b| a.0.cmp(&b.0));
            for (_, lc, rc) in shared {
                list.push(
                    CandidateEdge::from_parts(names[i].as_str(), lc.name.as_str(), names[j].as_str(), rc.name.as_str()),
                    EdgeTier::SameName,
                );
            }
        }

        let total = list.out.len();
        let mut out = list.out;
        out.truncate(self.config.max_candidates);
        debug!(
            tables = tables.len(),
            generated = total,
            kept = out.len(),
            "generated candidate edges"
        );
        out
    }
}
