//! Query-level join predictors.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use indexmap::IndexMap;
use tracing::debug;

use crate::candidates::CandidateGenerator;
use crate::error::Result;
use crate::llm::{RateLimitedClient, candidate_prompt, parse_choice_answer};
use crate::resolve::resolve_table;
use crate::schema::{CandidateEdge, ColumnRef, TableMeta, ValueSet};
use crate::scoring::PairScorer;
use crate::source::Database;

use super::{PredictorConfig, QueryPrediction, QueryPredictor, generate_parsed};

/// Explanation returned when the query's tables offer nothing to join.
pub const NO_CANDIDATES: &str = "No plausible join candidates for the tables in the query.";

/// Resolve each table hint once, keeping query order.
fn resolve_tables(db: &dyn Database, tables: &[String]) -> Result<Vec<String>> {
    let mut resolved: Vec<String> = Vec::with_capacity(tables.len());
    for hint in tables {
        let name = resolve_table(db, hint)?;
        if !resolved.contains(&name) {
            resolved.push(name);
        }
    }
    Ok(resolved)
}

/// Lets the inference service pick among generated candidate edges.
pub struct QueryJoinPredictor {
    client: Arc<RateLimitedClient>,
    generator: CandidateGenerator,
}

impl QueryJoinPredictor {
    pub fn new(client: Arc<RateLimitedClient>) -> Self {
        Self::with_config(client, &PredictorConfig::default())
    }

    pub fn with_config(client: Arc<RateLimitedClient>, config: &PredictorConfig) -> Self {
        Self {
            client,
            generator: CandidateGenerator::with_config(config.candidates.clone()),
        }
    }

    /// Candidate edges for `tables`, in generation order.
    pub fn candidates(&self, db: &dyn Database, tables: &[String]) -> Result<Vec<CandidateEdge>> {
        let mut schema: IndexMap<String, TableMeta> = IndexMap::new();
        for table in resolve_tables(db, tables)? {
            let meta = db.table_meta(&table)?;
            schema.insert(table, meta);
        }
        Ok(self
            .generator
            .generate(&schema)
            .into_iter()
            .map(|c| c.edge)
            .collect())
    }
}

impl QueryPredictor for QueryJoinPredictor {
    fn name(&self) -> &str {
        "llm"
    }

    fn predict(&self, db: &dyn Database, question: &str, tables: &[String]) -> Result<QueryPrediction> {
        let candidates = self.candidates(db, tables)?;
        if candidates.is_empty() {
            return Ok(QueryPrediction {
                pred_joins: Vec::new(),
                explain: NO_CANDIDATES.to_string(),
            });
        }

        let prompt = candidate_prompt(db.db_id(), question, &candidates);
        let answer = generate_parsed(&self.client, &prompt, parse_choice_answer)?;

        let chosen: BTreeSet<CandidateEdge> = answer
            .chosen
            .iter()
            .filter_map(|&i| candidates.get(i).cloned())
            .collect();
        debug!(
            candidates = candidates.len(),
            chosen = chosen.len(),
            "llm selected join edges"
        );

        Ok(QueryPrediction {
            pred_joins: chosen.into_iter().collect(),
            explain: answer.reason,
        })
    }
}

/// Baseline: score every cross-table column pair and keep the positives.
pub struct OverlapQueryPredictor {
    scorer: Arc<dyn PairScorer>,
    sample_limit: Option<usize>,
}

impl OverlapQueryPredictor {
    pub fn new(scorer: Arc<dyn PairScorer>) -> Self {
        Self::with_config(scorer, &PredictorConfig::default())
    }

    pub fn with_config(scorer: Arc<dyn PairScorer>, config: &PredictorConfig) -> Self {
        Self {
            scorer,
            sample_limit: config.sample_limit,
        }
    }
}

impl QueryPredictor for OverlapQueryPredictor {
    fn name(&self) -> &str {
        self.scorer.name()
    }

    fn predict(&self, db: &dyn Database, _question: &str, tables: &[String]) -> Result<QueryPrediction> {
        let tables = resolve_tables(db, tables)?;
        let mut columns: Vec<Vec<ColumnRef>> = Vec::with_capacity(tables.len());
        for table in &tables {
            columns.push(
                db.column_names(table)?
                    .into_iter()
                    .map(|c| ColumnRef::new(table.as_str(), c))
                    .collect(),
            );
        }

        let mut values: HashMap<ColumnRef, ValueSet> = HashMap::new();
        let mut pred = BTreeSet::new();
        let mut scored = 0usize;
        for i in 0..columns.len() {
            for j in i + 1..columns.len() {
                for l in &columns[i] {
                    for r in &columns[j] {
                        for col in [l, r] {
                            if !values.contains_key(col) {
                                let v = db.load_values(&col.table, &col.column, self.sample_limit)?;
                                values.insert(col.clone(), v);
                            }
                        }
                        let result = self.scorer.score(l, &values[l], r, &values[r]);
                        scored += 1;
                        if result.label {
                            pred.insert(CandidateEdge::new(l.clone(), r.clone()));
                        }
                    }
                }
            }
        }

        Ok(QueryPrediction {
            explain: format!(
                "{}: {} of {} cross-table column pairs scored positive",
                self.scorer.name(),
                pred.len(),
                scored
            ),
            pred_joins: pred.into_iter().collect(),
        })
    }
}
