//! Column-pair predictors.

use std::sync::Arc;

use tracing::debug;

use crate::error::Result;
use crate::llm::{ColumnEvidence, RateLimitedClient, pair_prompt, parse_pair_answer};
use crate::schema::ColumnRef;
use crate::scoring::{PairScorer, ScoreResult};
use crate::source::Database;

use super::{JoinPairPredictor, PairPrediction, PredictorConfig, generate_parsed, resolve_ref};

/// Scores a pair from its value sets with a [`PairScorer`].
#[derive(Clone)]
pub struct PairPredictor {
    scorer: Arc<dyn PairScorer>,
    sample_limit: Option<usize>,
}

impl PairPredictor {
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

impl JoinPairPredictor for PairPredictor {
    fn name(&self) -> &str {
        self.scorer.name()
    }

    fn predict(
        &self,
        db: &dyn Database,
        left: &ColumnRef,
        right: &ColumnRef,
    ) -> Result<PairPrediction> {
        let l = resolve_ref(db, left)?;
        let r = resolve_ref(db, right)?;
        let a = db.load_values(&l.table, &l.column, self.sample_limit)?;
        let b = db.load_values(&r.table, &r.column, self.sample_limit)?;
        Ok(self.scorer.score(&l, &a, &r, &b))
    }
}

/// Asks the inference service about a pair, showing it names and samples.
pub struct LlmPairPredictor {
    client: Arc<RateLimitedClient>,
    config: PredictorConfig,
}

impl LlmPairPredictor {
    pub fn new(client: Arc<RateLimitedClient>) -> Self {
        Self::with_config(client, PredictorConfig::default())
    }

    pub fn with_config(client: Arc<RateLimitedClient>, config: PredictorConfig) -> Self {
        Self { client, config }
    }

    fn evidence(&self, db: &dyn Database, column: ColumnRef) -> Result<ColumnEvidence> {
        let values = db.load_values(&column.table, &column.column, self.config.sample_limit)?;
        let mut table_columns = db.column_names(&column.table)?;
        table_columns.truncate(self.config.preview_columns);
        Ok(ColumnEvidence {
            samples: values.sample(self.config.sample_k),
            cardinality: values.len(),
            table_columns,
            column,
        })
    }
}

impl JoinPairPredictor for LlmPairPredictor {
    fn name(&self) -> &str {
        "llm"
    }

    fn predict(
        &self,
        db: &dyn Database,
        left: &ColumnRef,
        right: &ColumnRef,
    ) -> Result<PairPrediction> {
        let l = self.evidence(db, resolve_ref(db, left)?)?;
        let r = self.evidence(db, resolve_ref(db, right)?)?;
        let prompt = pair_prompt(db.db_id(), &l, &r);

        let answer = generate_parsed(&self.client, &prompt, parse_pair_answer)?;
        debug!(left = %l.column, right = %r.column, score = answer.score, "llm pair verdict");

        let reason: String = answer.reason.chars().take(180).collect();
        Ok(ScoreResult {
            label: answer.label && answer.score >= self.config.llm_threshold,
            score: answer.score,
            explanation: format!(
                "LLM score={:.3}, raw_label={}, reason=\"{}\"",
                answer.score,
                u8::from(answer.label),
                reason
            ),
        })
    }
}
