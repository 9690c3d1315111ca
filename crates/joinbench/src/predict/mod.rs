//! Join predictors: one column pair at a time, or all joins a query needs.
//!
//! Every predictor works against a [`Database`] passed per call, so one
//! predictor can serve many databases and many threads at once.

mod pair;
mod query;

pub use pair::{LlmPairPredictor, PairPredictor};
pub use query::{NO_CANDIDATES, OverlapQueryPredictor, QueryJoinPredictor};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::candidates::CandidateConfig;
use crate::error::{ErrorKind, Result};
use crate::llm::{RateLimitedClient, reinforced};
use crate::resolve::{resolve_column, resolve_table};
use crate::schema::{CandidateEdge, ColumnRef};
use crate::scoring::ScoreResult;
use crate::source::{DEFAULT_SAMPLE_LIMIT, Database};

/// Default decision threshold on the model's self-reported score.
pub const DEFAULT_LLM_THRESHOLD: f64 = 0.5;

/// Number of sample values and preview columns shown to the model.
pub const DEFAULT_SAMPLE_K: usize = 8;

/// Verdict on one column pair.
pub type PairPrediction = ScoreResult;

/// Joins predicted for one query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryPrediction {
    /// Canonical, deduplicated and sorted.
    pub pred_joins: Vec<CandidateEdge>,
    pub explain: String,
}

/// Predicts whether two (nominal) columns are an equality-join key.
pub trait JoinPairPredictor: Send + Sync {
    fn name(&self) -> &str;

    fn predict(
        &self,
        db: &dyn Database,
        left: &ColumnRef,
        right: &ColumnRef,
    ) -> Result<PairPrediction>;
}

/// Predicts the join edges a question over `tables` requires.
pub trait QueryPredictor: Send + Sync {
    fn name(&self) -> &str;

    fn predict(&self, db: &dyn Database, question: &str, tables: &[String]) -> Result<QueryPrediction>;
}

/// Shared predictor settings.
#[derive(Debug, Clone)]
pub struct PredictorConfig {
    /// Cap on distinct values loaded per column.
    pub sample_limit: Option<usize>,
    /// Threshold applied to the model's score.
    pub llm_threshold: f64,
    /// Sample values shown per column.
    pub sample_k: usize,
    /// Leading table columns shown per side.
    pub preview_columns: usize,
    pub candidates: CandidateConfig,
}

impl Default for PredictorConfig {
    fn default() -> Self {
        Self {
            sample_limit: Some(DEFAULT_SAMPLE_LIMIT),
            llm_threshold: DEFAULT_LLM_THRESHOLD,
            sample_k: DEFAULT_SAMPLE_K,
            preview_columns: DEFAULT_SAMPLE_K,
            candidates: CandidateConfig::default(),
        }
    }
}

impl PredictorConfig {
    pub fn with_sample_limit(mut self, limit: Option<usize>) -> Self {
        self.sample_limit = limit;
        self
    }

    pub fn with_llm_threshold(mut self, threshold: f64) -> Self {
        self.llm_threshold = threshold;
        self
    }

    pub fn with_max_candidates(mut self, max_candidates: usize) -> Self {
        self.candidates.max_candidates = max_candidates;
        self
    }
}

/// Resolve a nominal column reference to the database's identifiers.
pub fn resolve_ref(db: &dyn Database, hint: &ColumnRef) -> Result<ColumnRef> {
    let table = resolve_table(db, &hint.table)?;
    let column = resolve_column(db, &table, &hint.column)?;
    Ok(ColumnRef::new(table, column))
}

/// Send `prompt` and parse the reply, retrying once with a reinforced
/// prompt if the first reply is malformed.
///
/// Only [`ErrorKind::MalformedResponse`] triggers the retry. A second
/// malformed reply, or any other error, is returned as is.
pub(crate) fn generate_parsed<T>(
    client: &RateLimitedClient,
    prompt: &str,
    parse: impl Fn(&str) -> Result<T>,
) -> Result<T> {
    let first = client.generate_text(prompt).and_then(|text| parse(&text));
    match first {
        Err(e) if e.kind() == ErrorKind::MalformedResponse => {
            warn!(error = %e, "unparseable reply, retrying with reinforced prompt");
            let text = client.generate_text(&reinforced(prompt))?;
            parse(&text)
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::JoinBenchError;
    use crate::llm::{ClientConfig, ManualClock, MockProvider, ProviderFailure};
    use std::sync::Arc;

    fn client(mock: MockProvider) -> RateLimitedClient {
        let config = ClientConfig::default().with_rpm(100).with_max_retries(2);
        RateLimitedClient::with_clock(mock, &config, Arc::new(ManualClock::new()))
    }

    fn parse_num(text: &str) -> Result<u32> {
        text.trim()
            .parse()
            .map_err(|_| JoinBenchError::MalformedResponse(text.to_string()))
    }

    #[test]
    fn test_reinforced_retry_recovers() {
        let mock = Arc::new(MockProvider::new().with_reply("garbage").with_reply("7"));
        let config = ClientConfig::default().with_rpm(100);
        let c = RateLimitedClient::with_clock(mock.clone(), &config, Arc::new(ManualClock::new()));
        assert_eq!(generate_parsed(&c, "p", parse_num).unwrap(), 7);

        let prompts = mock.prompts();
        assert_eq!(prompts.len(), 2);
        assert_eq!(prompts[0], "p");
        assert_eq!(prompts[1], reinforced("p"));
    }

    #[test]
    fn test_second_malformed_reply_fails() {
        let c = client(MockProvider::new().with_reply("a").with_reply("b").with_reply("9"));
        let err = generate_parsed(&c, "p", parse_num).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedResponse);
    }

    #[test]
    fn test_other_errors_do_not_trigger_reinforced_retry() {
        let c = client(
            MockProvider::new()
                .with_failure(ProviderFailure::Rejected("denied".into()))
                .with_reply("5"),
        );
        let err = generate_parsed(&c, "p", parse_num).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NonRetryable);
    }
}
