//! joinbench: estimate whether two database columns form an equality-join key.
//!
//! Column pairs are scored by value overlap (Jaccard, containment), by
//! names alone when values are too sparse, or by an external inference
//! service. For whole queries, a bounded list of candidate edges is
//! generated from schema signals and the service picks among them.
//!
//! # Core Pieces
//!
//! - **Scoring**: pure [`PairScorer`] strategies over [`ValueSet`]s
//! - **Candidates**: declared keys, id-like columns and shared names, capped
//! - **Inference client**: one shared, rate-limited, retrying [`RateLimitedClient`]
//!
//! # Example
//!
//! ```no_run
//! use joinbench::{ColumnRef, JoinPairPredictor, Method, PairPredictor, ScoringConfig, SqliteSource};
//! use joinbench::scoring::build_scorer;
//!
//! let db = SqliteSource::open("spider/database/concert_singer/concert_singer.sqlite").unwrap();
//! let predictor = PairPredictor::new(build_scorer(Method::Jaccard, &ScoringConfig::default()));
//! let result = predictor
//!     .predict(&db, &ColumnRef::new("singer", "Singer_ID"), &ColumnRef::new("singer_in_concert", "Singer_ID"))
//!     .unwrap();
//!
//! println!("{} ({:.3}): {}", result.label, result.score, result.explanation);
//! ```

pub mod candidates;
pub mod error;
pub mod llm;
pub mod metrics;
pub mod predict;
pub mod records;
pub mod resolve;
pub mod schema;
pub mod scoring;
pub mod source;

pub use candidates::{Candidate, CandidateConfig, CandidateGenerator, DEFAULT_MAX_CANDIDATES};
pub use error::{ErrorKind, JoinBenchError, Result};
pub use llm::{ClientConfig, GeminiProvider, InferenceProvider, MockProvider, RateLimitedClient};
pub use predict::{
    JoinPairPredictor, LlmPairPredictor, OverlapQueryPredictor, PairPrediction, PairPredictor,
    PredictorConfig, QueryJoinPredictor, QueryPrediction, QueryPredictor,
};
pub use schema::{CandidateEdge, ColumnMeta, ColumnRef, EdgeTier, ForeignKey, TableMeta, ValueSet};
pub use scoring::{Method, PairScorer, ScoreResult, ScoringConfig};
pub use source::{Database, MemorySource, SpiderLayout, SqliteSource};
