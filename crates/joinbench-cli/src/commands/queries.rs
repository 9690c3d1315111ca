//! Queries command - predict the joins each question needs.

use std::path::PathBuf;

use colored::Colorize;
use joinbench::metrics::{EdgeCounts, EdgeMetrics};
use joinbench::records::{QueryExample, QueryFailure, QueryOutcome, read_jsonl, write_json, write_jsonl};
use joinbench::scoring::build_scorer;
use joinbench::{OverlapQueryPredictor, PredictorConfig, QueryJoinPredictor, QueryPredictor};
use tracing::{debug, info};

use super::pairs::{effective_threshold, scoring_config};
use super::{CliResult, Databases, RunMeta, apply_limit, build_client, print_saved, require_file, run_dir};
use crate::cli::MethodChoice;

/// Mismatching queries kept in `failures.json`.
const MAX_FAILURES: usize = 10;

pub struct QueriesArgs {
    pub spider_dir: PathBuf,
    pub gold: PathBuf,
    pub method: MethodChoice,
    pub threshold: Option<f64>,
    pub max_candidates: usize,
    pub limit: Option<usize>,
    pub outdir: PathBuf,
    pub no_fallback: bool,
    pub mock_llm: bool,
}

impl QueriesArgs {
    /// The overlap threshold in effect; the model's pick has none.
    fn threshold_in_effect(&self) -> Option<f64> {
        self.method
            .scoring()
            .map(|_| effective_threshold(self.method, self.threshold))
    }
}

fn build_predictor(args: &QueriesArgs) -> CliResult<Box<dyn QueryPredictor>> {
    let config = PredictorConfig::default().with_max_candidates(args.max_candidates);
    match args.method.scoring() {
        Some(m) => {
            let scorer = build_scorer(m, &scoring_config(m, args.threshold, args.no_fallback));
            Ok(Box::new(OverlapQueryPredictor::with_config(scorer, &config)))
        }
        None if args.threshold.is_some() => {
            Err("--threshold applies to overlap methods; the llm picks edges without a score".into())
        }
        None => Ok(Box::new(QueryJoinPredictor::with_config(
            build_client(args.mock_llm)?,
            &config,
        ))),
    }
}

/// Predict every example in order and total the edge counts.
pub fn evaluate(
    predictor: &dyn QueryPredictor,
    dbs: &Databases,
    examples: &[QueryExample],
) -> CliResult<(Vec<QueryOutcome>, EdgeCounts)> {
    let mut outcomes = Vec::with_capacity(examples.len());
    let mut counts = EdgeCounts::default();
    for (i, example) in examples.iter().enumerate() {
        let db = dbs.get(&example.db_id)?;
        let prediction = predictor.predict(db.as_ref(), &example.question, &example.tables_in_query)?;
        let outcome = QueryOutcome::new(example, prediction);
        counts.record(&outcome.gold_joins, &outcome.pred_joins);
        debug!(index = i, db_id = %example.db_id, predicted = outcome.pred_joins.len(), "query done");
        outcomes.push(outcome);
    }
    Ok((outcomes, counts))
}

pub fn run(args: QueriesArgs) -> CliResult<()> {
    require_file(&args.gold)?;
    let examples = apply_limit(read_jsonl::<QueryExample>(&args.gold)?, args.limit);

    println!(
        "{} {} questions with {}",
        "Predicting joins for".cyan().bold(),
        examples.len().to_string().white().bold(),
        args.method.to_string().white()
    );

    let predictor = build_predictor(&args)?;
    let dbs = Databases::new(&args.spider_dir);
    info!(predictor = predictor.name(), "running query benchmark");
    let (outcomes, counts) = evaluate(predictor.as_ref(), &dbs, &examples)?;

    let metrics = EdgeMetrics::from_counts(counts);
    let failures: Vec<QueryFailure> = outcomes
        .iter()
        .filter_map(QueryOutcome::failure)
        .take(MAX_FAILURES)
        .collect();

    let dir = run_dir(&args.outdir, "queries", &args.method.to_string())?;
    write_jsonl(&dir.join("predictions.jsonl"), &outcomes)?;
    write_json(&dir.join("metrics.json"), &metrics)?;
    write_json(&dir.join("failures.json"), &failures)?;
    RunMeta::new(args.method, args.threshold_in_effect(), examples.len()).write(&dir)?;

    println!();
    println!(
        "F1 {}  P {:.3}  R {:.3}",
        format!("{:.3}", metrics.f1).white().bold(),
        metrics.precision,
        metrics.recall
    );
    println!(
        "edges: tp={} fp={} fn={}",
        counts.tp.to_string().green(),
        counts.fp.to_string().red(),
        counts.fn_.to_string().yellow()
    );
    if !failures.is_empty() {
        println!("{} queries with mismatches written to failures.json", failures.len());
    }
    print_saved(&dir);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use joinbench::{CandidateEdge, ColumnMeta, MemorySource, TableMeta};
    use std::path::Path;

    fn write_fixture(root: &Path) {
        let dir = root.join("database").join("shop");
        std::fs::create_dir_all(&dir).unwrap();
        let conn = rusqlite::Connection::open(dir.join("shop.sqlite")).unwrap();
        conn.execute_batch(
            "CREATE TABLE customer (id INTEGER PRIMARY KEY, name TEXT);
             CREATE TABLE orders (order_id INTEGER PRIMARY KEY, customer_id INTEGER REFERENCES customer(id));
             INSERT INTO customer VALUES (1, 'ann'), (2, 'bo'), (3, 'cy');
             INSERT INTO orders VALUES (10, 1), (11, 2), (12, 3), (13, 1);",
        )
        .unwrap();
    }

    fn example() -> QueryExample {
        serde_json::from_value(serde_json::json!({
            "db_id": "shop",
            "question": "Who ordered what?",
            "tables_in_query": ["orders", "Customer"],
            "gold_joins": [{"left_table": "orders", "left_column": "customer_id",
                            "right_table": "customer", "right_column": "id"}]
        }))
        .unwrap()
    }

    #[test]
    fn test_mock_llm_picks_first_candidate() {
        let tmp = tempfile::tempdir().unwrap();
        write_fixture(tmp.path());
        let args = QueriesArgs {
            spider_dir: tmp.path().to_path_buf(),
            gold: tmp.path().join("gold.jsonl"),
            method: MethodChoice::Llm,
            threshold: None,
            max_candidates: 25,
            limit: None,
            outdir: tmp.path().join("runs"),
            no_fallback: false,
            mock_llm: true,
        };
        let predictor = build_predictor(&args).unwrap();
        let dbs = Databases::new(tmp.path());

        let (outcomes, counts) = evaluate(predictor.as_ref(), &dbs, &[example()]).unwrap();
        // The first candidate is the declared foreign key.
        assert_eq!(outcomes[0].pred_joins, outcomes[0].gold_joins);
        assert_eq!(counts, EdgeCounts { tp: 1, fp: 0, fn_: 0 });
        assert!(outcomes[0].failure().is_none());
    }

    #[test]
    fn test_overlap_baseline_finds_key() {
        let tmp = tempfile::tempdir().unwrap();
        write_fixture(tmp.path());
        let args = QueriesArgs {
            spider_dir: tmp.path().to_path_buf(),
            gold: tmp.path().join("gold.jsonl"),
            method: MethodChoice::Containment,
            threshold: Some(0.9),
            max_candidates: 25,
            limit: None,
            outdir: tmp.path().join("runs"),
            no_fallback: false,
            mock_llm: false,
        };
        let predictor = build_predictor(&args).unwrap();
        let dbs = Databases::new(tmp.path());

        let (outcomes, counts) = evaluate(predictor.as_ref(), &dbs, &[example()]).unwrap();
        assert_eq!(counts.fn_, 0);
        assert!(outcomes[0].pred_joins.contains(&outcomes[0].gold_joins[0]));
    }

    fn args(method: MethodChoice, threshold: Option<f64>, no_fallback: bool) -> QueriesArgs {
        QueriesArgs {
            spider_dir: PathBuf::from("spider"),
            gold: PathBuf::from("gold.jsonl"),
            method,
            threshold,
            max_candidates: 25,
            limit: None,
            outdir: PathBuf::from("runs"),
            no_fallback,
            mock_llm: true,
        }
    }

    #[test]
    fn test_no_fallback_keeps_sparse_same_name_pairs_out() {
        // Two distinct values per side: sparse, same names, no overlap.
        let db = MemorySource::new("d")
            .with_table(TableMeta::new("orders").with_column(ColumnMeta::new("user_id")))
            .with_table(TableMeta::new("users").with_column(ColumnMeta::new("user_id")))
            .with_values("orders", "user_id", ["1", "2"])
            .with_values("users", "user_id", ["3", "4"]);
        let tables = vec!["orders".to_string(), "users".to_string()];
        let edge = CandidateEdge::from_parts("orders", "user_id", "users", "user_id");

        let with_names = build_predictor(&args(MethodChoice::Jaccard, None, false)).unwrap();
        let pred = with_names.predict(&db, "q", &tables).unwrap();
        assert_eq!(pred.pred_joins, vec![edge]);

        let values_only = build_predictor(&args(MethodChoice::Jaccard, None, true)).unwrap();
        let pred = values_only.predict(&db, "q", &tables).unwrap();
        assert!(pred.pred_joins.is_empty());
    }

    #[test]
    fn test_llm_rejects_threshold() {
        let err = build_predictor(&args(MethodChoice::Llm, Some(0.5), false)).err().unwrap();
        assert!(err.to_string().contains("--threshold"));
        assert!(build_predictor(&args(MethodChoice::Containment, Some(0.5), false)).is_ok());
    }

    #[test]
    fn test_threshold_in_meta() {
        assert_eq!(args(MethodChoice::Llm, None, false).threshold_in_effect(), None);
        assert_eq!(
            args(MethodChoice::Jaccard, None, false).threshold_in_effect(),
            Some(joinbench::scoring::DEFAULT_OVERLAP_THRESHOLD)
        );
        assert_eq!(args(MethodChoice::Name, Some(0.8), false).threshold_in_effect(), Some(0.8));
    }
}
