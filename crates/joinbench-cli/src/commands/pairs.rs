//! Pairs command - score labeled column pairs and write metrics, for one
//! method or several in turn.

use std::path::PathBuf;

use colored::Colorize;
use joinbench::metrics::PairMetrics;
use joinbench::records::{PairExample, PairOutcome, read_jsonl, write_json, write_jsonl};
use joinbench::predict::DEFAULT_LLM_THRESHOLD;
use joinbench::scoring::{DEFAULT_NAME_THRESHOLD, DEFAULT_OVERLAP_THRESHOLD, build_scorer};
use joinbench::{
    JoinPairPredictor, LlmPairPredictor, Method, PairPrediction, PairPredictor, PredictorConfig,
    ScoringConfig,
};
use tracing::info;

use super::{
    CliResult, Databases, RunMeta, apply_limit, build_client, print_pair_metrics, print_saved,
    require_file, run_dir,
};
use crate::cli::MethodChoice;

pub struct PairsArgs {
    pub spider_dir: PathBuf,
    pub pairs: PathBuf,
    pub methods: Vec<MethodChoice>,
    pub thresholds: Vec<f64>,
    pub limit: Option<usize>,
    pub outdir: PathBuf,
    pub workers: usize,
    pub no_fallback: bool,
    pub mock_llm: bool,
}

/// Scoring settings for `method`; `threshold` applies to whichever score
/// decides the label.
pub fn scoring_config(method: Method, threshold: Option<f64>, no_fallback: bool) -> ScoringConfig {
    let mut config = ScoringConfig::default().with_sparse_fallback(!no_fallback);
    if let Some(t) = threshold {
        match method {
            Method::Name => config.name_threshold = t,
            Method::Jaccard | Method::Containment => config.threshold = t,
        }
    }
    config
}

/// Pair each method with its threshold: none given keeps every default,
/// one applies to all methods, otherwise there must be one per method.
pub fn method_thresholds(
    methods: &[MethodChoice],
    thresholds: &[f64],
) -> CliResult<Vec<(MethodChoice, Option<f64>)>> {
    match thresholds {
        [] => Ok(methods.iter().map(|&m| (m, None)).collect()),
        [t] => Ok(methods.iter().map(|&m| (m, Some(*t))).collect()),
        many if many.len() == methods.len() => Ok(methods
            .iter()
            .zip(many)
            .map(|(&m, &t)| (m, Some(t)))
            .collect()),
        many => Err(format!(
            "{} thresholds given for {} methods; give one, or one per method",
            many.len(),
            methods.len()
        )
        .into()),
    }
}

/// The threshold `method` decides with.
pub fn effective_threshold(method: MethodChoice, threshold: Option<f64>) -> f64 {
    threshold.unwrap_or(match method {
        MethodChoice::Jaccard | MethodChoice::Containment => DEFAULT_OVERLAP_THRESHOLD,
        MethodChoice::Name => DEFAULT_NAME_THRESHOLD,
        MethodChoice::Llm => DEFAULT_LLM_THRESHOLD,
    })
}

/// Build the pair predictor for a command-line method choice.
pub fn build_predictor(
    method: MethodChoice,
    threshold: Option<f64>,
    no_fallback: bool,
    mock_llm: bool,
) -> CliResult<Box<dyn JoinPairPredictor>> {
    match method.scoring() {
        Some(m) => {
            let scorer = build_scorer(m, &scoring_config(m, threshold, no_fallback));
            Ok(Box::new(PairPredictor::with_config(scorer, &PredictorConfig::default())))
        }
        None => {
            let mut config = PredictorConfig::default();
            if let Some(t) = threshold {
                config = config.with_llm_threshold(t);
            }
            Ok(Box::new(LlmPairPredictor::with_config(build_client(mock_llm)?, config)))
        }
    }
}

fn predict_one(
    predictor: &dyn JoinPairPredictor,
    dbs: &Databases,
    example: &PairExample,
) -> joinbench::Result<PairPrediction> {
    let db = dbs.get(&example.db_id)?;
    predictor.predict(db.as_ref(), &example.left(), &example.right())
}

/// Predict every example, in input order, on `workers` threads.
///
/// The first error stops the run.
pub fn predict_all(
    predictor: &dyn JoinPairPredictor,
    dbs: &Databases,
    examples: &[PairExample],
    workers: usize,
) -> CliResult<Vec<PairPrediction>> {
    let chunk = examples.len().div_ceil(workers.max(1)).max(1);
    std::thread::scope(|s| {
        let handles: Vec<_> = examples
            .chunks(chunk)
            .map(|part| {
                s.spawn(move || {
                    part.iter()
                        .map(|ex| predict_one(predictor, dbs, ex))
                        .collect::<joinbench::Result<Vec<_>>>()
                })
            })
            .collect();

        let mut out = Vec::with_capacity(examples.len());
        for handle in handles {
            let part = handle.join().map_err(|_| "worker thread panicked")??;
            out.extend(part);
        }
        Ok(out)
    })
}

/// Evaluate one method and write its run directory.
fn run_method(
    args: &PairsArgs,
    dbs: &Databases,
    examples: &[PairExample],
    method: MethodChoice,
    threshold: Option<f64>,
) -> CliResult<PairMetrics> {
    println!(
        "{} {} pairs with {}",
        "Scoring".cyan().bold(),
        examples.len().to_string().white().bold(),
        method.to_string().white()
    );

    let predictor = build_predictor(method, threshold, args.no_fallback, args.mock_llm)?;
    info!(predictor = predictor.name(), workers = args.workers, "running pair benchmark");
    let predictions = predict_all(predictor.as_ref(), dbs, examples, args.workers)?;

    let outcomes: Vec<PairOutcome> = examples
        .iter()
        .zip(&predictions)
        .map(|(ex, p)| PairOutcome::new(ex, p))
        .collect();
    let metrics = PairMetrics::from_labels(examples.iter().zip(&predictions).map(|(ex, p)| (ex.label, p.label)));

    let dir = run_dir(&args.outdir, "pairs", &method.to_string())?;
    write_jsonl(&dir.join("predictions.jsonl"), &outcomes)?;
    write_json(&dir.join("metrics.json"), &metrics)?;
    RunMeta::new(method, Some(effective_threshold(method, threshold)), examples.len()).write(&dir)?;

    println!();
    print_pair_metrics(&metrics);
    print_saved(&dir);
    Ok(metrics)
}

pub fn run(args: PairsArgs) -> CliResult<()> {
    require_file(&args.pairs)?;
    let plan = method_thresholds(&args.methods, &args.thresholds)?;
    let examples = apply_limit(read_jsonl::<PairExample>(&args.pairs)?, args.limit);
    let dbs = Databases::new(&args.spider_dir);

    let mut results = Vec::with_capacity(plan.len());
    for (method, threshold) in plan {
        let metrics = run_method(&args, &dbs, &examples, method, threshold)?;
        results.push((method, effective_threshold(method, threshold), metrics));
        println!();
    }

    if results.len() > 1 {
        println!("{}", "Comparison".cyan().bold());
        println!("  {:12} {:>6} {:>6} {:>6} {:>6} {:>6}", "method", "thr", "F1", "P", "R", "Acc");
        for (method, threshold, m) in &results {
            println!(
                "  {:12} {:>6.3} {:>6} {:>6.3} {:>6.3} {:>6.3}",
                method.to_string(),
                threshold,
                format!("{:.3}", m.f1).white().bold(),
                m.precision,
                m.recall,
                m.accuracy
            );
        }
    }
    Ok(())
}
