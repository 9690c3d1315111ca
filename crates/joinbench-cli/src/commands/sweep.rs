//! Sweep command - evaluate one pair method at many thresholds.
//!
//! Evidence is gathered once per pair: value sets for the overlap and name
//! methods, one model verdict for the LLM. Each threshold then only
//! re-decides labels.

use std::path::{Path, PathBuf};

use colored::Colorize;
use joinbench::metrics::{PairMetrics, SweepRow, best_by_f1, parse_thresholds};
use joinbench::predict::resolve_ref;
use joinbench::records::{PairExample, read_jsonl, write_json};
use joinbench::scoring::build_scorer;
use joinbench::source::{DEFAULT_SAMPLE_LIMIT, ValueLoader};
use joinbench::{ColumnRef, LlmPairPredictor, Method, PairPrediction, PredictorConfig, ValueSet};
use tracing::info;

use super::pairs::{predict_all, scoring_config};
use super::{CliResult, Databases, RunMeta, apply_limit, build_client, print_saved, require_file, run_dir};
use crate::cli::MethodChoice;

pub struct SweepArgs {
    pub spider_dir: PathBuf,
    pub pairs: PathBuf,
    pub method: MethodChoice,
    pub thresholds: String,
    pub limit: Option<usize>,
    pub outdir: PathBuf,
    pub no_fallback: bool,
    pub mock_llm: bool,
}

/// A resolved pair with its loaded values.
struct LoadedPair {
    gold: bool,
    left: ColumnRef,
    a: ValueSet,
    right: ColumnRef,
    b: ValueSet,
}

fn load_pairs(dbs: &Databases, examples: &[PairExample]) -> CliResult<Vec<LoadedPair>> {
    let mut out = Vec::with_capacity(examples.len());
    for ex in examples {
        let db = dbs.get(&ex.db_id)?;
        let left = resolve_ref(db.as_ref(), &ex.left())?;
        let right = resolve_ref(db.as_ref(), &ex.right())?;
        let a = db.load_values(&left.table, &left.column, Some(DEFAULT_SAMPLE_LIMIT))?;
        let b = db.load_values(&right.table, &right.column, Some(DEFAULT_SAMPLE_LIMIT))?;
        out.push(LoadedPair {
            gold: ex.label,
            left,
            a,
            right,
            b,
        });
    }
    Ok(out)
}

fn sweep_scores(method: Method, pairs: &[LoadedPair], thresholds: &[f64], no_fallback: bool) -> Vec<SweepRow> {
    thresholds
        .iter()
        .map(|&t| {
            let scorer = build_scorer(method, &scoring_config(method, Some(t), no_fallback));
            let metrics = PairMetrics::from_labels(
                pairs
                    .iter()
                    .map(|p| (p.gold, scorer.score(&p.left, &p.a, &p.right, &p.b).label)),
            );
            SweepRow { threshold: t, metrics }
        })
        .collect()
}

/// Relabel LLM verdicts obtained at threshold 0, where the label is the raw
/// model label.
fn sweep_verdicts(gold: &[bool], verdicts: &[PairPrediction], thresholds: &[f64]) -> Vec<SweepRow> {
    thresholds
        .iter()
        .map(|&t| {
            let metrics = PairMetrics::from_labels(
                gold.iter()
                    .zip(verdicts)
                    .map(|(&g, v)| (g, v.label && v.score >= t)),
            );
            SweepRow { threshold: t, metrics }
        })
        .collect()
}

fn write_csv(path: &Path, rows: &[SweepRow]) -> CliResult<()> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record([
        "threshold", "precision", "recall", "f1", "accuracy", "tp", "fp", "fn", "tn",
    ])?;
    for row in rows {
        let m = &row.metrics;
        writer.write_record([
            row.threshold.to_string(),
            format!("{:.6}", m.precision),
            format!("{:.6}", m.recall),
            format!("{:.6}", m.f1),
            format!("{:.6}", m.accuracy),
            m.counts.tp.to_string(),
            m.counts.fp.to_string(),
            m.counts.fn_.to_string(),
            m.counts.tn.to_string(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

pub fn run(args: SweepArgs) -> CliResult<()> {
    require_file(&args.pairs)?;
    let thresholds = parse_thresholds(&args.thresholds)?;
    if thresholds.is_empty() {
        return Err("No thresholds to sweep".into());
    }
    let examples = apply_limit(read_jsonl::<PairExample>(&args.pairs)?, args.limit);
    let dbs = Databases::new(&args.spider_dir);

    println!(
        "{} {} over {} pairs at {} thresholds",
        "Sweeping".cyan().bold(),
        args.method.to_string().white(),
        examples.len().to_string().white().bold(),
        thresholds.len()
    );

    let rows = match args.method.scoring() {
        Some(m) => {
            let pairs = load_pairs(&dbs, &examples)?;
            info!(pairs = pairs.len(), "loaded value sets");
            sweep_scores(m, &pairs, &thresholds, args.no_fallback)
        }
        None => {
            let config = PredictorConfig::default().with_llm_threshold(0.0);
            let predictor = LlmPairPredictor::with_config(build_client(args.mock_llm)?, config);
            let verdicts = predict_all(&predictor, &dbs, &examples, 1)?;
            let gold: Vec<bool> = examples.iter().map(|ex| ex.label).collect();
            sweep_verdicts(&gold, &verdicts, &thresholds)
        }
    };

    for row in &rows {
        println!(
            "{} thr={:.3} => F1={:.3} P={:.3} R={:.3}",
            args.method, row.threshold, row.metrics.f1, row.metrics.precision, row.metrics.recall
        );
    }

    let dir = run_dir(&args.outdir, "sweep", &args.method.to_string())?;
    write_json(&dir.join("sweep.json"), &rows)?;
    write_csv(&dir.join("sweep.csv"), &rows)?;
    RunMeta::new(args.method, None, examples.len())
        .with_thresholds(&thresholds)
        .write(&dir)?;
    if let Some(best) = best_by_f1(&rows) {
        write_json(&dir.join("best.json"), best)?;
        println!();
        println!(
            "{} {}: thr={} F1={}",
            "Best".green().bold(),
            args.method,
            best.threshold,
            format!("{:.3}", best.metrics.f1).white().bold()
        );
    }
    print_saved(&dir);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn verdict(label: bool, score: f64) -> PairPrediction {
        PairPrediction {
            label,
            score,
            explanation: String::new(),
        }
    }

    #[test]
    fn test_llm_relabel_needs_raw_label_and_score() {
        let gold = [true, true, false];
        let verdicts = [verdict(true, 0.9), verdict(false, 0.95), verdict(true, 0.4)];
        let rows = sweep_verdicts(&gold, &verdicts, &[0.0, 0.5]);

        // t=0: raw labels only -> tp=1 fn=1 fp=1
        assert_eq!(rows[0].metrics.counts.tp, 1);
        assert_eq!(rows[0].metrics.counts.fp, 1);
        // t=0.5: the 0.4 verdict drops out
        assert_eq!(rows[1].metrics.counts.fp, 0);
        assert_eq!(rows[1].metrics.counts.tn, 1);
        assert_eq!(rows[1].metrics.precision, 1.0);
    }

    #[test]
    fn test_overlap_sweep_is_monotone_in_positives() {
        let pair = |gold: bool, a: &[&str], b: &[&str]| LoadedPair {
            gold,
            left: ColumnRef::new("l", "x"),
            a: a.iter().collect(),
            right: ColumnRef::new("r", "y"),
            b: b.iter().collect(),
        };
        let pairs = vec![
            pair(true, &["1", "2", "3", "4"], &["1", "2", "3", "4"]),
            pair(true, &["1", "2", "3", "4"], &["3", "4", "5", "6"]),
            pair(false, &["1", "2", "3", "4"], &["7", "8", "9", "10"]),
        ];
        let rows = sweep_scores(Method::Jaccard, &pairs, &[0.0, 0.3, 0.9], false);
        let positives: Vec<usize> = rows
            .iter()
            .map(|r| r.metrics.counts.tp + r.metrics.counts.fp)
            .collect();
        assert_eq!(positives, vec![3, 2, 1]);
        assert_eq!(best_by_f1(&rows).unwrap().threshold, 0.3);
    }

    #[test]
    fn test_csv_header_and_rows() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("sweep.csv");
        let rows = sweep_verdicts(&[true], &[verdict(true, 1.0)], &[0.05]);
        write_csv(&path, &rows).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some("threshold,precision,recall,f1,accuracy,tp,fp,fn,tn"));
        assert_eq!(lines.next(), Some("0.05,1.000000,1.000000,1.000000,1.000000,1,0,0,0"));
    }
}
