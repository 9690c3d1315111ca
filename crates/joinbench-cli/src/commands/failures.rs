//! Failures command - show the misclassified pairs of a pair run with
//! their values side by side.

use std::path::PathBuf;

use colored::Colorize;
use joinbench::Database;
use joinbench::predict::resolve_ref;
use joinbench::records::{PairOutcome, read_jsonl};
use joinbench::source::{DEFAULT_SAMPLE_LIMIT, ValueLoader};

use super::{CliResult, Databases, require_file};

/// Values shown per side.
const SIDE_SAMPLE: usize = 3;

/// Shared values shown per pair.
const SHARED_SAMPLE: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FailureKind {
    FalseNegative,
    FalsePositive,
}

impl FailureKind {
    fn of(outcome: &PairOutcome) -> Option<Self> {
        match (outcome.gt_label, outcome.pred_label) {
            (1, 0) => Some(Self::FalseNegative),
            (0, 1) => Some(Self::FalsePositive),
            _ => None,
        }
    }

    fn title(self) -> &'static str {
        match self {
            Self::FalseNegative => "False negatives (gold join, predicted no)",
            Self::FalsePositive => "False positives (no join, predicted yes)",
        }
    }
}

/// Value evidence for one pair.
#[derive(Debug)]
struct Evidence {
    left_distinct: usize,
    right_distinct: usize,
    left_sample: Vec<String>,
    right_sample: Vec<String>,
    shared: usize,
    shared_sample: Vec<String>,
}

fn gather(db: &dyn Database, outcome: &PairOutcome) -> joinbench::Result<Evidence> {
    let left = resolve_ref(db, &outcome.left())?;
    let right = resolve_ref(db, &outcome.right())?;
    let a = db.load_values(&left.table, &left.column, Some(DEFAULT_SAMPLE_LIMIT))?;
    let b = db.load_values(&right.table, &right.column, Some(DEFAULT_SAMPLE_LIMIT))?;
    Ok(Evidence {
        left_distinct: a.len(),
        right_distinct: b.len(),
        left_sample: a.sample(SIDE_SAMPLE),
        right_sample: b.sample(SIDE_SAMPLE),
        shared: a.intersection_len(&b),
        shared_sample: a
            .iter()
            .filter(|v| b.contains(v))
            .take(SHARED_SAMPLE)
            .map(str::to_string)
            .collect(),
    })
}

/// Outcomes of `kind`, in file order.
fn select(outcomes: &[PairOutcome], kind: FailureKind) -> Vec<&PairOutcome> {
    outcomes
        .iter()
        .filter(|o| FailureKind::of(o) == Some(kind))
        .collect()
}

fn print_outcome(dbs: &Databases, outcome: &PairOutcome) {
    println!(
        "  {} {} ~ {}  score={:.3}",
        outcome.db_id.dimmed(),
        outcome.left().to_string().white().bold(),
        outcome.right().to_string().white().bold(),
        outcome.score
    );
    println!("    {}", outcome.explain);

    let evidence = dbs
        .get(&outcome.db_id)
        .and_then(|db| gather(db.as_ref(), outcome));
    match evidence {
        Ok(e) => {
            println!("    left  ({:>4} distinct) {:?}", e.left_distinct, e.left_sample);
            println!("    right ({:>4} distinct) {:?}", e.right_distinct, e.right_sample);
            println!("    shared {} {:?}", e.shared, e.shared_sample);
        }
        Err(e) => println!("    {} {}", "values unavailable:".red(), e),
    }
}

pub fn run(spider_dir: PathBuf, run_dir: PathBuf, k: usize) -> CliResult<()> {
    let path = run_dir.join("predictions.jsonl");
    require_file(&path)?;
    let outcomes = read_jsonl::<PairOutcome>(&path)?;
    let dbs = Databases::new(&spider_dir);

    println!(
        "{} {} ({} pairs)",
        "Failures in".cyan().bold(),
        run_dir.display(),
        outcomes.len()
    );
    for kind in [FailureKind::FalseNegative, FailureKind::FalsePositive] {
        let failures = select(&outcomes, kind);
        println!();
        println!(
            "{} {}",
            kind.title().yellow().bold(),
            format!("{} total, showing {}", failures.len(), failures.len().min(k)).dimmed()
        );
        for outcome in failures.into_iter().take(k) {
            print_outcome(&dbs, outcome);
        }
    }
    Ok(())
}
