//! Summarize command - best runs per method from a runs directory, printed
//! and optionally written as Markdown.

use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use colored::Colorize;
use serde::Deserialize;
use tracing::{debug, info};

use super::CliResult;

/// The fields every metrics file shares; query runs have no accuracy.
#[derive(Debug, Clone, Deserialize)]
struct Scores {
    f1: f64,
    precision: f64,
    recall: f64,
    #[serde(default)]
    accuracy: Option<f64>,
    #[serde(default)]
    threshold: Option<f64>,
}

#[derive(Debug, Clone)]
struct RunSummary {
    kind: &'static str,
    dir: PathBuf,
    scores: Scores,
}

fn read_json<T: for<'de> Deserialize<'de>>(path: &Path) -> Option<T> {
    let text = fs::read_to_string(path).ok()?;
    serde_json::from_str(&text).ok()
}

/// Summarize one run directory, or `None` if it has no readable results.
fn summarize_dir(dir: &Path) -> Option<RunSummary> {
    let (kind, scores) = if dir.join("metrics.json").is_file() {
        ("single", read_json::<Scores>(&dir.join("metrics.json"))?)
    } else if dir.join("best.json").is_file() {
        ("sweep-best", read_json::<Scores>(&dir.join("best.json"))?)
    } else {
        let rows: Vec<Scores> = read_json(&dir.join("sweep.json"))?;
        let best = rows.into_iter().fold(None, |best: Option<Scores>, row| match best {
            Some(b) if b.f1 >= row.f1 => Some(b),
            _ => Some(row),
        })?;
        ("sweep-list", best)
    };
    Some(RunSummary {
        kind,
        dir: dir.to_path_buf(),
        scores,
    })
}

/// Method segment of `<kind>_<method>_<timestamp>`.
fn run_method(dir: &Path) -> Option<String> {
    let name = dir.file_name()?.to_string_lossy().to_string();
    name.split('_').nth(1).map(str::to_string)
}

fn collect_runs(runs_dir: &Path, method: &str) -> CliResult<Vec<RunSummary>> {
    let mut dirs: Vec<PathBuf> = fs::read_dir(runs_dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.is_dir())
        .collect();
    dirs.sort();

    let mut runs = Vec::new();
    for dir in dirs {
        if run_method(&dir).as_deref() != Some(method) {
            continue;
        }
        match summarize_dir(&dir) {
            Some(run) => runs.push(run),
            None => debug!(dir = %dir.display(), "skipping run without readable metrics"),
        }
    }
    Ok(runs)
}

fn fmt_opt(v: Option<f64>) -> String {
    v.map(|x| format!("{:.3}", x)).unwrap_or_else(|| "-".to_string())
}

/// Best `top_k` runs of `method`, highest F1 first.
fn top_runs(runs_dir: &Path, method: &str, top_k: usize) -> CliResult<Vec<RunSummary>> {
    let mut runs = collect_runs(runs_dir, method)?;
    runs.sort_by(|a, b| b.scores.f1.total_cmp(&a.scores.f1));
    runs.truncate(top_k.max(1));
    Ok(runs)
}

fn print_section(method: &str, runs: &[RunSummary]) {
    if runs.is_empty() {
        println!("{}", format!("(no runs found for {})", method).dimmed());
        return;
    }
    println!();
    println!("{} top {}", method.to_uppercase().cyan().bold(), runs.len());
    println!(
        "  {:11} {:>6} {:>6} {:>6} {:>6} {:>6}  run",
        "kind", "thr", "F1", "P", "R", "Acc"
    );
    for run in runs {
        let s = &run.scores;
        println!(
            "  {:11} {:>6} {:>6} {:>6.3} {:>6.3} {:>6}  {}",
            run.kind,
            fmt_opt(s.threshold),
            format!("{:.3}", s.f1).white().bold(),
            s.precision,
            s.recall,
            fmt_opt(s.accuracy),
            run.dir.display()
        );
    }
}

/// GitHub-flavored Markdown: one table per method that has runs.
fn markdown(sections: &[(String, Vec<RunSummary>)]) -> String {
    let mut out = String::from("# Results summary\n");
    for (method, runs) in sections {
        if runs.is_empty() {
            continue;
        }
        let _ = writeln!(out, "\n## {} - top {}\n", method.to_uppercase(), runs.len());
        out.push_str("| kind | thr | F1 | P | R | Acc | run |\n");
        out.push_str("|---|---|---|---|---|---|---|\n");
        for run in runs {
            let s = &run.scores;
            let _ = writeln!(
                out,
                "| {} | {} | {:.3} | {:.3} | {:.3} | {} | {} |",
                run.kind,
                fmt_opt(s.threshold),
                s.f1,
                s.precision,
                s.recall,
                fmt_opt(s.accuracy),
                run.dir.display()
            );
        }
    }
    out
}

pub fn run(runs_dir: PathBuf, methods: String, top_k: usize, out_md: Option<PathBuf>) -> CliResult<()> {
    if !runs_dir.is_dir() {
        return Err(format!("Runs directory not found: {}", runs_dir.display()).into());
    }

    let mut sections = Vec::new();
    for method in methods.split(',').map(str::trim).filter(|m| !m.is_empty()) {
        let runs = top_runs(&runs_dir, method, top_k)?;
        print_section(method, &runs);
        sections.push((method.to_string(), runs));
    }

    if let Some(path) = out_md {
        fs::write(&path, markdown(&sections))?;
        info!(path = %path.display(), "wrote markdown summary");
        println!();
        println!("{} {}", "Wrote Markdown summary to".green().bold(), path.display());
    }
    Ok(())
}
