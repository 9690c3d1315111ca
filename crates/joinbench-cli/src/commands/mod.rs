//! CLI command implementations.

pub mod failures;
pub mod pairs;
pub mod probe;
pub mod queries;
pub mod summarize;
pub mod sweep;

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use colored::Colorize;
use joinbench::metrics::PairMetrics;
use joinbench::records::write_json;
use joinbench::{ClientConfig, GeminiProvider, MockProvider, RateLimitedClient, SpiderLayout, SqliteSource};
use serde::{Deserialize, Serialize};
use tracing::info;

pub type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

/// Requests per minute granted to the mock responder.
const MOCK_RPM: usize = 6000;

/// Canned reply for `--mock-llm`, keyed off the prompt kind.
pub fn mock_reply(prompt: &str) -> String {
    if prompt.contains("Question: ") {
        r#"{"chosen": [0], "reason": "mock"}"#.to_string()
    } else {
        r#"{"label": 0, "score": 0.0, "reason": "mock"}"#.to_string()
    }
}

/// Build the one inference client shared by every predictor of a run.
pub fn build_client(mock_llm: bool) -> joinbench::Result<Arc<RateLimitedClient>> {
    if mock_llm {
        let config = ClientConfig::default().with_rpm(MOCK_RPM);
        let provider = MockProvider::new().with_fallback(|prompt| Ok(mock_reply(prompt)));
        return Ok(Arc::new(RateLimitedClient::new(provider, &config)));
    }

    let config = ClientConfig::from_env()?;
    let provider = GeminiProvider::from_config(&config)?;
    info!(model = provider.model(), rpm = config.rpm, "using inference service");
    Ok(Arc::new(RateLimitedClient::new(provider, &config)))
}

/// Databases of a Spider root, opened on first use and shared across threads.
pub struct Databases {
    layout: SpiderLayout,
    open: Mutex<HashMap<String, Arc<SqliteSource>>>,
}

impl Databases {
    pub fn new(spider_dir: impl Into<PathBuf>) -> Self {
        Self {
            layout: SpiderLayout::new(spider_dir),
            open: Mutex::new(HashMap::new()),
        }
    }

    pub fn get(&self, db_id: &str) -> joinbench::Result<Arc<SqliteSource>> {
        let mut open = self.open.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(db) = open.get(db_id) {
            return Ok(Arc::clone(db));
        }
        let db = Arc::new(self.layout.open(db_id)?);
        open.insert(db_id.to_string(), Arc::clone(&db));
        Ok(db)
    }
}

/// Create `<outdir>/<kind>_<method>_<timestamp>`.
pub fn run_dir(outdir: &Path, kind: &str, method: &str) -> std::io::Result<PathBuf> {
    let stamp = chrono::Local::now().format("%Y%m%d-%H%M%S");
    let dir = outdir.join(format!("{}_{}_{}", kind, method, stamp));
    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}

/// `meta.json`: what a run directory was produced with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunMeta {
    pub method: String,
    /// Decision threshold in effect; `None` when the method has none.
    pub threshold: Option<f64>,
    /// Examples evaluated.
    pub n: usize,
    /// Every threshold of a sweep.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub thresholds: Vec<f64>,
}

impl RunMeta {
    pub fn new(method: impl ToString, threshold: Option<f64>, n: usize) -> Self {
        Self {
            method: method.to_string(),
            threshold,
            n,
            thresholds: Vec::new(),
        }
    }

    pub fn with_thresholds(mut self, thresholds: &[f64]) -> Self {
        self.thresholds = thresholds.to_vec();
        self
    }

    pub fn write(&self, dir: &Path) -> joinbench::Result<()> {
        write_json(&dir.join("meta.json"), self)
    }
}

/// Keep the first `limit` items, if a limit is set.
pub fn apply_limit<T>(mut items: Vec<T>, limit: Option<usize>) -> Vec<T> {
    if let Some(n) = limit.filter(|&n| n > 0) {
        items.truncate(n);
    }
    items
}

pub fn require_file(path: &Path) -> CliResult<()> {
    if !path.is_file() {
        return Err(format!("File not found: {}", path.display()).into());
    }
    Ok(())
}

pub fn print_pair_metrics(metrics: &PairMetrics) {
    let c = &metrics.counts;
    println!(
        "F1 {}  P {:.3}  R {:.3}  Acc {:.3}",
        format!("{:.3}", metrics.f1).white().bold(),
        metrics.precision,
        metrics.recall,
        metrics.accuracy
    );
    println!(
        "tp={} fp={} fn={} tn={}",
        c.tp.to_string().green(),
        c.fp.to_string().red(),
        c.fn_.to_string().yellow(),
        c.tn
    );
}

pub fn print_saved(dir: &Path) {
    println!();
    println!("{} {}", "Saved to".green().bold(), dir.display().to_string().white());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_reply_by_prompt_kind() {
        let choice = mock_reply("Database: d\nQuestion: how many?");
        assert!(choice.contains("\"chosen\""));
        let pair = mock_reply("LEFT column: a.b");
        assert!(pair.contains("\"label\""));
    }

    #[test]
    fn test_apply_limit() {
        assert_eq!(apply_limit(vec![1, 2, 3], Some(2)), vec![1, 2]);
        assert_eq!(apply_limit(vec![1, 2, 3], Some(0)), vec![1, 2, 3]);
        assert_eq!(apply_limit(vec![1, 2, 3], None), vec![1, 2, 3]);
    }

    #[test]
    fn test_run_dir_name() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = run_dir(tmp.path(), "pairs", "jaccard").unwrap();
        assert!(dir.is_dir());
        let name = dir.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("pairs_jaccard_"));
        assert_eq!(name.len(), "pairs_jaccard_".len() + "YYYYmmdd-HHMMSS".len());
    }

    #[test]
    fn test_run_meta_file() {
        let tmp = tempfile::tempdir().unwrap();
        RunMeta::new("jaccard", Some(0.05), 12).write(tmp.path()).unwrap();
        let text = std::fs::read_to_string(tmp.path().join("meta.json")).unwrap();
        let json: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(json, serde_json::json!({"method": "jaccard", "threshold": 0.05, "n": 12}));

        let sweep = RunMeta::new("llm", None, 3).with_thresholds(&[0.1, 0.2]);
        let back: RunMeta = serde_json::from_value(serde_json::to_value(&sweep).unwrap()).unwrap();
        assert_eq!(back, sweep);
    }

    #[test]
    fn test_missing_database_is_reported() {
        let tmp = tempfile::tempdir().unwrap();
        let dbs = Databases::new(tmp.path());
        let err = dbs.get("nope").unwrap_err();
        assert_eq!(err.kind(), joinbench::ErrorKind::MissingSource);
    }
}
