//! CLI argument definitions using clap.

use clap::{Parser, Subcommand};
use joinbench::Method;
use std::path::PathBuf;

/// joinbench: benchmark join-key detection on Spider-style databases
#[derive(Parser)]
#[command(name = "joinbench")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output (debug logging)
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Score labeled column pairs and report precision/recall
    Pairs {
        /// Spider root (contains database/<db_id>/<db_id>.sqlite)
        #[arg(long, value_name = "DIR")]
        spider_dir: PathBuf,

        /// Labeled pairs, one JSON object per line
        #[arg(long, value_name = "JSONL")]
        pairs: PathBuf,

        /// Scoring methods, comma-separated; each gets its own run directory
        #[arg(short, long = "method", value_delimiter = ',', default_value = "jaccard")]
        methods: Vec<MethodChoice>,

        /// Decision thresholds: one for every method, or one per method
        /// (defaults depend on the method)
        #[arg(short, long = "threshold", value_delimiter = ',')]
        thresholds: Vec<f64>,

        /// Only run the first N pairs
        #[arg(long)]
        limit: Option<usize>,

        /// Parent directory for the run directory
        #[arg(short, long, default_value = "runs")]
        outdir: PathBuf,

        /// Worker threads sharing one inference client
        #[arg(short, long, default_value = "1")]
        workers: usize,

        /// Never fall back to names for sparse columns
        #[arg(long)]
        no_fallback: bool,

        /// Use a canned local responder instead of the inference service
        #[arg(long)]
        mock_llm: bool,
    },

    /// Predict the joins each question needs and report edge-level metrics
    Queries {
        /// Spider root (contains database/<db_id>/<db_id>.sqlite)
        #[arg(long, value_name = "DIR")]
        spider_dir: PathBuf,

        /// Questions with gold joins, one JSON object per line
        #[arg(long, value_name = "JSONL")]
        gold: PathBuf,

        /// Prediction method (llm picks among candidates; others score every column pair)
        #[arg(short, long, default_value = "llm")]
        method: MethodChoice,

        /// Decision threshold for overlap methods
        #[arg(short, long)]
        threshold: Option<f64>,

        /// Cap on candidate edges shown to the model
        #[arg(long, default_value_t = joinbench::DEFAULT_MAX_CANDIDATES)]
        max_candidates: usize,

        /// Only run the first N questions
        #[arg(long)]
        limit: Option<usize>,

        /// Parent directory for the run directory
        #[arg(short, long, default_value = "runs")]
        outdir: PathBuf,

        /// Score sparse columns by values too, never by names
        #[arg(long)]
        no_fallback: bool,

        /// Use a canned local responder instead of the inference service
        #[arg(long)]
        mock_llm: bool,
    },

    /// Evaluate a pair method over a range of thresholds
    Sweep {
        /// Spider root (contains database/<db_id>/<db_id>.sqlite)
        #[arg(long, value_name = "DIR")]
        spider_dir: PathBuf,

        /// Labeled pairs, one JSON object per line
        #[arg(long, value_name = "JSONL")]
        pairs: PathBuf,

        /// Scoring method
        #[arg(short, long)]
        method: MethodChoice,

        /// Comma list ("0.01,0.05") or inclusive range ("start:stop:step")
        #[arg(long, default_value = "0.00:0.50:0.05")]
        thresholds: String,

        /// Only run the first N pairs
        #[arg(long)]
        limit: Option<usize>,

        /// Parent directory for the run directory
        #[arg(short, long, default_value = "runs")]
        outdir: PathBuf,

        /// Never fall back to names for sparse columns
        #[arg(long)]
        no_fallback: bool,

        /// Use a canned local responder instead of the inference service
        #[arg(long)]
        mock_llm: bool,
    },

    /// Show how a column resolves and what values it holds
    Probe {
        /// Spider root (contains database/<db_id>/<db_id>.sqlite)
        #[arg(long, value_name = "DIR")]
        spider_dir: PathBuf,

        /// Database id, e.g. concert_singer
        #[arg(long)]
        db_id: String,

        /// Table name (case and spelling drift are tolerated)
        #[arg(long)]
        table: String,

        /// Column name (case and spelling drift are tolerated)
        #[arg(long)]
        column: String,

        /// Number of sample values to show
        #[arg(short, long, default_value = "10")]
        n: usize,
    },

    /// Show the false negatives and false positives of a pair run
    Failures {
        /// Spider root (contains database/<db_id>/<db_id>.sqlite)
        #[arg(long, value_name = "DIR")]
        spider_dir: PathBuf,

        /// Pair run directory holding predictions.jsonl
        #[arg(long, value_name = "DIR")]
        run_dir: PathBuf,

        /// Pairs to show per error kind
        #[arg(short, long, default_value = "5")]
        k: usize,
    },

    /// Report the best run per method from a runs directory
    Summarize {
        /// Directory holding run directories
        #[arg(long, default_value = "runs")]
        runs_dir: PathBuf,

        /// Comma-separated methods to report
        #[arg(long, default_value = "jaccard,containment,name,llm")]
        methods: String,

        /// Runs to show per method
        #[arg(long, default_value = "1")]
        top_k: usize,

        /// Also write the summary as Markdown to this file
        #[arg(long, value_name = "FILE")]
        out_md: Option<PathBuf>,
    },
}

/// Prediction method for benchmark commands
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MethodChoice {
    /// Jaccard overlap of distinct values
    Jaccard,
    /// Containment of the smaller value set
    Containment,
    /// Column and table names only
    Name,
    /// External inference service
    Llm,
}

impl MethodChoice {
    /// The value-based scoring method, if this is not the LLM.
    pub fn scoring(self) -> Option<Method> {
        match self {
            MethodChoice::Jaccard => Some(Method::Jaccard),
            MethodChoice::Containment => Some(Method::Containment),
            MethodChoice::Name => Some(Method::Name),
            MethodChoice::Llm => None,
        }
    }
}

impl std::str::FromStr for MethodChoice {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "jaccard" => Ok(MethodChoice::Jaccard),
            "containment" => Ok(MethodChoice::Containment),
            "name" | "heuristic" => Ok(MethodChoice::Name),
            "llm" | "gemini" => Ok(MethodChoice::Llm),
            _ => Err(format!(
                "Unknown method: {}. Use: jaccard, containment, name, or llm.",
                s
            )),
        }
    }
}

impl std::fmt::Display for MethodChoice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MethodChoice::Jaccard => write!(f, "jaccard"),
            MethodChoice::Containment => write!(f, "containment"),
            MethodChoice::Name => write!(f, "name"),
            MethodChoice::Llm => write!(f, "llm"),
        }
    }
}
