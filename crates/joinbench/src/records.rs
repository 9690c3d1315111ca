//! Benchmark dataset records and their prediction outputs, as JSON lines.

use std::fs;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::error::{JoinBenchError, Result};
use crate::predict::{PairPrediction, QueryPrediction};
use crate::schema::{CandidateEdge, ColumnRef};

/// Accept `0`/`1`, booleans and their string forms.
fn flag<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<bool, D::Error> {
    let value = Value::deserialize(deserializer)?;
    match &value {
        Value::Bool(b) => Ok(*b),
        Value::Number(n) => Ok(n.as_f64() == Some(1.0)),
        Value::String(s) => Ok(matches!(s.trim(), "1" | "true" | "True")),
        _ => Err(serde::de::Error::custom(format!("invalid label: {}", value))),
    }
}

/// One labeled column pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PairExample {
    pub db_id: String,
    pub left_table: String,
    pub left_column: String,
    pub right_table: String,
    pub right_column: String,
    #[serde(deserialize_with = "flag")]
    pub label: bool,
    /// Any other input fields, carried through to the output.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl PairExample {
    pub fn left(&self) -> ColumnRef {
        ColumnRef::new(&self.left_table, &self.left_column)
    }

    pub fn right(&self) -> ColumnRef {
        ColumnRef::new(&self.right_table, &self.right_column)
    }
}

/// A pair example with its prediction; the input `label` becomes `gt_label`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PairOutcome {
    pub db_id: String,
    pub left_table: String,
    pub left_column: String,
    pub right_table: String,
    pub right_column: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
    pub gt_label: u8,
    pub score: f64,
    pub explain: String,
    pub pred_label: u8,
}

impl PairOutcome {
    pub fn new(example: &PairExample, prediction: &PairPrediction) -> Self {
        Self {
            db_id: example.db_id.clone(),
            left_table: example.left_table.clone(),
            left_column: example.left_column.clone(),
            right_table: example.right_table.clone(),
            right_column: example.right_column.clone(),
            extra: example.extra.clone(),
            gt_label: u8::from(example.label),
            score: prediction.score,
            explain: prediction.explanation.clone(),
            pred_label: u8::from(prediction.label),
        }
    }

    pub fn left(&self) -> ColumnRef {
        ColumnRef::new(&self.left_table, &self.left_column)
    }

    pub fn right(&self) -> ColumnRef {
        ColumnRef::new(&self.right_table, &self.right_column)
    }
}

/// One question with the tables it touches and its gold joins.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryExample {
    pub db_id: String,
    #[serde(default)]
    pub question: String,
    #[serde(default)]
    pub tables_in_query: Vec<String>,
    /// Canonicalized on read.
    #[serde(default)]
    pub gold_joins: Vec<CandidateEdge>,
}

/// A query example with its predicted joins.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryOutcome {
    pub db_id: String,
    pub question: String,
    pub tables_in_query: Vec<String>,
    pub gold_joins: Vec<CandidateEdge>,
    pub pred_joins: Vec<CandidateEdge>,
    pub explain: String,
}

/// Edges a query got wrong.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryFailure {
    pub db_id: String,
    pub question: String,
    pub missed: Vec<CandidateEdge>,
    pub extra: Vec<CandidateEdge>,
}

impl QueryOutcome {
    pub fn new(example: &QueryExample, prediction: QueryPrediction) -> Self {
        let mut gold_joins = example.gold_joins.clone();
        gold_joins.sort();
        gold_joins.dedup();
        Self {
            db_id: example.db_id.clone(),
            question: example.question.clone(),
            tables_in_query: example.tables_in_query.clone(),
            gold_joins,
            pred_joins: prediction.pred_joins,
            explain: prediction.explain,
        }
    }

    /// `None` when predicted and gold edges agree.
    pub fn failure(&self) -> Option<QueryFailure> {
        let missed: Vec<_> = self
            .gold_joins
            .iter()
            .filter(|e| !self.pred_joins.contains(e))
            .cloned()
            .collect();
        let extra: Vec<_> = self
            .pred_joins
            .iter()
            .filter(|e| !self.gold_joins.contains(e))
            .cloned()
            .collect();
        if missed.is_empty() && extra.is_empty() {
            return None;
        }
        Some(QueryFailure {
            db_id: self.db_id.clone(),
            question: self.question.clone(),
            missed,
            extra,
        })
    }
}

fn io_error(path: &Path, source: std::io::Error) -> JoinBenchError {
    JoinBenchError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Read one JSON value per non-blank line.
pub fn read_jsonl<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let file = fs::File::open(path).map_err(|e| io_error(path, e))?;
    let mut out = Vec::new();
    for line in BufReader::new(file).lines() {
        let line = line.map_err(|e| io_error(path, e))?;
        if line.trim().is_empty() {
            continue;
        }
        out.push(serde_json::from_str(&line)?);
    }
    Ok(out)
}

/// Write one JSON value per line.
pub fn write_jsonl<T: Serialize>(path: &Path, items: &[T]) -> Result<()> {
    let file = fs::File::create(path).map_err(|e| io_error(path, e))?;
    let mut writer = BufWriter::new(file);
    for item in items {
        serde_json::to_writer(&mut writer, item)?;
        writer.write_all(b"\n").map_err(|e| io_error(path, e))?;
    }
    writer.flush().map_err(|e| io_error(path, e))
}

/// Write pretty-printed JSON.
pub fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let text = serde_json::to_string_pretty(value)?;
    fs::write(path, text).map_err(|e| io_error(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::ScoreResult;

    #[test]
    fn test_pair_example_labels_and_extra_fields() {
        let line = r#"{"db_id": "music", "left_table": "song", "left_column": "artist_id",
                       "right_table": "artist", "right_column": "id", "label": 1, "source": "fk"}"#;
        let ex: PairExample = serde_json::from_str(line).unwrap();
        assert!(ex.label);
        assert_eq!(ex.extra["source"], "fk");

        let prediction = ScoreResult::thresholded(0.4, 0.5, "J=0.400");
        let out = serde_json::to_value(PairOutcome::new(&ex, &prediction)).unwrap();
        assert_eq!(out["gt_label"], 1);
        assert_eq!(out["pred_label"], 0);
        assert_eq!(out["source"], "fk");
        assert!(out.get("label").is_none());
    }

    #[test]
    fn test_query_example_canonicalizes_gold() {
        let line = r#"{"db_id": "d", "question": "q", "tables_in_query": ["b", "a"],
                       "gold_joins": [{"left_table": "b", "left_column": "a_id",
                                       "right_table": "a", "right_column": "id"}]}"#;
        let ex: QueryExample = serde_json::from_str(line).unwrap();
        assert_eq!(ex.gold_joins[0].left(), &ColumnRef::new("a", "id"));
    }

    #[test]
    fn test_failure_lists_missed_and_extra() {
        let gold = CandidateEdge::from_parts("a", "id", "b", "a_id");
        let wrong = CandidateEdge::from_parts("a", "name", "b", "name");
        let ex = QueryExample {
            db_id: "d".into(),
            question: "q".into(),
            tables_in_query: vec!["a".into(), "b".into()],
            gold_joins: vec![gold.clone(), gold.clone()],
        };

        let hit = QueryOutcome::new(
            &ex,
            QueryPrediction {
                pred_joins: vec![gold.clone()],
                explain: String::new(),
            },
        );
        assert_eq!(hit.gold_joins.len(), 1);
        assert!(hit.failure().is_none());

        let miss = QueryOutcome::new(
            &ex,
            QueryPrediction {
                pred_joins: vec![wrong.clone()],
                explain: String::new(),
            },
        );
        let failure = miss.failure().unwrap();
        assert_eq!(failure.missed, vec![gold]);
        assert_eq!(failure.extra, vec![wrong]);
    }

    #[test]
    fn test_jsonl_roundtrip_skips_blank_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("items.jsonl");
        fs::write(&path, "{\"a\": 1}\n\n{\"a\": 2}\n").unwrap();
        let items: Vec<Value> = read_jsonl(&path).unwrap();
        assert_eq!(items.len(), 2);

        let out = dir.path().join("out.jsonl");
        write_jsonl(&out, &items).unwrap();
        assert_eq!(fs::read_to_string(&out).unwrap(), "{\"a\":1}\n{\"a\":2}\n");

        let missing = read_jsonl::<Value>(&dir.path().join("nope.jsonl")).unwrap_err();
        assert!(matches!(missing, JoinBenchError::Io { .. }));
    }
}
