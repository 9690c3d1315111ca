//! Prompt templates for join decisions.

use serde::Serialize;

use crate::schema::{CandidateEdge, ColumnRef};

/// Appended to a prompt whose first answer could not be parsed.
pub const JSON_REMINDER: &str = "REMINDER: Reply with ONLY one valid JSON object. No markdown, no extra text.";

/// What the model sees about one side of a column pair.
#[derive(Debug, Clone)]
pub struct ColumnEvidence {
    pub column: ColumnRef,
    /// A few distinct values, sorted.
    pub samples: Vec<String>,
    /// Number of distinct values loaded.
    pub cardinality: usize,
    /// Leading column names of the table, for context.
    pub table_columns: Vec<String>,
}

fn json_list(items: &[String]) -> String {
    serde_json::to_string(items).unwrap_or_else(|_| "[]".to_string())
}

fn side(label: &str, e: &ColumnEvidence) -> String {
    format!(
        "{label} column: {}\n{label} table columns: {}\n{label} distinct sample (size={}): {}",
        e.column,
        json_list(&e.table_columns),
        e.cardinality,
        json_list(&e.samples),
    )
}

/// Prompt asking whether two columns form an equality join key.
pub fn pair_prompt(db_id: &str, left: &ColumnEvidence, right: &ColumnEvidence) -> String {
    format!(
        r#"You are a careful database assistant. Decide whether two SQL columns are an equality join key.

Reply with ONLY a compact JSON object:
  "label": 1 or 0,
  "score": confidence in [0,1] that the columns join by equality,
  "reason": short string (at most 200 characters).

Guidelines:
- Values may be sparse or missing entirely.
- Favor precision: answer 1 only on strong evidence from names, samples or schema.
- Judge only from the names and samples shown. Do not invent values.
- No markdown and no text outside the JSON.

Database: {db_id}

{left}

{right}

JSON:
{{"label": 0, "score": 0.0, "reason": ""}}"#,
        left = side("LEFT", left),
        right = side("RIGHT", right),
    )
}

#[derive(Serialize)]
struct Enumerated<'a> {
    i: usize,
    left_table: &'a str,
    left_column: &'a str,
    right_table: &'a str,
    right_column: &'a str,
}

/// Prompt asking the model to pick, by index, the joins a question needs.
pub fn candidate_prompt(db_id: &str, question: &str, candidates: &[CandidateEdge]) -> String {
    let enumerated: Vec<Enumerated<'_>> = candidates
        .iter()
        .enumerate()
        .map(|(i, e)| Enumerated {
            i,
            left_table: &e.left().table,
            left_column: &e.left().column,
            right_table: &e.right().table,
            right_column: &e.right().column,
        })
        .collect();
    let listing = serde_json::to_string(&enumerated).unwrap_or_else(|_| "[]".to_string());

    format!(
        r#"You are a careful database assistant. Given a question and numbered join candidates, select only the joins needed to answer the question.

Reply with ONLY a JSON object:
  "chosen": [indices of the selected candidates],
  "reason": short string (at most 200 characters).

Guidelines:
- Select from the listed candidates only. Never propose other joins.
- Favor precision; if the question needs no join, return an empty list.
- No markdown and no text outside the JSON.

Database: {db_id}
Question: {question}

Candidates (each has an index "i"):
{listing}

JSON:
{{"chosen": [], "reason": ""}}"#
    )
}

/// `prompt` followed by the stricter output reminder.
pub fn reinforced(prompt: &str) -> String {
    format!("{}\n\n{}", prompt, JSON_REMINDER)
}
