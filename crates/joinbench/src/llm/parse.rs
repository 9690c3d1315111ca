//! Extraction and validation of the JSON object in a model reply.
//!
//! Replies are supposed to be one bare JSON object but often arrive wrapped
//! in prose or markdown fences. Every failure here is a
//! [`JoinBenchError::MalformedResponse`], which is what lets predictors
//! retry once with a reinforced prompt.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};

use crate::error::{JoinBenchError, Result};

/// Maximum characters kept from a model's `reason`.
pub const MAX_REASON_CHARS: usize = 200;

/// A flat object: no nested braces.
static FLAT_OBJECT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{[^{}]*\}").expect("valid flat object regex"));

fn parses(candidate: &str) -> bool {
    serde_json::from_str::<Value>(candidate).is_ok_and(|v| v.is_object())
}

/// Locate the first JSON object in `text`.
///
/// A flat object starting at the first `{` is taken directly. Otherwise
/// balanced blocks are scanned in order, ignoring braces inside JSON
/// strings, and the first one that parses wins.
pub fn extract_json_block(text: &str) -> Option<&str> {
    let first = text.find('{')?;
    if let Some(m) = FLAT_OBJECT.find(text) {
        if m.start() == first && parses(m.as_str()) {
            return Some(m.as_str());
        }
    }

    let bytes = text.as_bytes();
    let mut start = first;
    loop {
        if let Some(end) = balanced_end(bytes, start) {
            let block = &text[start..=end];
            if parses(block) {
                return Some(block);
            }
        }
        start += 1 + text[start + 1..].find('{')?;
    }
}

/// Index of the `}` closing the object that opens at `start`.
fn balanced_end(bytes: &[u8], start: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for (i, &b) in bytes.iter().enumerate().skip(start) {
        if in_string {
            match b {
                _ if escaped => escaped = false,
                b'\\' => escaped = true,
                b'"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match b {
            b'"' => in_string = true,
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

fn malformed(message: impl Into<String>) -> JoinBenchError {
    JoinBenchError::MalformedResponse(message.into())
}

fn json_object(text: &str) -> Result<Map<String, Value>> {
    if text.trim().is_empty() {
        return Err(malformed("empty response"));
    }
    let block = extract_json_block(text).ok_or_else(|| malformed("no JSON object found"))?;
    match serde_json::from_str(block) {
        Ok(Value::Object(map)) => Ok(map),
        _ => Err(malformed("no JSON object found")),
    }
}

fn reason(obj: &Map<String, Value>) -> String {
    let raw = match obj.get("reason") {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    };
    raw.chars().take(MAX_REASON_CHARS).collect()
}

fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    }
}

/// Parsed answer to a pair prompt.
#[derive(Debug, Clone, PartialEq)]
pub struct PairAnswer {
    /// The model's raw label was exactly 1.
    pub label: bool,
    /// Clamped to `[0, 1]`.
    pub score: f64,
    pub reason: String,
}

/// Parse `{"label": 0|1, "score": x, "reason": "..."}`.
pub fn parse_pair_answer(text: &str) -> Result<PairAnswer> {
    let obj = json_object(text)?;
    let label = obj
        .get("label")
        .ok_or_else(|| malformed("missing required field: label"))?;
    let label = as_number(label).ok_or_else(|| malformed("label is not a number"))?;
    let score = obj
        .get("score")
        .ok_or_else(|| malformed("missing required field: score"))?;
    let score = as_number(score)
        .filter(|s| !s.is_nan())
        .ok_or_else(|| malformed("score is not a number"))?;

    Ok(PairAnswer {
        label: label.trunc() == 1.0,
        score: score.clamp(0.0, 1.0),
        reason: reason(&obj),
    })
}

/// Parsed answer to a candidate-selection prompt.
#[derive(Debug, Clone, PartialEq)]
pub struct ChoiceAnswer {
    /// Selected indices in reply order; not yet range-checked.
    pub chosen: Vec<usize>,
    pub reason: String,
}

fn as_index(value: &Value) -> Option<usize> {
    match value {
        Value::Number(n) => {
            if let Some(u) = n.as_u64() {
                return usize::try_from(u).ok();
            }
            let f = n.as_f64()?;
            (f >= 0.0 && f.fract() == 0.0 && f <= usize::MAX as f64).then_some(f as usize)
        }
        Value::String(s) => {
            let s = s.trim();
            if !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit()) {
                s.parse().ok()
            } else {
                None
            }
        }
        _ => None,
    }
}

/// Parse `{"chosen": [i, ...], "reason": "..."}`.
///
/// Entries may be integers, integral floats or digit strings; anything
/// else, negatives included, is dropped.
pub fn parse_choice_answer(text: &str) -> Result<ChoiceAnswer> {
    let obj = json_object(text)?;
    let chosen = match obj.get("chosen") {
        Some(Value::Array(items)) => items.iter().filter_map(as_index).collect(),
        Some(_) => return Err(malformed("chosen is not an array")),
        None => return Err(malformed("missing required field: chosen")),
    };
    Ok(ChoiceAnswer {
        chosen,
        reason: reason(&obj),
    })
}
