//! Column references and identifier canonicalization.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Canonical form of an identifier for loose matching.
///
/// Lower-cases, collapses every run of non-alphanumeric characters into a
/// single `_` and trims underscores at both ends: `"Song ID"` and
/// `"song__id_"` both become `"song_id"`.
pub fn canonical_ident(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut last_sep = false;
    for ch in s.chars().flat_map(char::to_lowercase) {
        if ch.is_alphanumeric() {
            out.push(ch);
            last_sep = false;
        } else if !last_sep {
            out.push('_');
            last_sep = true;
        }
    }
    out.trim_matches('_').to_string()
}

/// Maximal alphanumeric runs of a name, lower-cased.
pub fn name_tokens(s: &str) -> Vec<String> {
    s.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// A `(table, column)` reference as spelled in a database or dataset.
///
/// Equality and ordering are on the literal spelling; use
/// [`ColumnRef::matches`] for the case- and punctuation-insensitive
/// identity used when matching hints against a database.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ColumnRef {
    pub table: String,
    pub column: String,
}

impl ColumnRef {
    /// Create a new column reference.
    pub fn new(table: impl Into<String>, column: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            column: column.into(),
        }
    }

    /// Canonical `(table, column)` pair.
    pub fn canonical(&self) -> (String, String) {
        (canonical_ident(&self.table), canonical_ident(&self.column))
    }

    /// Whether both references name the same column modulo case and punctuation.
    pub fn matches(&self, other: &ColumnRef) -> bool {
        self.canonical() == other.canonical()
    }
}

impl fmt::Display for ColumnRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.table, self.column)
    }
}
