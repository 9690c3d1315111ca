//! Canonical unordered column pairs.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::column::ColumnRef;

/// Generation tier of a candidate edge. Orders generation only; it is not
/// part of an edge's identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeTier {
    /// Declared foreign key.
    DeclaredFk,
    /// Primary key (or id-like) against id-like (or primary key).
    PkVsIdLike,
    /// id-like against id-like.
    IdLikeVsIdLike,
    /// Identical case-insensitive column names.
    SameName,
}

/// An unordered pair of columns proposed as an equality-join key.
///
/// Stored with `left <= right` so `{A.x, B.y}` and `{B.y, A.x}` compare
/// and hash equal.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "EdgeRecord", into = "EdgeRecord")]
pub struct CandidateEdge {
    left: ColumnRef,
    right: ColumnRef,
}

impl CandidateEdge {
    /// Build the canonical edge for two columns in either order.
    pub fn new(a: ColumnRef, b: ColumnRef) -> Self {
        if b < a {
            Self { left: b, right: a }
        } else {
            Self { left: a, right: b }
        }
    }

    /// Shorthand for `new(ColumnRef::new(lt, lc), ColumnRef::new(rt, rc))`.
    pub fn from_parts(
        left_table: impl Into<String>,
        left_column: impl Into<String>,
        right_table: impl Into<String>,
        right_column: impl Into<String>,
    ) -> Self {
        Self::new(
            ColumnRef::new(left_table, left_column),
            ColumnRef::new(right_table, right_column),
        )
    }

    pub fn left(&self) -> &ColumnRef {
        &self.left
    }

    pub fn right(&self) -> &ColumnRef {
        &self.right
    }
}

impl fmt::Display for CandidateEdge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} = {}", self.left, self.right)
    }
}

/// Flat wire form of an edge, as used in benchmark files and prompts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeRecord {
    pub left_table: String,
    pub left_column: String,
    pub right_table: String,
    pub right_column: String,
}

impl From<EdgeRecord> for CandidateEdge {
    fn from(r: EdgeRecord) -> Self {
        CandidateEdge::from_parts(r.left_table, r.left_column, r.right_table, r.right_column)
    }
}

impl From<CandidateEdge> for EdgeRecord {
    fn from(e: CandidateEdge) -> Self {
        EdgeRecord {
            left_table: e.left.table,
            left_column: e.left.column,
            right_table: e.right.table,
            right_column: e.right.column,
        }
    }
}
