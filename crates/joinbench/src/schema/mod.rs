//! Core data model: column references, value sets, candidate edges and
//! lightweight table metadata.

mod column;
mod edge;
mod table;
mod values;

pub use column::{ColumnRef, canonical_ident, name_tokens};
pub use edge::{CandidateEdge, EdgeRecord, EdgeTier};
pub use table::{ColumnMeta, ForeignKey, TableMeta};
pub use values::ValueSet;
