//! Read-only access to the relational store: identifier catalogs,
//! distinct column values and table metadata.
//!
//! Scoring is storage-agnostic. Everything it needs from a database goes
//! through the three traits here; [`SqliteSource`] implements them for a
//! SQLite file and [`MemorySource`] for fixtures.

mod memory;
mod sqlite;

pub use memory::MemorySource;
pub use sqlite::{SpiderLayout, SqliteSource, quote_ident};

use crate::error::Result;
use crate::schema::{TableMeta, ValueSet};

/// Default cap on distinct values loaded per column for overlap scoring.
pub const DEFAULT_SAMPLE_LIMIT: usize = 50_000;

/// Identifier lists of a database, in the database's own order.
pub trait Catalog: Send + Sync {
    fn table_names(&self) -> Result<Vec<String>>;

    fn column_names(&self, table: &str) -> Result<Vec<String>>;
}

/// Loads the distinct, normalized, non-null values of a column.
pub trait ValueLoader: Send + Sync {
    /// `table` and `column` must already be resolved identifiers.
    /// `sample_limit` caps the number of distinct raw values read.
    fn load_values(
        &self,
        table: &str,
        column: &str,
        sample_limit: Option<usize>,
    ) -> Result<ValueSet>;
}

/// Column lists, primary-key flags and declared foreign keys.
pub trait MetadataSource: Send + Sync {
    fn table_meta(&self, table: &str) -> Result<TableMeta>;
}

/// Everything a predictor needs from one database.
pub trait Database: Catalog + ValueLoader + MetadataSource {
    /// Short name used in prompts (e.g. the Spider `db_id`).
    fn db_id(&self) -> &str;
}
