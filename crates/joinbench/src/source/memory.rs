//! In-memory database, for fixtures and tests.

use indexmap::IndexMap;

use crate::error::{JoinBenchError, Result};
use crate::schema::{ColumnMeta, TableMeta, ValueSet};

use super::{Catalog, Database, MetadataSource, ValueLoader};

/// Tables with declared metadata and raw column values.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    db_id: String,
    tables: IndexMap<String, MemoryTable>,
}

#[derive(Debug, Clone, Default)]
struct MemoryTable {
    meta: TableMeta,
    values: IndexMap<String, Vec<Option<String>>>,
}

impl MemorySource {
    pub fn new(db_id: impl Into<String>) -> Self {
        Self {
            db_id: db_id.into(),
            tables: IndexMap::new(),
        }
    }

    /// Add (or replace) a table's metadata.
    pub fn with_table(mut self, meta: TableMeta) -> Self {
        let entry = self.tables.entry(meta.name.clone()).or_default();
        entry.meta = meta;
        self
    }

    /// Set the raw values of a column, declaring the column if needed.
    pub fn with_values<I, S>(mut self, table: &str, column: &str, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let entry = self.tables.entry(table.to_string()).or_default();
        if entry.meta.name.is_empty() {
            entry.meta.name = table.to_string();
        }
        if !entry.meta.columns.iter().any(|c| c.name == column) {
            entry.meta.columns.push(ColumnMeta::new(column));
        }
        entry.values.insert(
            column.to_string(),
            values.into_iter().map(|v| Some(v.into())).collect(),
        );
        self
    }

    fn table(&self, table: &str) -> Result<&MemoryTable> {
        self.tables
            .get(table)
            .ok_or_else(|| JoinBenchError::Config(format!("no such table: {}", table)))
    }
}

impl Catalog for MemorySource {
    fn table_names(&self) -> Result<Vec<String>> {
        Ok(self.tables.keys().cloned().collect())
    }

    fn column_names(&self, table: &str) -> Result<Vec<String>> {
        // SQLite reports no columns for an unknown table; mirror that.
        Ok(self
            .tables
            .get(table)
            .map(|t| t.meta.column_names())
            .unwrap_or_default())
    }
}

impl ValueLoader for MemorySource {
    fn load_values(
        &self,
        table: &str,
        column: &str,
        sample_limit: Option<usize>,
    ) -> Result<ValueSet> {
        let raw = self.table(table)?.values.get(column);
        let limit = sample_limit.filter(|&n| n > 0).unwrap_or(usize::MAX);
        Ok(raw
            .map(|vals| ValueSet::from_raw(vals.iter().take(limit).map(|v| v.as_deref())))
            .unwrap_or_default())
    }
}

impl MetadataSource for MemorySource {
    fn table_meta(&self, table: &str) -> Result<TableMeta> {
        Ok(self.table(table)?.meta.clone())
    }
}

impl Database for MemorySource {
    fn db_id(&self) -> &str {
        &self.db_id
    }
}
