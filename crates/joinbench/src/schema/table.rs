//! Lightweight table metadata used for candidate generation and prompts.

use serde::{Deserialize, Serialize};

/// A column as declared in the database.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnMeta {
    pub name: String,
    /// Declared type, upper-cased (may be empty).
    #[serde(default)]
    pub data_type: String,
    #[serde(default)]
    pub primary_key: bool,
}

impl ColumnMeta {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: String::new(),
            primary_key: false,
        }
    }

    pub fn with_type(mut self, data_type: impl Into<String>) -> Self {
        self.data_type = data_type.into().to_uppercase();
        self
    }

    pub fn primary(mut self) -> Self {
        self.primary_key = true;
        self
    }

    /// `id`, or anything ending in `id` (which covers `_id`).
    pub fn is_id_like(&self) -> bool {
        self.name.to_lowercase().ends_with("id")
    }
}

/// A declared foreign key from a column of the owning table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignKey {
    pub from_column: String,
    pub to_table: String,
    pub to_column: String,
}

impl ForeignKey {
    pub fn new(
        from_column: impl Into<String>,
        to_table: impl Into<String>,
        to_column: impl Into<String>,
    ) -> Self {
        Self {
            from_column: from_column.into(),
            to_table: to_table.into(),
            to_column: to_column.into(),
        }
    }
}

/// Column list and declared foreign keys of one table.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TableMeta {
    pub name: String,
    pub columns: Vec<ColumnMeta>,
    #[serde(default)]
    pub foreign_keys: Vec<ForeignKey>,
}

impl TableMeta {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
            foreign_keys: Vec::new(),
        }
    }

    pub fn with_column(mut self, column: ColumnMeta) -> Self {
        self.columns.push(column);
        self
    }

    pub fn with_foreign_key(mut self, fk: ForeignKey) -> Self {
        self.foreign_keys.push(fk);
        self
    }

    pub fn primary_keys(&self) -> impl Iterator<Item = &ColumnMeta> {
        self.columns.iter().filter(|c| c.primary_key)
    }

    pub fn id_like(&self) -> impl Iterator<Item = &ColumnMeta> {
        self.columns.iter().filter(|c| c.is_id_like())
    }

    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }
}
