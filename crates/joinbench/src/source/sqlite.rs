//! SQLite-backed value and metadata source.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use rusqlite::types::ValueRef;
use rusqlite::{Connection, OpenFlags};
use tracing::debug;

use crate::error::{JoinBenchError, Result};
use crate::schema::{ColumnMeta, ForeignKey, TableMeta, ValueSet};

use super::{Catalog, Database, MetadataSource, ValueLoader};

/// Double-quote an identifier for SQLite, doubling embedded quotes.
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Text form of a stored value, before normalization.
fn value_text(value: ValueRef<'_>) -> Option<String> {
    match value {
        ValueRef::Null => None,
        ValueRef::Integer(i) => Some(i.to_string()),
        // Debug keeps the fractional part (`1.0`), so REAL and INTEGER
        // columns do not collide by accident.
        ValueRef::Real(f) => Some(format!("{:?}", f)),
        ValueRef::Text(bytes) | ValueRef::Blob(bytes) => Some(decode_bytes(bytes)),
    }
}

/// UTF-8, falling back to Latin-1 for stores with mixed encodings.
fn decode_bytes(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(_) => bytes.iter().map(|&b| b as char).collect(),
    }
}

/// A read-only SQLite database.
pub struct SqliteSource {
    path: PathBuf,
    db_id: String,
    conn: Mutex<Connection>,
}

impl fmt::Debug for SqliteSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SqliteSource")
            .field("path", &self.path)
            .field("db_id", &self.db_id)
            .finish_non_exhaustive()
    }
}

impl SqliteSource {
    /// Open a database file read-only.
    ///
    /// Fails with [`JoinBenchError::MissingSource`] before touching SQLite
    /// when the file does not exist, so a typo never creates an empty db.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(JoinBenchError::MissingSource(path.to_path_buf()));
        }

        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;

        let db_id = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();

        Ok(Self {
            path: path.to_path_buf(),
            db_id,
            conn: Mutex::new(conn),
        })
    }

    /// Override the short database name used in prompts.
    pub fn with_db_id(mut self, db_id: impl Into<String>) -> Self {
        self.db_id = db_id.into();
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        // A panic mid-query leaves nothing half-written on a read-only handle.
        self.conn.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn table_info(conn: &Connection, table: &str) -> Result<Vec<ColumnMeta>> {
        let mut stmt = conn.prepare(&format!("PRAGMA table_info({})", quote_ident(table)))?;
        let rows = stmt.query_map([], |row| {
            let name: String = row.get(1)?;
            let data_type: Option<String> = row.get(2)?;
            let pk: i64 = row.get(5)?;
            Ok(ColumnMeta {
                name,
                data_type: data_type.unwrap_or_default().to_uppercase(),
                primary_key: pk > 0,
            })
        })?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(JoinBenchError::from)
    }
}

impl Catalog for SqliteSource {
    fn table_names(&self) -> Result<Vec<String>> {
        let conn = self.conn();
        let mut stmt = conn.prepare("SELECT name FROM sqlite_master WHERE type = 'table'")?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(names)
    }

    fn column_names(&self, table: &str) -> Result<Vec<String>> {
        let conn = self.conn();
        Ok(Self::table_info(&conn, table)?
            .into_iter()
            .map(|c| c.name)
            .collect())
    }
}

impl ValueLoader for SqliteSource {
    fn load_values(
        &self,
        table: &str,
        column: &str,
        sample_limit: Option<usize>,
    ) -> Result<ValueSet> {
        let col = quote_ident(column);
        let mut sql = format!(
            "SELECT DISTINCT {col} FROM {} WHERE {col} IS NOT NULL",
            quote_ident(table)
        );
        if let Some(limit) = sample_limit.filter(|&n| n > 0) {
            sql.push_str(&format!(" LIMIT {}", limit));
        }

        let conn = self.conn();
        let mut stmt = conn.prepare(&sql)?;
        let mut rows = stmt.query([])?;
        let mut raw = Vec::new();
        while let Some(row) = rows.next()? {
            raw.push(value_text(row.get_ref(0)?));
        }

        let values = ValueSet::from_raw(raw);
        debug!(table, column, distinct = values.len(), "loaded column values");
        Ok(values)
    }
}

impl MetadataSource for SqliteSource {
    fn table_meta(&self, table: &str) -> Result<TableMeta> {
        let conn = self.conn();
        let columns = Self::table_info(&conn, table)?;

        let mut stmt = conn.prepare(&format!(
            "PRAGMA foreign_key_list({})",
            quote_ident(table)
        ))?;
        // id, seq, table, from, to, on_update, on_delete, match
        let raw_fks = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, Option<String>>(4)?,
                ))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let mut foreign_keys = Vec::with_capacity(raw_fks.len());
        for (to_table, from_column, to_column) in raw_fks {
            // A NULL target means the referenced table's primary key.
            let to_column = match to_column {
                Some(c) => Some(c),
                None => Self::table_info(&conn, &to_table)?
                    .into_iter()
                    .find(|c| c.primary_key)
                    .map(|c| c.name),
            };
            if let Some(to_column) = to_column {
                foreign_keys.push(ForeignKey {
                    from_column,
                    to_table,
                    to_column,
                });
            }
        }

        Ok(TableMeta {
            name: table.to_string(),
            columns,
            foreign_keys,
        })
    }
}

impl Database for SqliteSource {
    fn db_id(&self) -> &str {
        &self.db_id
    }
}

/// Spider-style dataset layout: `<root>/database/<db_id>/<db_id>.sqlite`.
#[derive(Debug, Clone)]
pub struct SpiderLayout {
    root: PathBuf,
}

impl SpiderLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Path of a database file, failing fast if it is absent.
    pub fn db_path(&self, db_id: &str) -> Result<PathBuf> {
        let path = self
            .root
            .join("database")
            .join(db_id)
            .join(format!("{}.sqlite", db_id));
        if path.is_file() {
            Ok(path)
        } else {
            Err(JoinBenchError::MissingSource(path))
        }
    }

    /// Open the database for `db_id`.
    pub fn open(&self, db_id: &str) -> Result<SqliteSource> {
        Ok(SqliteSource::open(self.db_path(db_id)?)?.with_db_id(db_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_ident() {
        assert_eq!(quote_ident("song"), "\"song\"");
        assert_eq!(quote_ident("we\"ird"), "\"we\"\"ird\"");
    }

    #[test]
    fn test_value_text() {
        assert_eq!(value_text(ValueRef::Null), None);
        assert_eq!(value_text(ValueRef::Integer(42)).as_deref(), Some("42"));
        assert_eq!(value_text(ValueRef::Real(1.0)).as_deref(), Some("1.0"));
        assert_eq!(value_text(ValueRef::Text(b"abc")).as_deref(), Some("abc"));
    }

    #[test]
    fn test_decode_latin1_fallback() {
        assert_eq!(decode_bytes(&[0x63, 0x61, 0x66, 0xe9]), "café");
    }

    #[test]
    fn test_missing_file_fails_fast() {
        let err = SqliteSource::open("/nonexistent/dir/nothing.sqlite").err().unwrap();
        assert!(matches!(err, JoinBenchError::MissingSource(_)));
    }

    #[test]
    fn test_debug_names_the_database() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("shop.sqlite");
        Connection::open(&path)
            .unwrap()
            .execute_batch("CREATE TABLE t (id INTEGER);")
            .unwrap();

        let source = SqliteSource::open(&path).unwrap();
        let text = format!("{:?}", source);
        assert!(text.starts_with("SqliteSource"));
        assert!(text.contains("\"shop\""));
        assert!(text.contains("shop.sqlite"));
        assert!(text.ends_with(", .. }"));
    }

    #[test]
    fn test_spider_layout_missing() {
        let layout = SpiderLayout::new("/nonexistent/spider");
        let err = layout.db_path("concert_singer").unwrap_err();
        assert!(err.to_string().contains("concert_singer.sqlite"));
    }
}
