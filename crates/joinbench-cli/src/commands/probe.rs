//! Probe command - show how a column resolves and what it holds.

use std::path::PathBuf;

use colored::Colorize;
use joinbench::resolve::{resolve_column, resolve_table};
use joinbench::source::{MetadataSource, ValueLoader};
use joinbench::{Database, SpiderLayout};

use super::CliResult;

/// Lines describing declared keys that involve `table.column`.
fn key_lines(db: &dyn Database, table: &str, column: &str) -> CliResult<Vec<String>> {
    let mut lines = Vec::new();
    for fk in &db.table_meta(table)?.foreign_keys {
        if fk.from_column.eq_ignore_ascii_case(column) {
            lines.push(format!("references {}.{}", fk.to_table, fk.to_column));
        }
    }
    for other in db.table_names()? {
        for fk in db.table_meta(&other)?.foreign_keys {
            if fk.to_table.eq_ignore_ascii_case(table) && fk.to_column.eq_ignore_ascii_case(column) {
                lines.push(format!("referenced by {}.{}", other, fk.from_column));
            }
        }
    }
    Ok(lines)
}

pub fn run(
    spider_dir: PathBuf,
    db_id: String,
    table: String,
    column: String,
    n: usize,
) -> CliResult<()> {
    let db = SpiderLayout::new(spider_dir).open(&db_id)?;

    let resolved_table = resolve_table(&db, &table)?;
    let resolved_column = resolve_column(&db, &resolved_table, &column)?;
    println!(
        "{} {}.{}.{}",
        "Column".cyan().bold(),
        db_id,
        resolved_table.white().bold(),
        resolved_column.white().bold()
    );
    if resolved_table != table || resolved_column != column {
        println!(
            "  {} requested {}.{}",
            "resolved from".yellow(),
            table,
            column
        );
    }

    let meta = db.table_meta(&resolved_table)?;
    if let Some(col) = meta.columns.iter().find(|c| c.name == resolved_column) {
        let mut flags = Vec::new();
        if col.primary_key {
            flags.push("primary key");
        }
        if col.is_id_like() {
            flags.push("id-like");
        }
        println!(
            "  type={} {}",
            if col.data_type.is_empty() { "-" } else { col.data_type.as_str() },
            flags.join(", ")
        );
    } else {
        println!(
            "  {} columns: {}",
            "not found;".red(),
            meta.column_names().join(", ")
        );
        return Ok(());
    }

    for line in key_lines(&db, &resolved_table, &resolved_column)? {
        println!("  {}", line);
    }

    let values = db.load_values(&resolved_table, &resolved_column, None)?;
    println!("  distinct normalized values: {}", values.len().to_string().white().bold());
    println!("  sample: {:?}", values.sample(n));
    Ok(())
}
