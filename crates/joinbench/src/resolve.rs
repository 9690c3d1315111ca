//! Identifier resolution: map a nominal table or column name to the
//! identifier actually present in a database.
//!
//! Datasets and databases drift apart in spelling (`"Song ID"` vs
//! `song_id`, `Artists` vs `artist`). Resolution never fails for lack of a
//! match: it returns its best guess, or the hint itself when the database
//! has no identifiers to choose from.

use tracing::debug;

use crate::error::Result;
use crate::schema::canonical_ident;
use crate::source::Catalog;

/// Match strength of a candidate identifier against a hint.
fn match_score(candidate: &str, desired: &str, desired_canonical: &str) -> u8 {
    if candidate.to_lowercase() == desired.to_lowercase() {
        return 3;
    }
    let canonical = canonical_ident(candidate);
    if canonical == desired_canonical {
        2
    } else if canonical.contains(desired_canonical) || desired_canonical.contains(&canonical) {
        1
    } else {
        0
    }
}

/// Pick the candidate that best matches `desired`.
///
/// A verbatim match short-circuits. Otherwise the highest score wins and
/// ties go to the earliest candidate. Returns `None` only when there are
/// no candidates at all.
pub fn best_match<'a, S: AsRef<str>>(candidates: &'a [S], desired: &str) -> Option<&'a str> {
    if let Some(exact) = candidates.iter().find(|c| c.as_ref() == desired) {
        return Some(exact.as_ref());
    }

    let desired_canonical = canonical_ident(desired);
    let mut best: Option<(&str, u8)> = None;
    for candidate in candidates {
        let candidate = candidate.as_ref();
        let score = match_score(candidate, desired, &desired_canonical);
        if best.is_none_or(|(_, s)| score > s) {
            best = Some((candidate, score));
        }
    }
    best.map(|(name, _)| name)
}

/// Resolve a table hint against the database's table names.
pub fn resolve_table<C: Catalog + ?Sized>(db: &C, desired: &str) -> Result<String> {
    let tables = db.table_names()?;
    Ok(resolved(best_match(&tables, desired), desired, "table"))
}

/// Resolve a column hint against the columns of an (already resolved) table.
pub fn resolve_column<C: Catalog + ?Sized>(db: &C, table: &str, desired: &str) -> Result<String> {
    let columns = db.column_names(table)?;
    Ok(resolved(best_match(&columns, desired), desired, "column"))
}

fn resolved(found: Option<&str>, desired: &str, what: &str) -> String {
    match found {
        Some(name) => {
            if name != desired {
                debug!(what, desired, resolved = name, "resolved identifier drift");
            }
            name.to_string()
        }
        None => desired.to_string(),
    }
}
