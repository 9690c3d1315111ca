//! Normalized distinct column values.

use std::collections::BTreeSet;

/// Distinct, normalized (trimmed, lower-cased), non-empty values of a column.
///
/// The only way to build one is through normalization, so the set never
/// contains an empty string. It may itself be empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValueSet {
    values: BTreeSet<String>,
}

impl ValueSet {
    /// Create an empty value set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Normalize raw values, dropping nulls and empties.
    pub fn from_raw<I, S>(raw: I) -> Self
    where
        I: IntoIterator<Item = Option<S>>,
        S: AsRef<str>,
    {
        raw.into_iter().flatten().collect()
    }

    /// Normalize a single value; `None` if it is empty after trimming.
    pub fn normalize(value: &str) -> Option<String> {
        let v = value.trim().to_lowercase();
        if v.is_empty() { None } else { Some(v) }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn contains(&self, value: &str) -> bool {
        self.values.contains(value)
    }

    /// Iterate in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.values.iter().map(String::as_str)
    }

    /// Size of the intersection with another set.
    pub fn intersection_len(&self, other: &ValueSet) -> usize {
        let (small, large) = if self.len() <= other.len() {
            (self, other)
        } else {
            (other, self)
        };
        small.values.iter().filter(|v| large.values.contains(*v)).count()
    }

    /// Size of the union with another set.
    pub fn union_len(&self, other: &ValueSet) -> usize {
        self.len() + other.len() - self.intersection_len(other)
    }

    /// The first `k` values in sorted order.
    pub fn sample(&self, k: usize) -> Vec<String> {
        self.values.iter().take(k).cloned().collect()
    }
}

impl<S: AsRef<str>> FromIterator<S> for ValueSet {
    fn from_iter<T: IntoIterator<Item = S>>(iter: T) -> Self {
        Self {
            values: iter
                .into_iter()
                .filter_map(|v| Self::normalize(v.as_ref()))
                .collect(),
        }
    }
}
