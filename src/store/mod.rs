//! Record-store seam. The directory never talks to a database directly; it is
//! handed a [`RecordStore`] and reads [`RawRow`]s through it.

mod duck;
mod memory;

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;

pub use duck::DuckDbStore;
pub use memory::MemoryStore;

use crate::error::StoreError;

/// A source row as `column -> text`. SQL NULLs are absent keys.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RawRow(BTreeMap<String, String>);

impl RawRow {
    pub fn get(&self, column: &str) -> Option<&str> {
        self.0.get(column).map(String::as_str)
    }

    pub fn insert(&mut self, column: impl Into<String>, value: impl Into<String>) {
        self.0.insert(column.into(), value.into());
    }

    pub fn contains_column(&self, column: &str) -> bool {
        self.0.contains_key(column)
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// First alias holding a non-blank value, trimmed.
    pub fn first_of(&self, aliases: &[&str]) -> Option<&str> {
        aliases
            .iter()
            .filter_map(|alias| self.get(alias))
            .map(str::trim)
            .find(|v| !v.is_empty())
    }

    /// Builds a row from a JSON object; scalars are rendered as text and
    /// `null` becomes an absent column.
    pub fn from_json_object(obj: &serde_json::Map<String, Value>) -> Self {
        let mut row = RawRow::default();
        for (k, v) in obj {
            let text = match v {
                Value::Null => continue,
                Value::String(s) => s.clone(),
                Value::Number(n) => n.to_string(),
                Value::Bool(b) => b.to_string(),
                other => other.to_string(),
            };
            row.insert(k.clone(), text);
        }
        row
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for RawRow {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut row = RawRow::default();
        for (k, v) in iter {
            row.insert(k, v);
        }
        row
    }
}

/// Predicate pushed down to the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter {
    /// Text equality on the column's value.
    Eq { column: String, value: String },
    /// Case-insensitive substring match.
    Contains { column: String, value: String },
    NotNull { column: String },
}

impl Filter {
    pub fn eq(column: impl Into<String>, value: impl Into<String>) -> Self {
        Filter::Eq {
            column: column.into(),
            value: value.into(),
        }
    }

    pub fn contains(column: impl Into<String>, value: impl Into<String>) -> Self {
        Filter::Contains {
            column: column.into(),
            value: value.into(),
        }
    }

    pub fn not_null(column: impl Into<String>) -> Self {
        Filter::NotNull {
            column: column.into(),
        }
    }

    pub fn column(&self) -> &str {
        match self {
            Filter::Eq { column, .. }
            | Filter::Contains { column, .. }
            | Filter::NotNull { column } => column,
        }
    }
}

pub trait RecordStore: Send + Sync {
    /// Rows of `source` satisfying every filter, in the store's natural order.
    fn query_records(&self, source: &str, filters: &[Filter]) -> Result<Vec<RawRow>, StoreError>;

    /// Only used for diagnostics.
    fn count_records(&self, source: &str) -> Result<u64, StoreError>;
}
