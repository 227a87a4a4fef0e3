use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use serde_json::Value;

use super::{Filter, RawRow, RecordStore};
use crate::error::StoreError;

/// In-memory tables, loaded from a JSON fixture of the form
/// `{"tables": {"<name>": [{"COLUMN": value, ...}, ...]}}`.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    tables: BTreeMap<String, Table>,
}

// Columns are tracked apart from the rows: a column that is null everywhere
// has no key in any row but still exists.
#[derive(Debug, Clone, Default)]
struct Table {
    columns: BTreeSet<String>,
    rows: Vec<RawRow>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Columns are taken from the keys the rows carry.
    pub fn with_table(mut self, name: impl Into<String>, rows: Vec<RawRow>) -> Self {
        let columns = rows
            .iter()
            .flat_map(|r| r.columns().map(str::to_string))
            .collect();
        self.tables.insert(name.into(), Table { columns, rows });
        self
    }

    pub fn load(path: &Path) -> Result<Self, StoreError> {
        let fixture_err = |message: String| StoreError::Fixture {
            path: path.display().to_string(),
            message,
        };
        let data = std::fs::read_to_string(path).map_err(|e| fixture_err(e.to_string()))?;
        let v: Value = serde_json::from_str(&data).map_err(|e| fixture_err(e.to_string()))?;
        Self::from_json(&v).map_err(fixture_err)
    }

    pub fn from_json(v: &Value) -> Result<Self, String> {
        let tables = v
            .get("tables")
            .and_then(|t| t.as_object())
            .ok_or_else(|| "missing \"tables\" object".to_string())?;

        let mut store = MemoryStore::new();
        for (name, rows) in tables {
            let rows = rows
                .as_array()
                .ok_or_else(|| format!("table {name} is not an array"))?;
            let mut table = Table::default();
            for (idx, row) in rows.iter().enumerate() {
                let obj = row
                    .as_object()
                    .ok_or_else(|| format!("table {name} row {idx} is not an object"))?;
                table.columns.extend(obj.keys().cloned());
                table.rows.push(RawRow::from_json_object(obj));
            }
            store.tables.insert(name.clone(), table);
        }
        Ok(store)
    }

    fn table(&self, source: &str) -> Result<&Table, StoreError> {
        self.tables.get(source).ok_or_else(|| StoreError::Query {
            source_name: source.to_string(),
            message: format!("table {source} does not exist"),
        })
    }
}

impl RecordStore for MemoryStore {
    fn query_records(&self, source: &str, filters: &[Filter]) -> Result<Vec<RawRow>, StoreError> {
        let table = self.table(source)?;

        // Mirror a SQL binder. A table with no known columns accepts any filter.
        for f in filters {
            if !table.columns.is_empty() && !table.columns.contains(f.column()) {
                return Err(StoreError::Query {
                    source_name: source.to_string(),
                    message: format!("column {} not found", f.column()),
                });
            }
        }

        Ok(table
            .rows
            .iter()
            .filter(|row| filters.iter().all(|f| matches(row, f)))
            .cloned()
            .collect())
    }

    fn count_records(&self, source: &str) -> Result<u64, StoreError> {
        Ok(self.table(source)?.rows.len() as u64)
    }
}

fn matches(row: &RawRow, filter: &Filter) -> bool {
    match filter {
        Filter::Eq { column, value } => row.get(column) == Some(value.as_str()),
        Filter::Contains { column, value } => row
            .get(column)
            .is_some_and(|v| v.to_lowercase().contains(&value.to_lowercase())),
        Filter::NotNull { column } => row.contains_column(column),
    }
}
