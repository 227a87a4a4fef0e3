use std::path::Path;
use std::sync::Mutex;

use duckdb::types::Value;
use duckdb::{Connection, params_from_iter};

use super::{Filter, RawRow, RecordStore};
use crate::error::StoreError;

/// DuckDB-backed store. One connection, serialized behind a mutex.
pub struct DuckDbStore {
    conn: Mutex<Connection>,
}

impl DuckDbStore {
    /// Opens the database read-only; this crate never writes to it.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let config = duckdb::Config::default()
            .access_mode(duckdb::AccessMode::ReadOnly)
            .map_err(|e| unavailable(&path.display().to_string(), e))?;
        let conn = Connection::open_with_flags(path, config)
            .map_err(|e| unavailable(&path.display().to_string(), e))?;
        Ok(Self::from_connection(conn))
    }

    pub fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }

    fn with_conn<T>(
        &self,
        source: &str,
        f: impl FnOnce(&Connection) -> Result<T, duckdb::Error>,
    ) -> Result<T, StoreError> {
        let conn = self.conn.lock().map_err(|_| StoreError::Unavailable {
            source_name: source.to_string(),
            message: "connection mutex poisoned".to_string(),
        })?;
        f(&conn).map_err(|e| StoreError::Query {
            source_name: source.to_string(),
            message: e.to_string(),
        })
    }
}

impl RecordStore for DuckDbStore {
    fn query_records(&self, source: &str, filters: &[Filter]) -> Result<Vec<RawRow>, StoreError> {
        let (sql, params) = select_sql(source, filters);
        tracing::debug!(source, %sql, "duckdb query");

        self.with_conn(source, |conn| {
            let mut stmt = conn.prepare(&sql)?;
            let mut rows = stmt.query(params_from_iter(params.iter()))?;
            let names: Vec<String> = rows.as_ref().map(|s| s.column_names()).unwrap_or_default();

            let mut out = Vec::new();
            while let Some(row) = rows.next()? {
                let mut raw = RawRow::default();
                for (idx, name) in names.iter().enumerate() {
                    let v: Value = row.get(idx)?;
                    if let Some(text) = value_to_text(v) {
                        raw.insert(name.clone(), text);
                    }
                }
                out.push(raw);
            }
            Ok(out)
        })
    }

    fn count_records(&self, source: &str) -> Result<u64, StoreError> {
        let sql = format!("SELECT COUNT(*) FROM {}", quote_ident(source));
        let n = self.with_conn(source, |conn| {
            conn.query_row(&sql, [], |row| row.get::<usize, i64>(0))
        })?;
        Ok(n.max(0) as u64)
    }
}

fn select_sql(source: &str, filters: &[Filter]) -> (String, Vec<String>) {
    let mut sql = format!("SELECT * FROM {}", quote_ident(source));
    let mut params = Vec::new();
    let mut clauses = Vec::new();
    for f in filters {
        let col = quote_ident(f.column());
        match f {
            Filter::Eq { value, .. } => {
                clauses.push(format!("CAST({col} AS VARCHAR) = ?"));
                params.push(value.clone());
            }
            Filter::Contains { value, .. } => {
                clauses.push(format!("contains(lower(CAST({col} AS VARCHAR)), ?)"));
                params.push(value.to_lowercase());
            }
            Filter::NotNull { .. } => clauses.push(format!("{col} IS NOT NULL")),
        }
    }
    if !clauses.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(&clauses.join(" AND "));
    }
    (sql, params)
}

// Table and column names come from configuration and may contain spaces.
fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

fn value_to_text(v: Value) -> Option<String> {
    let s = match v {
        Value::Null => return None,
        Value::Text(s) => s,
        Value::Boolean(b) => b.to_string(),
        Value::TinyInt(n) => n.to_string(),
        Value::SmallInt(n) => n.to_string(),
        Value::Int(n) => n.to_string(),
        Value::BigInt(n) => n.to_string(),
        Value::HugeInt(n) => n.to_string(),
        Value::UTinyInt(n) => n.to_string(),
        Value::USmallInt(n) => n.to_string(),
        Value::UInt(n) => n.to_string(),
        Value::UBigInt(n) => n.to_string(),
        Value::Float(n) => n.to_string(),
        Value::Double(n) => n.to_string(),
        Value::Decimal(d) => d.to_string(),
        other => {
            tracing::debug!(?other, "unsupported duckdb value type; treating as NULL");
            return None;
        }
    };
    Some(s)
}

fn unavailable(source: &str, e: duckdb::Error) -> StoreError {
    StoreError::Unavailable {
        source_name: source.to_string(),
        message: e.to_string(),
    }
}
