//! Affiliate lookup across the legacy member tables.
//!
//! Each import left affiliates in a different table with a different key
//! column. The reconciler probes an ordered list of `(table, key column)`
//! pairs and stops at the first one that yields exactly one row.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::DirectoryError;
use crate::mapping;
use crate::store::{Filter, RawRow, RecordStore};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AffiliateSource {
    pub table: String,
    pub key_column: String,
}

impl AffiliateSource {
    pub fn new(table: impl Into<String>, key_column: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            key_column: key_column.into(),
        }
    }
}

pub fn default_affiliate_sources() -> Vec<AffiliateSource> {
    vec![
        AffiliateSource::new("afiliados", "dni"),
        AffiliateSource::new("afiliados", "DNI"),
        AffiliateSource::new("Afiliados", "numero_documento"),
        AffiliateSource::new("padron_afiliados", "NRO_DOCUMENTO"),
        AffiliateSource::new("padron_afiliados", "Numero de Documento"),
    ]
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AffiliateRecord {
    pub document: String,
    pub name: Option<String>,
    pub plan: Option<String>,
    pub member_number: Option<String>,
    pub locality: Option<String>,
    pub province: Option<String>,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    /// Table the record was found in.
    pub source: String,
}

impl AffiliateRecord {
    pub fn from_row(row: &RawRow, document: &str, source: &str) -> Self {
        Self {
            document: mapping::text(row, mapping::DOCUMENT).unwrap_or_else(|| document.to_string()),
            name: affiliate_name(row),
            plan: mapping::text(row, mapping::PLAN),
            member_number: mapping::text(row, mapping::MEMBER_NUMBER),
            locality: mapping::text(row, mapping::LOCALITY),
            province: mapping::text(row, mapping::PROVINCE),
            address: mapping::text(row, mapping::ADDRESS),
            phone: mapping::text(row, mapping::PHONE),
            email: mapping::text(row, mapping::EMAIL),
            source: source.to_string(),
        }
    }
}

// Full-name column if present, else "first last".
fn affiliate_name(row: &RawRow) -> Option<String> {
    if let Some(full) = row.first_of(mapping::FULL_NAME) {
        return Some(full.to_string());
    }
    let first = row.first_of(mapping::FIRST_NAME).unwrap_or("");
    let last = row.first_of(mapping::LAST_NAME).unwrap_or("");
    let mut name = String::new();
    if !first.is_empty() {
        name.push_str(first);
    }
    if !last.is_empty() {
        if !name.is_empty() {
            name.push(' ');
        }
        name.push_str(last);
    }
    (!name.is_empty()).then_some(name)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProbeStatus {
    Matched,
    Empty,
    Ambiguous,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProbeOutcome {
    pub table: String,
    pub key_column: String,
    pub status: ProbeStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// Outcome of a lookup. `record == None` is a legitimate not-found.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Reconciliation {
    pub record: Option<AffiliateRecord>,
    pub source: Option<AffiliateSource>,
    pub probes: Vec<ProbeOutcome>,
}

#[derive(Clone)]
pub struct EntityReconciler {
    store: Arc<dyn RecordStore>,
    sources: Vec<AffiliateSource>,
}

impl EntityReconciler {
    pub fn new(store: Arc<dyn RecordStore>, sources: Vec<AffiliateSource>) -> Self {
        Self { store, sources }
    }

    /// Probes the sources in order. Per-source failures are recorded and
    /// skipped; they never fail the lookup.
    pub fn find_by_key(&self, key: &str) -> Result<Reconciliation, DirectoryError> {
        let document = normalize_document(key).ok_or_else(|| {
            DirectoryError::InvalidInput(format!("document number has no digits: {key:?}"))
        })?;

        let mut probes = Vec::new();
        for source in &self.sources {
            let filters = [Filter::eq(&source.key_column, &document)];
            let (status, detail, hit) = match self.store.query_records(&source.table, &filters) {
                Ok(rows) if rows.len() == 1 => {
                    (ProbeStatus::Matched, None, rows.into_iter().next())
                }
                Ok(rows) if rows.is_empty() => (ProbeStatus::Empty, None, None),
                Ok(rows) => {
                    tracing::warn!(
                        table = %source.table,
                        key_column = %source.key_column,
                        rows = rows.len(),
                        "affiliate key is not unique in source; skipping"
                    );
                    (
                        ProbeStatus::Ambiguous,
                        Some(format!("{} rows share the key", rows.len())),
                        None,
                    )
                }
                Err(e) => {
                    tracing::warn!(
                        table = %source.table,
                        key_column = %source.key_column,
                        error = %e,
                        "affiliate source failed; continuing with next source"
                    );
                    (ProbeStatus::Failed, Some(e.to_string()), None)
                }
            };
            tracing::debug!(
                table = %source.table,
                key_column = %source.key_column,
                ?status,
                "affiliate probe"
            );
            probes.push(ProbeOutcome {
                table: source.table.clone(),
                key_column: source.key_column.clone(),
                status,
                detail,
            });

            if let Some(row) = hit {
                return Ok(Reconciliation {
                    record: Some(AffiliateRecord::from_row(&row, &document, &source.table)),
                    source: Some(source.clone()),
                    probes,
                });
            }
        }

        Ok(Reconciliation {
            record: None,
            source: None,
            probes,
        })
    }
}

/// Keeps the digits of a formatted DNI ("12.345.678" -> "12345678").
pub fn normalize_document(s: &str) -> Option<String> {
    let digits: String = s.chars().filter(char::is_ascii_digit).collect();
    if digits.is_empty() { None } else { Some(digits) }
}
