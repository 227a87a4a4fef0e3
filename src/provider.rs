use std::sync::Arc;

use serde::Serialize;

use crate::error::DirectoryError;
use crate::geo::GeoPoint;
use crate::mapping;
use crate::store::{RawRow, RecordStore};
use crate::text::{MIN_QUERY_CHARS, contains_normalized, normalize};

pub const DEFAULT_SEARCH_LIMIT: usize = 100;
pub const MAX_SEARCH_LIMIT: usize = 500;

/// Canonical provider shape, whatever import batch produced the row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProviderRecord {
    pub id: Option<String>,
    pub name: Option<String>,
    pub specialty: Option<String>,
    pub locality: Option<String>,
    pub province: Option<String>,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub phone_alt: Option<String>,
    pub email: Option<String>,
    pub tax_id: Option<String>,
    pub point: Option<GeoPoint>,
}

impl ProviderRecord {
    pub fn from_row(row: &RawRow) -> Self {
        Self {
            id: mapping::text(row, mapping::ID),
            name: mapping::text(row, mapping::PROVIDER_NAME),
            specialty: mapping::text(row, mapping::SPECIALTY),
            locality: mapping::text(row, mapping::LOCALITY),
            province: mapping::text(row, mapping::PROVINCE),
            address: mapping::text(row, mapping::ADDRESS),
            phone: mapping::text(row, mapping::PHONE),
            phone_alt: mapping::text(row, mapping::PHONE_ALT),
            email: mapping::text(row, mapping::EMAIL),
            tax_id: mapping::text(row, mapping::TAX_ID),
            point: mapping::point(row),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ProviderFilters {
    pub locality: Option<String>,
    pub specialty: Option<String>,
    pub provider_name: Option<String>,
}

/// Text search over the provider table.
#[derive(Clone)]
pub struct ProviderDirectory {
    store: Arc<dyn RecordStore>,
    table: String,
}

impl ProviderDirectory {
    pub fn new(store: Arc<dyn RecordStore>, table: impl Into<String>) -> Self {
        Self {
            store,
            table: table.into(),
        }
    }

    /// Every provider row mapped to the canonical shape, in store order.
    pub fn load_all(&self) -> Result<Vec<ProviderRecord>, DirectoryError> {
        let rows = self.store.query_records(&self.table, &[])?;
        Ok(rows.iter().map(ProviderRecord::from_row).collect())
    }

    pub fn search(
        &self,
        query: &str,
        filters: &ProviderFilters,
        limit: Option<usize>,
    ) -> Result<Vec<ProviderRecord>, DirectoryError> {
        let query = normalize(query);
        if query.chars().count() < MIN_QUERY_CHARS {
            tracing::debug!(%query, "provider query too short; returning no results");
            return Ok(Vec::new());
        }
        let limit = limit
            .unwrap_or(DEFAULT_SEARCH_LIMIT)
            .clamp(1, MAX_SEARCH_LIMIT);

        let providers = self.load_all()?;
        let mut hits = filter_providers(providers, &query, filters);
        hits.truncate(limit);
        Ok(hits)
    }
}

/// `query` must already be normalized. All filters are ANDed.
pub fn filter_providers(
    providers: Vec<ProviderRecord>,
    query: &str,
    filters: &ProviderFilters,
) -> Vec<ProviderRecord> {
    let locality = normalized_filter(filters.locality.as_deref());
    let specialty = normalized_filter(filters.specialty.as_deref());
    let provider_name = normalized_filter(filters.provider_name.as_deref());

    providers
        .into_iter()
        .filter(|p| {
            let text_hit = [&p.name, &p.specialty, &p.locality, &p.address]
                .into_iter()
                .any(|field| field_contains(field, query));
            text_hit
                && locality.as_deref().is_none_or(|f| field_contains(&p.locality, f))
                && specialty
                    .as_deref()
                    .is_none_or(|f| field_contains(&p.specialty, f))
                && provider_name
                    .as_deref()
                    .is_none_or(|f| field_contains(&p.name, f))
        })
        .collect()
}

/// Blank filters are treated as absent.
pub(crate) fn normalized_filter(f: Option<&str>) -> Option<String> {
    f.map(normalize).filter(|s| !s.is_empty())
}

pub(crate) fn field_contains(field: &Option<String>, needle: &str) -> bool {
    field
        .as_deref()
        .is_some_and(|v| contains_normalized(v, needle))
}
