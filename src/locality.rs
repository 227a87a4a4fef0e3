use std::sync::Arc;

use serde::Serialize;

use crate::error::DirectoryError;
use crate::geo::GeoPoint;
use crate::mapping;
use crate::store::{RawRow, RecordStore};
use crate::text::{MIN_QUERY_CHARS, normalize};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LocalityRecord {
    pub name: String,
    pub province: String,
    pub point: GeoPoint,
}

impl LocalityRecord {
    /// `None` for rows without a name or a usable coordinate.
    pub fn from_row(row: &RawRow) -> Option<Self> {
        Some(Self {
            name: mapping::text(row, mapping::LOCALITY_NAME)?,
            province: mapping::text(row, mapping::PROVINCE).unwrap_or_default(),
            point: mapping::point(row)?,
        })
    }
}

/// Place-name lookup against the geographic reference table.
#[derive(Clone)]
pub struct LocalityResolver {
    store: Arc<dyn RecordStore>,
    table: String,
}

impl LocalityResolver {
    pub fn new(store: Arc<dyn RecordStore>, table: impl Into<String>) -> Self {
        Self {
            store,
            table: table.into(),
        }
    }

    /// All localities whose name contains `query`, in reference-table order.
    /// Ambiguous names come back as several candidates; picking one is up to
    /// the caller.
    pub fn resolve(
        &self,
        query: &str,
        province_hint: Option<&str>,
    ) -> Result<Vec<LocalityRecord>, DirectoryError> {
        let query = normalize(query);
        if query.chars().count() < MIN_QUERY_CHARS {
            return Ok(Vec::new());
        }
        let province = province_hint.map(normalize).filter(|p| !p.is_empty());

        let rows = self.store.query_records(&self.table, &[])?;
        let mut skipped = 0usize;
        let mut out = Vec::new();
        for row in &rows {
            let Some(record) = LocalityRecord::from_row(row) else {
                skipped += 1;
                continue;
            };
            if !normalize(&record.name).contains(&query) {
                continue;
            }
            if let Some(p) = &province {
                if normalize(&record.province) != *p {
                    continue;
                }
            }
            out.push(record);
        }
        if skipped > 0 {
            tracing::debug!(
                table = %self.table,
                skipped,
                "skipped locality rows without name or valid coordinates"
            );
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn resolver() -> LocalityResolver {
        let rows: Vec<RawRow> = vec![
            [
                ("localidad", "Vicente López"),
                ("provincia", "Buenos Aires"),
                ("latitud", "-34.5265"),
                ("longitud", "-58.4733"),
            ],
            [
                ("localidad", "San Martín"),
                ("provincia", "Buenos Aires"),
                ("latitud", "-34.5750"),
                ("longitud", "-58.5373"),
            ],
            [
                ("localidad", "San Martín"),
                ("provincia", "Mendoza"),
                ("latitud", "-33.0810"),
                ("longitud", "-68.4681"),
            ],
            [
                ("localidad", "Paraná"),
                ("provincia", "ENTRE RÍOS"),
                ("latitud", "-31.7330"),
                ("longitud", "-60.5299"),
            ],
            [
                ("localidad", "Villa Sin Datos"),
                ("provincia", "Chaco"),
                ("latitud", ""),
                ("longitud", ""),
            ],
        ]
        .into_iter()
        .map(|r| r.into_iter().collect::<RawRow>())
        .collect();
        LocalityResolver::new(
            Arc::new(MemoryStore::new().with_table("localidades", rows)),
            "localidades",
        )
    }

    #[test]
    fn partial_query_matches_substring() {
        let hits = resolver().resolve("vicente", None).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].name, "Vicente López");
        assert!(normalize(&hits[0].name).contains("vicente"));
    }

    #[test]
    fn nonsense_query_is_an_empty_success() {
        assert!(resolver().resolve("zzzzxyz", None).unwrap().is_empty());
    }

    #[test]
    fn ambiguous_names_surface_every_candidate_in_order() {
        let hits = resolver().resolve("SAN MARTIN", None).unwrap();
        let provinces: Vec<_> = hits.iter().map(|h| h.province.as_str()).collect();
        assert_eq!(provinces, ["Buenos Aires", "Mendoza"]);
    }

    #[test]
    fn province_hint_narrows_by_normalized_equality() {
        let hits = resolver().resolve("san martin", Some("mendoza")).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].province, "Mendoza");

        let hits = resolver().resolve("parana", Some("Entre Rios")).unwrap();
        assert_eq!(hits.len(), 1);

        // Equality, not substring.
        assert!(resolver().resolve("parana", Some("entre")).unwrap().is_empty());
    }

    #[test]
    fn short_query_and_rows_without_coordinates() {
        assert!(resolver().resolve("v", None).unwrap().is_empty());
        assert!(resolver().resolve("sin datos", None).unwrap().is_empty());
    }

    #[test]
    fn missing_table_is_upstream_failure() {
        let r = LocalityResolver::new(Arc::new(MemoryStore::new()), "localidades");
        match r.resolve("parana", None) {
            Err(DirectoryError::UpstreamUnavailable { source_name, .. }) => {
                assert_eq!(source_name, "localidades")
            }
            other => panic!("expected upstream failure, got {other:?}"),
        }
    }
}
