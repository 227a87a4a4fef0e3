use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use cartilla_backend::config::DirectoryConfig;
use cartilla_backend::geo::GeoPoint;
use cartilla_backend::provider::ProviderFilters;
use cartilla_backend::reconcile::{AffiliateSource, ProbeStatus};
use cartilla_backend::store::{DuckDbStore, Filter, MemoryStore, RawRow, RecordStore};
use cartilla_backend::{Directory, DirectoryError, StoreError};
use serde_json::json;

fn fixture_store() -> MemoryStore {
    MemoryStore::from_json(&json!({
        "tables": {
            "prestadores": [
                {"ID": 1, "NOMBRE_COMPLETO": "Dra. Laura Gómez", "ESPECIALIDAD": "CARDIOLOGIA",
                 "LOCALIDAD": "Paraná", "PROVINCIA": "Entre Ríos", "LATITUD": -31.74, "LONGITUD": -60.52},
                {"id": 2, "nombre": "Clínica Santa Fe", "especialidad": "Cardiología",
                 "localidad": "Santa Fe", "latitud": "-31,6333", "longitud": "-60,7000"},
                {"Id": 3, "Razon Social": "Farmacia del Centro", "Especialidad": "FARMACIA",
                 "Localidad": "PARANA", "Dirección": "Urquiza 1020"},
                {"ID": 5, "NOMBRE": "Instituto Cardiovascular", "ESPECIALIDAD": "CARDIOLOGIA",
                 "LOCALIDAD": "Córdoba", "LATITUD": -31.4201, "LONGITUD": -64.1888}
            ],
            "localidades": [
                {"localidad": "Paraná", "provincia": "Entre Ríos", "latitud": -31.7330, "longitud": -60.5299},
                {"localidad": "Santa Fe", "provincia": "Santa Fe", "latitud": -31.6333, "longitud": -60.7000}
            ],
            "afiliados": [
                {"dni": "11111111", "nombre_completo": "Otro Afiliado"}
            ],
            "padron_afiliados": [
                {"NRO_DOCUMENTO": "20123456", "NOMBRE": "María", "APELLIDO": "Fernández", "PLAN": "310"}
            ]
        }
    }))
    .expect("fixture parses")
}

fn directory(store: impl RecordStore + 'static) -> Directory {
    Directory::new(Arc::new(store), DirectoryConfig::default())
}

/// Fails every read of one table and counts all reads.
struct FlakyStore {
    inner: MemoryStore,
    broken: &'static str,
    reads: AtomicUsize,
}

impl FlakyStore {
    fn new(inner: MemoryStore, broken: &'static str) -> Self {
        Self {
            inner,
            broken,
            reads: AtomicUsize::new(0),
        }
    }
}

impl RecordStore for FlakyStore {
    fn query_records(&self, source: &str, filters: &[Filter]) -> Result<Vec<RawRow>, StoreError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        if source == self.broken {
            return Err(StoreError::Unavailable {
                source_name: source.to_string(),
                message: "connection reset".to_string(),
            });
        }
        self.inner.query_records(source, filters)
    }

    fn count_records(&self, source: &str) -> Result<u64, StoreError> {
        self.inner.count_records(source)
    }
}

#[test]
fn locality_then_nearby() {
    let dir = directory(fixture_store());

    let localities = dir.resolve_locality("parana", None).unwrap();
    assert_eq!(localities.len(), 1);
    let origin = localities[0].point;

    let found = dir.find_nearby(origin, 25.0, Some("cardiologia")).unwrap();
    let ids: Vec<_> = found.iter().filter_map(|s| s.provider.id.as_deref()).collect();
    assert_eq!(ids, ["1", "2"]);
    assert!(found.iter().all(|s| s.distance_km <= 25.0));

    let wide = dir.find_nearby(origin, 500.0, Some("cardiologia")).unwrap();
    assert_eq!(wide.len(), 3);
    assert_eq!(wide[2].provider.id.as_deref(), Some("5"));
}

#[test]
fn expanding_search_uses_configured_tiers() {
    let dir = directory(fixture_store());
    let origin = GeoPoint::new(-31.7330, -60.5299).unwrap();

    let tiered = dir
        .find_nearby_expanding(origin, Some("CARDIOLOGIA"), Some(3))
        .unwrap();
    let radii: Vec<f64> = tiered.attempts.iter().map(|a| a.radius_km).collect();
    assert_eq!(radii, [10.0, 25.0, 50.0, 100.0, 200.0]);
    // Córdoba is ~350 km away, so the last tier still has only two.
    assert_eq!(tiered.providers.len(), 2);
    assert_eq!(tiered.radius_km, Some(200.0));
}

#[test]
fn search_across_schemas_with_filters() {
    let dir = directory(fixture_store());

    let hits = dir
        .search("cardio", &ProviderFilters::default(), None)
        .unwrap();
    assert_eq!(hits.len(), 3);

    let filters = ProviderFilters {
        locality: Some("parana".to_string()),
        ..Default::default()
    };
    let hits = dir.search("urquiza", &filters, None).unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].name.as_deref(), Some("Farmacia del Centro"));

    let hits = dir.search("cardio", &ProviderFilters::default(), Some(1)).unwrap();
    assert_eq!(hits.len(), 1);
}

#[test]
fn short_queries_never_reach_the_store() {
    let store = FlakyStore::new(fixture_store(), "none");
    let dir = Directory::new(Arc::new(store), DirectoryConfig::default());
    assert!(dir.search("x", &ProviderFilters::default(), None).unwrap().is_empty());
    assert!(dir.resolve_locality(" ", None).unwrap().is_empty());

    let store = Arc::new(FlakyStore::new(fixture_store(), "none"));
    let dir = Directory::new(store.clone(), DirectoryConfig::default());
    dir.search("é", &ProviderFilters::default(), None).unwrap();
    assert_eq!(store.reads.load(Ordering::SeqCst), 0);
}

#[test]
fn affiliate_found_in_later_source() {
    let dir = directory(fixture_store());
    let result = dir.find_by_key("20.123.456").unwrap();

    let record = result.record.expect("affiliate found");
    assert_eq!(record.name.as_deref(), Some("María Fernández"));
    assert_eq!(record.plan.as_deref(), Some("310"));
    assert_eq!(record.source, "padron_afiliados");
    assert_eq!(
        result.source,
        Some(AffiliateSource::new("padron_afiliados", "NRO_DOCUMENTO"))
    );

    // afiliados.dni is empty for this key, afiliados.DNI is not a column,
    // Afiliados does not exist; the fourth source matches.
    let statuses: Vec<_> = result.probes.iter().map(|p| p.status).collect();
    assert_eq!(
        statuses,
        [
            ProbeStatus::Empty,
            ProbeStatus::Failed,
            ProbeStatus::Failed,
            ProbeStatus::Matched
        ]
    );
}

#[test]
fn broken_affiliate_source_is_skipped() {
    let store = Arc::new(FlakyStore::new(fixture_store(), "afiliados"));
    let dir = Directory::new(store.clone(), DirectoryConfig::default());

    let result = dir.find_by_key("20123456").unwrap();
    assert!(result.record.is_some());
    assert_eq!(result.probes[0].status, ProbeStatus::Failed);
    assert_eq!(result.probes[1].status, ProbeStatus::Failed);
    // Stopped at the first match; the fifth source was never read.
    assert_eq!(store.reads.load(Ordering::SeqCst), 4);

    let result = dir.find_by_key("30999888").unwrap();
    assert!(result.record.is_none());
    assert_eq!(result.probes.len(), 5);
}

#[test]
fn broken_provider_table_is_upstream_unavailable() {
    let dir = directory(FlakyStore::new(fixture_store(), "prestadores"));

    let err = dir
        .search("cardio", &ProviderFilters::default(), None)
        .unwrap_err();
    match err {
        DirectoryError::UpstreamUnavailable { source_name, .. } => {
            assert_eq!(source_name, "prestadores")
        }
        other => panic!("unexpected error: {other:?}"),
    }

    let origin = GeoPoint::new(-31.7330, -60.5299).unwrap();
    assert!(matches!(
        dir.find_nearby(origin, 10.0, None),
        Err(DirectoryError::UpstreamUnavailable { .. })
    ));
}

#[test]
fn invalid_inputs() {
    let dir = directory(fixture_store());
    assert!(matches!(
        GeoPoint::new(-95.0, 0.0),
        Err(DirectoryError::InvalidInput(_))
    ));
    let origin = GeoPoint::new(-31.7330, -60.5299).unwrap();
    assert!(matches!(
        dir.find_nearby(origin, -5.0, None),
        Err(DirectoryError::InvalidInput(_))
    ));
    assert!(matches!(
        dir.find_by_key("sin numero"),
        Err(DirectoryError::InvalidInput(_))
    ));
}

#[test]
fn source_counts_report_missing_tables() {
    let dir = directory(fixture_store());
    let counts = dir.source_counts();
    let prestadores = counts.iter().find(|(t, _)| t == "prestadores").unwrap();
    assert_eq!(prestadores.1.as_ref().ok(), Some(&4));
    let missing = counts.iter().find(|(t, _)| t == "Afiliados").unwrap();
    assert!(missing.1.is_err());
}

#[test]
fn duckdb_backed_directory() {
    let conn = duckdb::Connection::open_in_memory().unwrap();
    conn.execute_batch(
        r#"
        CREATE TABLE prestadores (
            "ID" INTEGER, "NOMBRE_COMPLETO" VARCHAR, "ESPECIALIDAD" VARCHAR,
            "LOCALIDAD" VARCHAR, "LATITUD" DOUBLE, "LONGITUD" DOUBLE
        );
        INSERT INTO prestadores VALUES
            (1, 'Dra. Laura Gómez', 'CARDIOLOGIA', 'Paraná', -31.74, -60.52),
            (2, 'Clínica Santa Fe', 'Cardiología', 'Santa Fe', -31.6333, -60.70),
            (3, 'Sin Coordenadas', 'CARDIOLOGIA', 'Paraná', NULL, NULL);
        CREATE TABLE localidades (
            localidad VARCHAR, provincia VARCHAR, latitud DOUBLE, longitud DOUBLE
        );
        INSERT INTO localidades VALUES ('Paraná', 'Entre Ríos', -31.7330, -60.5299);
        CREATE TABLE padron_afiliados ("Numero de Documento" BIGINT, "APELLIDO_Y_NOMBRE" VARCHAR);
        INSERT INTO padron_afiliados VALUES (20123456, 'FERNANDEZ MARIA');
        "#,
    )
    .unwrap();
    let dir = directory(DuckDbStore::from_connection(conn));

    let origin = dir.resolve_locality("Paraná", Some("entre rios")).unwrap()[0].point;
    let found = dir.find_nearby(origin, 25.0, Some("cardiologia")).unwrap();
    let ids: Vec<_> = found.iter().filter_map(|s| s.provider.id.as_deref()).collect();
    assert_eq!(ids, ["1", "2"]);

    let hits = dir.search("coordenadas", &ProviderFilters::default(), None).unwrap();
    assert_eq!(hits.len(), 1);
    assert!(hits[0].point.is_none());

    let result = dir.find_by_key("20.123.456").unwrap();
    assert_eq!(
        result.record.and_then(|r| r.name).as_deref(),
        Some("FERNANDEZ MARIA")
    );
    assert_eq!(
        result.source.map(|s| s.key_column).as_deref(),
        Some("Numero de Documento")
    );
}
