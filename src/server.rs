use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::extract::{Path as AxumPath, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};

use cartilla_backend::geo::{GeoPoint, parse_coordinate};
use cartilla_backend::locality::LocalityRecord;
use cartilla_backend::provider::ProviderFilters;
use cartilla_backend::proximity::{ScoredProvider, TierAttempt};
use cartilla_backend::{Directory, DirectoryError};

use crate::cli::ServeArgs;
use crate::storage::open_sources;

#[derive(Clone)]
struct AppState {
    directory: Arc<Directory>,
}

pub async fn run(opts: ServeArgs) -> anyhow::Result<()> {
    let (store, config) = open_sources(&opts.source)?;
    let state = AppState {
        directory: Arc::new(Directory::new(store, config)),
    };
    let app = build_app(state);

    let addr: SocketAddr = format!("{}:{}", opts.host, opts.port)
        .parse()
        .context("parse host:port")?;

    tracing::info!("Listening on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

fn build_app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/stats", get(api_stats))
        .route("/api/localities", get(api_localities))
        .route("/api/providers/nearby", get(api_providers_nearby))
        .route("/api/providers/search", get(api_provider_search))
        .route("/api/affiliates/:key", get(api_affiliate))
        .layer(cors)
        .with_state(state)
}

#[derive(Debug, Serialize)]
struct ApiResponse<T> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<ApiError>,
}

#[derive(Debug, Serialize)]
struct ApiError {
    kind: &'static str,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    source: Option<String>,
}

fn respond<T: Serialize>(result: Result<T, DirectoryError>) -> Response {
    match result {
        Ok(data) => Json(ApiResponse {
            success: true,
            data: Some(data),
            error: None,
        })
        .into_response(),
        Err(e) => {
            let status = match &e {
                DirectoryError::InvalidInput(_) => StatusCode::BAD_REQUEST,
                DirectoryError::UpstreamUnavailable { .. } => StatusCode::BAD_GATEWAY,
            };
            let source = match &e {
                DirectoryError::UpstreamUnavailable { source_name, .. } => {
                    tracing::warn!(source = %source_name, error = %e, "directory request failed");
                    Some(source_name.clone())
                }
                DirectoryError::InvalidInput(_) => None,
            };
            let body = ApiResponse::<()> {
                success: false,
                data: None,
                error: Some(ApiError {
                    kind: e.kind(),
                    message: e.to_string(),
                    source,
                }),
            };
            (status, Json(body)).into_response()
        }
    }
}

/// Runs a directory call off the async runtime; store reads block.
async fn blocking<T, F>(st: &AppState, f: F) -> Response
where
    T: Serialize + Send + 'static,
    F: FnOnce(&Directory) -> Result<T, DirectoryError> + Send + 'static,
{
    let directory = Arc::clone(&st.directory);
    match tokio::task::spawn_blocking(move || f(&directory)).await {
        Ok(result) => respond(result),
        Err(e) => {
            tracing::error!(error = %e, "directory task panicked");
            let body = ApiResponse::<()> {
                success: false,
                data: None,
                error: Some(ApiError {
                    kind: "internal",
                    message: "internal error".to_string(),
                    source: None,
                }),
            };
            (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
        }
    }
}

#[derive(Debug, Serialize)]
struct SourceCount {
    table: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    count: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

async fn api_stats(State(st): State<AppState>) -> impl IntoResponse {
    blocking(&st, |dir| {
        Ok(dir
            .source_counts()
            .into_iter()
            .map(|(table, count)| match count {
                Ok(n) => SourceCount {
                    table,
                    count: Some(n),
                    error: None,
                },
                Err(e) => SourceCount {
                    table,
                    count: None,
                    error: Some(e),
                },
            })
            .collect::<Vec<_>>())
    })
    .await
}

#[derive(Debug, Deserialize)]
struct LocalityParams {
    q: Option<String>,
    province: Option<String>,
}

async fn api_localities(
    State(st): State<AppState>,
    Query(p): Query<LocalityParams>,
) -> impl IntoResponse {
    blocking(&st, move |dir| {
        dir.resolve_locality(p.q.as_deref().unwrap_or(""), p.province.as_deref())
    })
    .await
}

// Numeric fields arrive as text so bad input gets the JSON error envelope.
#[derive(Debug, Deserialize)]
struct NearbyParams {
    lat: Option<String>,
    lon: Option<String>,
    radius_km: Option<String>,
    specialty: Option<String>,
    locality: Option<String>,
    province: Option<String>,
    expand: Option<String>,
    min_results: Option<String>,
}

#[derive(Debug, Default, Serialize)]
struct NearbyResponse {
    origin: Option<GeoPoint>,
    #[serde(skip_serializing_if = "Option::is_none")]
    locality: Option<LocalityRecord>,
    /// Set when a locality name matched more than one place; no search runs.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    candidates: Vec<LocalityRecord>,
    radius_km: Option<f64>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    attempts: Vec<TierAttempt>,
    providers: Vec<ScoredProvider>,
}

async fn api_providers_nearby(
    State(st): State<AppState>,
    Query(p): Query<NearbyParams>,
) -> impl IntoResponse {
    blocking(&st, move |dir| nearby(dir, &p)).await
}

fn nearby(dir: &Directory, p: &NearbyParams) -> Result<NearbyResponse, DirectoryError> {
    let expand = p
        .expand
        .as_deref()
        .map(|s| matches!(s.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
        .unwrap_or(false);
    let specialty = p.specialty.as_deref().map(str::trim).filter(|s| !s.is_empty());

    let mut out = NearbyResponse::default();
    let origin = match (&p.lat, &p.lon, non_blank(p.locality.as_deref())) {
        (Some(lat), Some(lon), _) => GeoPoint::new(
            parse_number("lat", lat)?,
            parse_number("lon", lon)?,
        )?,
        (None, None, Some(locality)) => {
            let mut found = dir.resolve_locality(locality, p.province.as_deref())?;
            if found.len() != 1 {
                out.candidates = found;
                return Ok(out);
            }
            let record = found.remove(0);
            let point = record.point;
            out.locality = Some(record);
            point
        }
        _ => {
            return Err(DirectoryError::InvalidInput(
                "pass both lat and lon, or a locality".to_string(),
            ));
        }
    };
    out.origin = Some(origin);

    if expand {
        let min_results = parse_count("min_results", p.min_results.as_deref())?;
        let tiered = dir.find_nearby_expanding(origin, specialty, min_results)?;
        out.radius_km = tiered.radius_km;
        out.attempts = tiered.attempts;
        out.providers = tiered.providers;
    } else {
        let radius_km = match p.radius_km.as_deref() {
            Some(r) => parse_number("radius_km", r)?,
            None => {
                return Err(DirectoryError::InvalidInput(
                    "radius_km is required unless expand=true".to_string(),
                ));
            }
        };
        out.radius_km = Some(radius_km);
        out.providers = dir.find_nearby(origin, radius_km, specialty)?;
    }
    Ok(out)
}

fn parse_number(name: &str, raw: &str) -> Result<f64, DirectoryError> {
    parse_coordinate(raw)
        .ok_or_else(|| DirectoryError::InvalidInput(format!("{name} is not a number: {raw:?}")))
}

/// Blank counts are treated as absent.
fn parse_count(name: &str, raw: Option<&str>) -> Result<Option<usize>, DirectoryError> {
    non_blank(raw)
        .map(|r| {
            r.parse::<usize>().map_err(|_| {
                DirectoryError::InvalidInput(format!("{name} is not a whole number: {r:?}"))
            })
        })
        .transpose()
}

fn non_blank(s: Option<&str>) -> Option<&str> {
    s.map(str::trim).filter(|s| !s.is_empty())
}

#[derive(Debug, Deserialize)]
struct ProviderSearchParams {
    q: Option<String>,
    locality: Option<String>,
    specialty: Option<String>,
    name: Option<String>,
    limit: Option<String>,
}

async fn api_provider_search(
    State(st): State<AppState>,
    Query(p): Query<ProviderSearchParams>,
) -> impl IntoResponse {
    blocking(&st, move |dir| {
        let limit = parse_count("limit", p.limit.as_deref())?;
        let filters = ProviderFilters {
            locality: p.locality,
            specialty: p.specialty,
            provider_name: p.name,
        };
        dir.search(p.q.as_deref().unwrap_or(""), &filters, limit)
    })
    .await
}

async fn api_affiliate(
    State(st): State<AppState>,
    AxumPath(key): AxumPath<String>,
) -> impl IntoResponse {
    blocking(&st, move |dir| dir.find_by_key(&key)).await
}
