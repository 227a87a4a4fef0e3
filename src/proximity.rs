//! Radius search around a point.
//!
//! `find_nearby` answers for exactly one radius. Widening the search when a
//! radius comes back sparse is the caller's job: [`expand_nearby`] walks a
//! tier list with one explicit call per tier and records every attempt.

use std::cmp::Ordering;

use serde::Serialize;

use crate::error::DirectoryError;
use crate::geo::{GeoPoint, distance_km};
use crate::provider::{ProviderDirectory, ProviderRecord, field_contains, normalized_filter};

pub const DEFAULT_RADIUS_TIERS_KM: [f64; 5] = [10.0, 25.0, 50.0, 100.0, 200.0];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredProvider {
    #[serde(flatten)]
    pub provider: ProviderRecord,
    pub distance_km: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TierAttempt {
    pub radius_km: f64,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TieredNearby {
    pub attempts: Vec<TierAttempt>,
    /// Radius of the last attempt; `None` when the tier list was empty.
    pub radius_km: Option<f64>,
    pub providers: Vec<ScoredProvider>,
}

#[derive(Clone)]
pub struct ProximitySearch {
    providers: ProviderDirectory,
}

impl ProximitySearch {
    pub fn new(providers: ProviderDirectory) -> Self {
        Self { providers }
    }

    pub fn find_nearby(
        &self,
        origin: GeoPoint,
        radius_km: f64,
        specialty: Option<&str>,
    ) -> Result<Vec<ScoredProvider>, DirectoryError> {
        validate_radius(radius_km)?;
        let providers = self.providers.load_all()?;
        Ok(rank_nearby(&providers, origin, radius_km, specialty))
    }
}

pub fn validate_radius(radius_km: f64) -> Result<(), DirectoryError> {
    if !radius_km.is_finite() || radius_km < 0.0 {
        return Err(DirectoryError::InvalidInput(format!(
            "radius must be a non-negative number of km, got {radius_km}"
        )));
    }
    Ok(())
}

/// Providers within `radius_km` of `origin`, nearest first, ties by id.
/// Providers without a parsed point are skipped.
pub fn rank_nearby(
    providers: &[ProviderRecord],
    origin: GeoPoint,
    radius_km: f64,
    specialty: Option<&str>,
) -> Vec<ScoredProvider> {
    let specialty = normalized_filter(specialty);

    let mut out: Vec<ScoredProvider> = providers
        .iter()
        .filter_map(|p| {
            let point = p.point?;
            let d = distance_km(origin, point);
            if d > radius_km {
                return None;
            }
            if let Some(s) = specialty.as_deref() {
                if !field_contains(&p.specialty, s) {
                    return None;
                }
            }
            Some(ScoredProvider {
                provider: p.clone(),
                distance_km: d,
            })
        })
        .collect();

    out.sort_by(|a, b| {
        a.distance_km
            .total_cmp(&b.distance_km)
            .then_with(|| compare_ids(a.provider.id.as_deref(), b.provider.id.as_deref()))
    });
    out
}

/// Integer ids first, compared as numbers; then other ids as text; missing
/// ids last. A total order, so ties rank the same whatever the input order.
pub fn compare_ids(a: Option<&str>, b: Option<&str>) -> Ordering {
    id_key(a).cmp(&id_key(b))
}

fn id_key(id: Option<&str>) -> (u8, u64, &str) {
    match id {
        Some(s) => match s.parse::<u64>() {
            Ok(n) => (0, n, s),
            Err(_) => (1, 0, s),
        },
        None => (2, 0, ""),
    }
}

/// Calls `find_nearby` once per tier, smallest first, until a tier yields at
/// least `min_results` providers or the tiers run out.
pub fn expand_nearby(
    search: &ProximitySearch,
    origin: GeoPoint,
    specialty: Option<&str>,
    tiers_km: &[f64],
    min_results: usize,
) -> Result<TieredNearby, DirectoryError> {
    let mut result = TieredNearby {
        attempts: Vec::new(),
        radius_km: None,
        providers: Vec::new(),
    };
    for &radius_km in tiers_km {
        let providers = search.find_nearby(origin, radius_km, specialty)?;
        tracing::debug!(radius_km, count = providers.len(), "nearby tier");
        result.attempts.push(TierAttempt {
            radius_km,
            count: providers.len(),
        });
        result.radius_km = Some(radius_km);
        result.providers = providers;
        if result.providers.len() >= min_results {
            break;
        }
    }
    Ok(result)
}
