use std::sync::Arc;

use crate::config::DirectoryConfig;
use crate::error::DirectoryError;
use crate::geo::GeoPoint;
use crate::locality::{LocalityRecord, LocalityResolver};
use crate::provider::{ProviderDirectory, ProviderFilters, ProviderRecord};
use crate::proximity::{ProximitySearch, ScoredProvider, TieredNearby, expand_nearby};
use crate::reconcile::{EntityReconciler, Reconciliation};
use crate::store::RecordStore;

/// Entry point for the surrounding application. Holds one injected store
/// handle shared by every component; no state survives a call.
#[derive(Clone)]
pub struct Directory {
    store: Arc<dyn RecordStore>,
    config: DirectoryConfig,
    localities: LocalityResolver,
    providers: ProviderDirectory,
    proximity: ProximitySearch,
    affiliates: EntityReconciler,
}

impl Directory {
    pub fn new(store: Arc<dyn RecordStore>, config: DirectoryConfig) -> Self {
        let providers = ProviderDirectory::new(Arc::clone(&store), &config.provider_table);
        Self {
            localities: LocalityResolver::new(Arc::clone(&store), &config.locality_table),
            proximity: ProximitySearch::new(providers.clone()),
            providers,
            affiliates: EntityReconciler::new(
                Arc::clone(&store),
                config.affiliate_sources.clone(),
            ),
            store,
            config,
        }
    }

    pub fn resolve_locality(
        &self,
        query: &str,
        province_hint: Option<&str>,
    ) -> Result<Vec<LocalityRecord>, DirectoryError> {
        self.localities.resolve(query, province_hint)
    }

    pub fn find_nearby(
        &self,
        origin: GeoPoint,
        radius_km: f64,
        specialty: Option<&str>,
    ) -> Result<Vec<ScoredProvider>, DirectoryError> {
        self.proximity.find_nearby(origin, radius_km, specialty)
    }

    /// Walks the configured radius tiers; see [`expand_nearby`].
    pub fn find_nearby_expanding(
        &self,
        origin: GeoPoint,
        specialty: Option<&str>,
        min_results: Option<usize>,
    ) -> Result<TieredNearby, DirectoryError> {
        expand_nearby(
            &self.proximity,
            origin,
            specialty,
            &self.config.radius_tiers_km,
            min_results.unwrap_or(self.config.min_nearby_results),
        )
    }

    pub fn search(
        &self,
        query: &str,
        filters: &ProviderFilters,
        limit: Option<usize>,
    ) -> Result<Vec<ProviderRecord>, DirectoryError> {
        self.providers.search(query, filters, limit)
    }

    pub fn find_by_key(&self, key: &str) -> Result<Reconciliation, DirectoryError> {
        self.affiliates.find_by_key(key)
    }

    /// `count_records` per configured table. A failing table reports its
    /// error instead of a count.
    pub fn source_counts(&self) -> Vec<(String, Result<u64, String>)> {
        self.config
            .tables()
            .into_iter()
            .map(|table| {
                let count = self.store.count_records(&table).map_err(|e| e.to_string());
                (table, count)
            })
            .collect()
    }
}
