use std::path::Path;

use anyhow::{Context, anyhow};
use serde::{Deserialize, Serialize};

use crate::proximity::DEFAULT_RADIUS_TIERS_KM;
use crate::reconcile::{AffiliateSource, default_affiliate_sources};

/// Table names and search knobs. Every field has a default, so a config file
/// only needs to list what differs from the stock import layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DirectoryConfig {
    pub provider_table: String,
    pub locality_table: String,
    /// Probed in order by the affiliate lookup.
    pub affiliate_sources: Vec<AffiliateSource>,
    pub radius_tiers_km: Vec<f64>,
    /// Expansion stops at the first tier with at least this many providers.
    pub min_nearby_results: usize,
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self {
            provider_table: "prestadores".to_string(),
            locality_table: "localidades".to_string(),
            affiliate_sources: default_affiliate_sources(),
            radius_tiers_km: DEFAULT_RADIUS_TIERS_KM.to_vec(),
            min_nearby_results: 5,
        }
    }
}

impl DirectoryConfig {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let s = std::fs::read_to_string(path)
            .with_context(|| format!("read config {}", path.display()))?;
        let config: DirectoryConfig =
            serde_json::from_str(&s).with_context(|| format!("parse config {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load_or_default(path: Option<&Path>) -> anyhow::Result<Self> {
        match path {
            Some(p) => Self::load(p),
            None => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.provider_table.trim().is_empty() || self.locality_table.trim().is_empty() {
            return Err(anyhow!("provider_table and locality_table must be set"));
        }
        if self.affiliate_sources.is_empty() {
            return Err(anyhow!("affiliate_sources must list at least one source"));
        }
        if self.radius_tiers_km.is_empty() {
            return Err(anyhow!("radius_tiers_km must not be empty"));
        }
        if self
            .radius_tiers_km
            .iter()
            .any(|r| !r.is_finite() || *r < 0.0)
        {
            return Err(anyhow!("radius_tiers_km must be non-negative numbers"));
        }
        if self.radius_tiers_km.windows(2).any(|w| w[0] >= w[1]) {
            return Err(anyhow!("radius_tiers_km must be strictly ascending"));
        }
        Ok(())
    }

    /// Every table the directory reads, deduplicated, for diagnostics.
    pub fn tables(&self) -> Vec<String> {
        let mut out = vec![self.provider_table.clone(), self.locality_table.clone()];
        for s in &self.affiliate_sources {
            if !out.contains(&s.table) {
                out.push(s.table.clone());
            }
        }
        out
    }
}
