//! Newly created pool discovery
//!
//! Searches DexScreener per chain and pre-filters the result before any
//! rule runs. The filters reject the classic rug-pull shapes up front:
//! shallow liquidity, no real volume, a vertical 5-minute pump bait, and
//! pairs only minutes old. Pairs without a creation timestamp pass the age
//! filter but keep their age unknown in the snapshot.

use super::dex::{decimal_from_f64, normalize_pair, DexPair, DexTokenResponse};
use super::{DiscoverySource, FetchError};
use crate::snapshot::MarketSnapshot;
use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use rust_decimal::Decimal;
use std::time::Duration;

/// Configuration for pool discovery
#[derive(Debug, Clone)]
pub struct PoolDiscoveryConfig {
    /// Base URL for the DexScreener API
    pub base_url: String,
    /// Request timeout
    pub timeout: Duration,
    /// Chains to search, in order
    pub chains: Vec<String>,
    /// Liquidity floor in USD
    pub min_liquidity_usd: Decimal,
    /// 1h volume floor in USD
    pub min_volume_h1_usd: Decimal,
    /// Absolute 5m price change above this is pump bait
    pub max_price_change_m5_pct: Decimal,
    /// Pairs younger than this are still chaotic
    pub min_pair_age_minutes: Decimal,
    /// FDV cap in USD; large caps have no room to run
    pub max_fdv_usd: Decimal,
    /// Maximum pairs normalized per cycle
    pub max_pairs_per_cycle: usize,
}

impl Default for PoolDiscoveryConfig {
    fn default() -> Self {
        Self {
            base_url: super::dex::DEXSCREENER_API_URL.to_string(),
            timeout: Duration::from_secs(15),
            chains: vec!["solana".to_string()],
            min_liquidity_usd: Decimal::from(5_000),
            min_volume_h1_usd: Decimal::from(10_000),
            max_price_change_m5_pct: Decimal::from(300),
            min_pair_age_minutes: Decimal::from(10),
            max_fdv_usd: Decimal::from(50_000_000),
            max_pairs_per_cycle: 50,
        }
    }
}

/// DexScreener search-based pool discovery
pub struct PoolDiscoverySource {
    config: PoolDiscoveryConfig,
    client: Client,
}

impl PoolDiscoverySource {
    pub fn new() -> Self {
        Self::with_config(PoolDiscoveryConfig::default())
    }

    pub fn with_config(config: PoolDiscoveryConfig) -> Self {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .expect("Failed to create HTTP client");
        Self { config, client }
    }

    /// Apply the pre-filters to one raw pair
    fn passes_filters(&self, pair: &DexPair) -> bool {
        let liquidity = decimal_from_f64(pair.liquidity_usd()).unwrap_or_default();
        if liquidity < self.config.min_liquidity_usd {
            return false;
        }

        let vol_h1 = pair
            .volume
            .as_ref()
            .and_then(|v| v.h1)
            .and_then(decimal_from_f64)
            .unwrap_or_default();
        if vol_h1 < self.config.min_volume_h1_usd {
            return false;
        }

        let change_m5 = pair
            .price_change
            .as_ref()
            .and_then(|c| c.m5)
            .and_then(decimal_from_f64)
            .unwrap_or_default();
        if change_m5.abs() > self.config.max_price_change_m5_pct {
            return false;
        }

        // Unknown creation time passes; the snapshot keeps age as unknown
        // and the age-dependent rule abstains on it later.
        if let Some(created_ms) = pair.pair_created_at {
            if let Some(created) = chrono::DateTime::from_timestamp_millis(created_ms) {
                let age_minutes = Decimal::from((Utc::now() - created).num_minutes().max(0));
                if age_minutes < self.config.min_pair_age_minutes {
                    return false;
                }
            }
        }

        if let Some(fdv) = pair.fdv.and_then(decimal_from_f64) {
            if fdv > self.config.max_fdv_usd && fdv > Decimal::ZERO {
                return false;
            }
        }

        true
    }

    fn normalize_batch(&self, chain: &str, pairs: &[DexPair]) -> Vec<MarketSnapshot> {
        let now = Utc::now();
        pairs
            .iter()
            .filter(|p| self.passes_filters(p))
            .filter_map(|p| normalize_pair(p, chain, now))
            .take(self.config.max_pairs_per_cycle)
            .collect()
    }

    async fn search_chain(&self, chain: &str) -> Result<Vec<MarketSnapshot>, FetchError> {
        let url = format!("{}/dex/search", self.config.base_url);

        let response = self
            .client
            .get(&url)
            .query(&[("q", chain)])
            .send()
            .await
            .map_err(FetchError::from_reqwest)?;

        if !response.status().is_success() {
            return Err(FetchError::from_status(response.status()));
        }

        let body: DexTokenResponse = response.json().await.map_err(FetchError::from_reqwest)?;
        let pairs = body.pairs.unwrap_or_default();

        tracing::debug!(chain, raw = pairs.len(), "Discovery search returned pairs");
        Ok(self.normalize_batch(chain, &pairs))
    }
}

impl Default for PoolDiscoverySource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DiscoverySource for PoolDiscoverySource {
    async fn discover(&self) -> Result<Vec<MarketSnapshot>, FetchError> {
        let mut all = Vec::new();
        for chain in &self.config.chains {
            match self.search_chain(chain).await {
                Ok(mut snapshots) => all.append(&mut snapshots),
                // Rate limiting aborts the whole cycle so the scheduler
                // backs the venue off instead of hammering the next chain.
                Err(err) if err.is_rate_limited() => return Err(err),
                Err(err) => {
                    tracing::warn!(chain, error = %err, "Discovery failed for chain, skipping");
                }
            }
        }
        Ok(all)
    }
}
