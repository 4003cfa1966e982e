//! Decentralized-exchange pair adapter
//!
//! Fetches pair state for a token from DexScreener and normalizes the
//! deepest pair (highest USD liquidity) into a [`MarketSnapshot`]. Every
//! provider field is optional in the DTOs: a field DexScreener leaves out
//! stays out of the snapshot instead of collapsing to zero.

use super::{DataSource, FetchError};
use crate::snapshot::{Horizon, MarketSnapshot, VenueKind};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::str::FromStr;
use std::time::Duration;

/// DexScreener API base URL
pub const DEXSCREENER_API_URL: &str = "https://api.dexscreener.com/latest";

/// Configuration for the DEX pair source
#[derive(Debug, Clone)]
pub struct DexConfig {
    /// Base URL for the DexScreener API
    pub base_url: String,
    /// Request timeout
    pub timeout: Duration,
    /// Chain the configured tokens live on (solana, ethereum, ...)
    pub chain: String,
}

impl Default for DexConfig {
    fn default() -> Self {
        Self {
            base_url: DEXSCREENER_API_URL.to_string(),
            timeout: Duration::from_secs(15),
            chain: "solana".to_string(),
        }
    }
}

/// Token lookup response
#[derive(Debug, Deserialize)]
pub(super) struct DexTokenResponse {
    pub(super) pairs: Option<Vec<DexPair>>,
}

/// One pair as DexScreener reports it
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct DexPair {
    pub(super) chain_id: Option<String>,
    pub(super) pair_address: Option<String>,
    pub(super) base_token: Option<DexBaseToken>,
    pub(super) price_usd: Option<String>,
    pub(super) volume: Option<DexHorizons>,
    pub(super) price_change: Option<DexHorizons>,
    pub(super) liquidity: Option<DexLiquidity>,
    pub(super) fdv: Option<f64>,
    pub(super) pair_created_at: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub(super) struct DexBaseToken {
    pub(super) symbol: Option<String>,
    pub(super) address: Option<String>,
}

/// Per-horizon numeric map; the provider also sends h6, which no rule reads
#[derive(Debug, Deserialize)]
pub(super) struct DexHorizons {
    pub(super) m5: Option<f64>,
    pub(super) h1: Option<f64>,
    pub(super) h24: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub(super) struct DexLiquidity {
    pub(super) usd: Option<f64>,
}

impl DexPair {
    /// Liquidity used for deepest-pair selection; unknown sorts last
    pub(super) fn liquidity_usd(&self) -> f64 {
        self.liquidity.as_ref().and_then(|l| l.usd).unwrap_or(0.0)
    }
}

/// Lossless f64 to Decimal conversion; provider floats only cross into
/// Decimal here, at the adapter boundary.
pub(super) fn decimal_from_f64(value: f64) -> Option<Decimal> {
    Decimal::from_f64_retain(value)
}

/// Normalize one DexScreener pair into a snapshot.
///
/// Returns `None` when the pair is missing its identity fields (address,
/// symbol or price); such pairs cannot be keyed or evaluated.
pub(super) fn normalize_pair(
    pair: &DexPair,
    fallback_chain: &str,
    now: DateTime<Utc>,
) -> Option<MarketSnapshot> {
    let chain = pair.chain_id.as_deref().unwrap_or(fallback_chain);
    let token = pair.base_token.as_ref()?;
    let symbol = token.symbol.as_deref()?;
    let pair_address = pair.pair_address.as_deref()?;
    let price = Decimal::from_str(pair.price_usd.as_deref()?).ok()?;

    let mut snapshot = MarketSnapshot::new(
        format!("{chain}:{symbol}:{pair_address}"),
        VenueKind::Dex,
        price,
    );
    snapshot.observed_at = now;

    if let Some(volume) = &pair.volume {
        for (horizon, value) in [
            (Horizon::M5, volume.m5),
            (Horizon::H1, volume.h1),
            (Horizon::H24, volume.h24),
        ] {
            if let Some(v) = value.and_then(decimal_from_f64) {
                snapshot.volume.insert(horizon, v);
            }
        }
    }

    if let Some(change) = &pair.price_change {
        for (horizon, value) in [
            (Horizon::M5, change.m5),
            (Horizon::H1, change.h1),
            (Horizon::H24, change.h24),
        ] {
            if let Some(v) = value.and_then(decimal_from_f64) {
                snapshot.price_change_pct.insert(horizon, v);
            }
        }
    }

    snapshot.liquidity_usd = pair
        .liquidity
        .as_ref()
        .and_then(|l| l.usd)
        .and_then(decimal_from_f64);
    snapshot.fdv_usd = pair.fdv.and_then(decimal_from_f64);

    // Missing creation time stays unknown; Rule B abstains on it
    snapshot.pair_age_minutes = pair.pair_created_at.and_then(|created_ms| {
        let created = DateTime::from_timestamp_millis(created_ms)?;
        let age = now - created;
        decimal_from_f64((age.num_seconds().max(0) as f64) / 60.0)
    });

    Some(snapshot)
}

/// DexScreener token-pair source
pub struct DexPairSource {
    config: DexConfig,
    client: Client,
}

impl DexPairSource {
    pub fn new() -> Self {
        Self::with_config(DexConfig::default())
    }

    pub fn with_config(config: DexConfig) -> Self {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .expect("Failed to create HTTP client");
        Self { config, client }
    }

    /// Pick the deepest pair and normalize it
    fn normalize(&self, pairs: &[DexPair], now: DateTime<Utc>) -> Result<MarketSnapshot, FetchError> {
        let deepest = pairs
            .iter()
            .max_by(|a, b| a.liquidity_usd().total_cmp(&b.liquidity_usd()))
            .ok_or(FetchError::Empty)?;

        normalize_pair(deepest, &self.config.chain, now).ok_or(FetchError::Empty)
    }
}

impl Default for DexPairSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DataSource for DexPairSource {
    fn venue(&self) -> VenueKind {
        VenueKind::Dex
    }

    async fn fetch(&self, instrument: &str) -> Result<MarketSnapshot, FetchError> {
        let url = format!("{}/dex/tokens/{}", self.config.base_url, instrument);

        tracing::debug!(token = instrument, "Fetching DEX pair state");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(FetchError::from_reqwest)?;

        if !response.status().is_success() {
            return Err(FetchError::from_status(response.status()));
        }

        let body: DexTokenResponse = response.json().await.map_err(FetchError::from_reqwest)?;
        let pairs = body.pairs.unwrap_or_default();
        self.normalize(&pairs, Utc::now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn fixture() -> &'static str {
        r#"{
            "pairs": [
                {
                    "chainId": "solana",
                    "pairAddress": "shallowPair",
                    "baseToken": { "symbol": "WIF", "address": "tok1" },
                    "priceUsd": "2.5",
                    "volume": { "m5": 100.0, "h1": 1000.0, "h24": 24000.0 },
                    "priceChange": { "h1": 1.2, "h24": -3.0 },
                    "liquidity": { "usd": 40000.0 },
                    "fdv": 1000000.0
                },
                {
                    "chainId": "solana",
                    "pairAddress": "deepPair",
                    "baseToken": { "symbol": "WIF", "address": "tok1" },
                    "priceUsd": "2.51",
                    "volume": { "h1": 90000.0, "h24": 240000.0 },
                    "priceChange": { "h1": 2.0 },
                    "liquidity": { "usd": 500000.0 },
                    "fdv": 1000000.0,
                    "pairCreatedAt": 1700000000000
                }
            ]
        }"#
    }

    #[test]
    fn test_selects_deepest_pair() {
        let body: DexTokenResponse = serde_json::from_str(fixture()).unwrap();
        let source = DexPairSource::new();
        let now = DateTime::from_timestamp(1_700_003_600, 0).unwrap();
        let snap = source.normalize(&body.pairs.unwrap(), now).unwrap();

        assert_eq!(snap.asset_key, "solana:WIF:deepPair");
        assert_eq!(snap.price, dec!(2.51));
        assert_eq!(snap.liquidity_usd, Some(dec!(500000)));
        assert_eq!(snap.volume_at(Horizon::H1), Some(dec!(90000)));
        // One hour since creation
        assert_eq!(snap.pair_age_minutes, Some(dec!(60)));
    }

    #[test]
    fn test_absent_horizons_stay_unknown() {
        let body: DexTokenResponse = serde_json::from_str(fixture()).unwrap();
        let source = DexPairSource::new();
        let snap = source
            .normalize(&body.pairs.unwrap(), Utc::now())
            .unwrap();

        // The deep pair reports no m5 volume and no h24 price change
        assert!(snap.volume_at(Horizon::M5).is_none());
        assert!(snap.price_change(Horizon::H24).is_none());
    }

    #[test]
    fn test_empty_pair_list() {
        let source = DexPairSource::new();
        assert!(matches!(
            source.normalize(&[], Utc::now()),
            Err(FetchError::Empty)
        ));
    }

    #[test]
    fn test_missing_creation_time_is_unknown_age() {
        let json = r#"{
            "pairs": [{
                "chainId": "solana",
                "pairAddress": "p1",
                "baseToken": { "symbol": "NEW", "address": "tok" },
                "priceUsd": "0.001",
                "liquidity": { "usd": 60000.0 }
            }]
        }"#;
        let body: DexTokenResponse = serde_json::from_str(json).unwrap();
        let source = DexPairSource::new();
        let snap = source.normalize(&body.pairs.unwrap(), Utc::now()).unwrap();
        assert!(snap.pair_age_minutes.is_none());
    }

    #[test]
    fn test_pair_without_identity_is_empty() {
        let json = r#"{ "pairs": [{ "chainId": "solana" }] }"#;
        let body: DexTokenResponse = serde_json::from_str(json).unwrap();
        let source = DexPairSource::new();
        assert!(matches!(
            source.normalize(&body.pairs.unwrap(), Utc::now()),
            Err(FetchError::Empty)
        ));
    }
}
