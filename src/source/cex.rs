//! Centralized-exchange candle adapter
//!
//! Pulls hourly klines from Binance's public REST API and normalizes the
//! last closed candle into a [`MarketSnapshot`]: 1h volume and price change
//! from the candle itself, the 24h volume from the closed candles before
//! it, and the high-low range as realized volatility. The in-formation
//! candle only supplies the current price.

use super::{DataSource, FetchError};
use crate::snapshot::{Horizon, MarketSnapshot, VenueKind};
use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::str::FromStr;
use std::time::Duration;

/// Binance REST base URL
pub const BINANCE_API_URL: &str = "https://api.binance.com";

/// Configuration for the CEX candle source
#[derive(Debug, Clone)]
pub struct CexConfig {
    /// Base URL for the klines endpoint
    pub base_url: String,
    /// Request timeout
    pub timeout: Duration,
    /// Candle interval (the divergence rule expects "1h")
    pub interval: String,
    /// Number of candles to request; 24 closed plus the forming one
    pub candle_limit: usize,
}

impl Default for CexConfig {
    fn default() -> Self {
        Self {
            base_url: BINANCE_API_URL.to_string(),
            timeout: Duration::from_secs(10),
            interval: "1h".to_string(),
            candle_limit: 25,
        }
    }
}

/// Raw kline row as Binance returns it: numbers and strings mixed in a
/// positional array.
type RawKline = (
    i64,    // open time
    String, // open
    String, // high
    String, // low
    String, // close
    String, // base volume
    i64,    // close time
    String, // quote volume
    u64,    // trade count
    String, // taker buy base volume
    String, // taker buy quote volume
    String, // ignore
);

/// One parsed candle
#[derive(Debug, Clone)]
struct Candle {
    open: Decimal,
    high: Decimal,
    low: Decimal,
    close: Decimal,
    quote_volume: Decimal,
}

impl Candle {
    fn parse(raw: &RawKline) -> Result<Self, FetchError> {
        let field = |s: &str| {
            Decimal::from_str(s).map_err(|e| FetchError::Provider {
                message: format!("bad kline field {s:?}: {e}"),
            })
        };
        Ok(Self {
            open: field(&raw.1)?,
            high: field(&raw.2)?,
            low: field(&raw.3)?,
            close: field(&raw.4)?,
            quote_volume: field(&raw.7)?,
        })
    }
}

/// Binance klines source for CEX instruments
pub struct CexCandleSource {
    config: CexConfig,
    client: Client,
}

impl CexCandleSource {
    pub fn new() -> Self {
        Self::with_config(CexConfig::default())
    }

    pub fn with_config(config: CexConfig) -> Self {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .expect("Failed to create HTTP client");
        Self { config, client }
    }

    /// Binance symbol for a "BASE/QUOTE" pair
    fn api_symbol(instrument: &str) -> String {
        instrument.replace('/', "")
    }

    /// Normalize a kline response for one instrument.
    ///
    /// Requires the full candle window; a short response means the pair is
    /// too young for a meaningful average and maps to `Empty`.
    fn normalize(&self, instrument: &str, raw: &[RawKline]) -> Result<MarketSnapshot, FetchError> {
        if raw.len() < self.config.candle_limit {
            return Err(FetchError::Empty);
        }

        let candles: Vec<Candle> = raw.iter().map(Candle::parse).collect::<Result<_, _>>()?;

        // Last element is still forming; the one before it is the last
        // closed candle that the rules evaluate.
        let closed = &candles[candles.len() - 2];
        let forming = &candles[candles.len() - 1];
        let window = &candles[..candles.len() - 1];

        let mut snapshot = MarketSnapshot::new(
            format!("cex:{instrument}"),
            VenueKind::Cex,
            forming.close,
        );
        snapshot.observed_at = Utc::now();

        snapshot.volume.insert(Horizon::H1, closed.quote_volume);
        let h24: Decimal = window.iter().map(|c| c.quote_volume).sum();
        snapshot.volume.insert(Horizon::H24, h24);

        if closed.open > Decimal::ZERO {
            let change = (closed.close - closed.open) / closed.open * dec!(100);
            snapshot.price_change_pct.insert(Horizon::H1, change);

            let volatility = (closed.high - closed.low) / closed.open * dec!(100);
            snapshot.realized_volatility_pct = Some(volatility);
        }

        Ok(snapshot)
    }
}

impl Default for CexCandleSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DataSource for CexCandleSource {
    fn venue(&self) -> VenueKind {
        VenueKind::Cex
    }

    async fn fetch(&self, instrument: &str) -> Result<MarketSnapshot, FetchError> {
        let url = format!("{}/api/v3/klines", self.config.base_url);
        let symbol = Self::api_symbol(instrument);

        tracing::debug!(instrument, symbol = %symbol, "Fetching CEX candles");

        let response = self
            .client
            .get(&url)
            .query(&[
                ("symbol", symbol.as_str()),
                ("interval", self.config.interval.as_str()),
                ("limit", &self.config.candle_limit.to_string()),
            ])
            .send()
            .await
            .map_err(FetchError::from_reqwest)?;

        if !response.status().is_success() {
            return Err(FetchError::from_status(response.status()));
        }

        let raw: Vec<RawKline> = response.json().await.map_err(FetchError::from_reqwest)?;
        self.normalize(instrument, &raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kline(open: &str, high: &str, low: &str, close: &str, quote_volume: &str) -> RawKline {
        (
            1_700_000_000_000,
            open.to_string(),
            high.to_string(),
            low.to_string(),
            close.to_string(),
            "1.0".to_string(),
            1_700_000_360_000,
            quote_volume.to_string(),
            100,
            "0.5".to_string(),
            "0.5".to_string(),
            "0".to_string(),
        )
    }

    /// 23 quiet candles, one spiking closed candle, one forming candle
    fn spiky_window() -> Vec<RawKline> {
        let mut raw: Vec<RawKline> =
            (0..23).map(|_| kline("100", "101", "99", "100", "1000")).collect();
        raw.push(kline("100", "101.5", "99.5", "101", "4000"));
        raw.push(kline("101", "102", "101", "101.5", "250"));
        raw
    }

    #[test]
    fn test_normalize_spiky_window() {
        let source = CexCandleSource::new();
        let snap = source.normalize("BTC/USDT", &spiky_window()).unwrap();

        assert_eq!(snap.asset_key, "cex:BTC/USDT");
        assert_eq!(snap.venue_kind, VenueKind::Cex);
        // Price comes from the forming candle
        assert_eq!(snap.price, dec!(101.5));
        // 1h volume from the last closed candle
        assert_eq!(snap.volume_at(Horizon::H1), Some(dec!(4000)));
        // 24h volume sums the closed candles: 23 * 1000 + 4000
        assert_eq!(snap.volume_at(Horizon::H24), Some(dec!(27000)));
        // (101 - 100) / 100 = +1%
        assert_eq!(snap.price_change(Horizon::H1), Some(dec!(1)));
        // (101.5 - 99.5) / 100 = 2%
        assert_eq!(snap.realized_volatility_pct, Some(dec!(2)));
    }

    #[test]
    fn test_normalize_short_window_is_empty() {
        let source = CexCandleSource::new();
        let raw: Vec<RawKline> = (0..10).map(|_| kline("1", "1", "1", "1", "1")).collect();
        assert!(matches!(
            source.normalize("BTC/USDT", &raw),
            Err(FetchError::Empty)
        ));
    }

    #[test]
    fn test_normalize_bad_field_is_provider_error() {
        let source = CexCandleSource::new();
        let mut raw = spiky_window();
        raw[3].4 = "not-a-number".to_string();
        assert!(matches!(
            source.normalize("BTC/USDT", &raw),
            Err(FetchError::Provider { .. })
        ));
    }

    #[test]
    fn test_zero_open_leaves_change_unknown() {
        let source = CexCandleSource::new();
        let mut raw = spiky_window();
        let last_closed = raw.len() - 2;
        raw[last_closed].1 = "0".to_string();
        let snap = source.normalize("BTC/USDT", &raw).unwrap();
        // Unknown, not zero: the rule must abstain downstream
        assert!(snap.price_change(Horizon::H1).is_none());
        assert!(snap.realized_volatility_pct.is_none());
    }

    #[test]
    fn test_api_symbol() {
        assert_eq!(CexCandleSource::api_symbol("BTC/USDT"), "BTCUSDT");
        assert_eq!(CexCandleSource::api_symbol("SOLUSDT"), "SOLUSDT");
    }

    #[test]
    fn test_raw_kline_deserializes_from_binance_shape() {
        let json = r#"[
            [1700000000000, "100.0", "101.0", "99.0", "100.5", "12.5",
             1700003599999, "1255.0", 420, "6.0", "603.0", "0"]
        ]"#;
        let raw: Vec<RawKline> = serde_json::from_str(json).unwrap();
        let candle = Candle::parse(&raw[0]).unwrap();
        assert_eq!(candle.close, dec!(100.5));
        assert_eq!(candle.quote_volume, dec!(1255.0));
    }
}
