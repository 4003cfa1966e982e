//! Equity intraday bar adapter
//!
//! Pulls 15-minute bars for the trading day from Yahoo's chart API and
//! derives the two inputs the dip/breakout rule needs: the 1h price change
//! (last close against four bars back) and the volume ratio of the latest
//! bar against the session average. Yahoo pads its arrays with nulls for
//! halted intervals; those entries are dropped before any math.

use super::{DataSource, FetchError};
use crate::snapshot::{Horizon, MarketSnapshot, VenueKind};
use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::time::Duration;

/// Yahoo Finance chart API base URL
pub const YAHOO_API_URL: &str = "https://query1.finance.yahoo.com";

/// Minimum bars for a meaningful session-average volume
const MIN_BARS_FOR_RATIO: usize = 5;

/// Bars back for the 1h change at a 15m interval
const BARS_PER_HOUR: usize = 4;

/// Configuration for the equity bar source
#[derive(Debug, Clone)]
pub struct EquityConfig {
    /// Base URL for the chart endpoint
    pub base_url: String,
    /// Request timeout
    pub timeout: Duration,
    /// Bar interval
    pub interval: String,
    /// Lookback range
    pub range: String,
}

impl Default for EquityConfig {
    fn default() -> Self {
        Self {
            base_url: YAHOO_API_URL.to_string(),
            timeout: Duration::from_secs(10),
            interval: "15m".to_string(),
            range: "1d".to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: ChartBody,
}

#[derive(Debug, Deserialize)]
struct ChartBody {
    result: Option<Vec<ChartResult>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    quote: Vec<QuoteBlock>,
}

/// Parallel arrays with null holes for halted intervals
#[derive(Debug, Deserialize)]
struct QuoteBlock {
    close: Vec<Option<f64>>,
    volume: Vec<Option<u64>>,
}

/// One usable bar after null filtering
#[derive(Debug, Clone, Copy)]
struct Bar {
    close: Decimal,
    volume: Decimal,
}

/// Yahoo chart source for equity watchlists
pub struct EquityBarSource {
    config: EquityConfig,
    client: Client,
}

impl EquityBarSource {
    pub fn new() -> Self {
        Self::with_config(EquityConfig::default())
    }

    pub fn with_config(config: EquityConfig) -> Self {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .expect("Failed to create HTTP client");
        Self { config, client }
    }

    /// Zip the parallel arrays, dropping indices where either side is null
    fn collect_bars(quote: &QuoteBlock) -> Vec<Bar> {
        quote
            .close
            .iter()
            .zip(quote.volume.iter())
            .filter_map(|(close, volume)| {
                let close = Decimal::from_f64_retain((*close)?)?;
                let volume = Decimal::from((*volume)?);
                Some(Bar { close, volume })
            })
            .collect()
    }

    fn normalize(&self, symbol: &str, quote: &QuoteBlock) -> Result<MarketSnapshot, FetchError> {
        let bars = Self::collect_bars(quote);
        let last = bars.last().ok_or(FetchError::Empty)?;

        let mut snapshot = MarketSnapshot::new(
            format!("equity:{symbol}"),
            VenueKind::Equity,
            last.close,
        );
        snapshot.observed_at = Utc::now();
        snapshot.volume.insert(Horizon::M15, last.volume);

        // 1h change needs a bar from four intervals back
        if bars.len() > BARS_PER_HOUR {
            let hour_ago = bars[bars.len() - 1 - BARS_PER_HOUR].close;
            if hour_ago > Decimal::ZERO {
                let change = (last.close - hour_ago) / hour_ago * Decimal::from(100);
                snapshot.price_change_pct.insert(Horizon::H1, change);
            }
        }

        // Session-average ratio only once enough bars exist; a shorter
        // session leaves the ratio unknown and the rule abstains.
        if bars.len() >= MIN_BARS_FOR_RATIO {
            let earlier = &bars[..bars.len() - 1];
            let total: Decimal = earlier.iter().map(|b| b.volume).sum();
            let avg = total / Decimal::from(earlier.len() as u64);
            if avg > Decimal::ZERO {
                snapshot.volume_ratio = Some(last.volume / avg);
            }
        }

        Ok(snapshot)
    }
}

impl Default for EquityBarSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DataSource for EquityBarSource {
    fn venue(&self) -> VenueKind {
        VenueKind::Equity
    }

    async fn fetch(&self, instrument: &str) -> Result<MarketSnapshot, FetchError> {
        let url = format!("{}/v8/finance/chart/{}", self.config.base_url, instrument);

        tracing::debug!(symbol = instrument, "Fetching equity bars");

        let response = self
            .client
            .get(&url)
            .query(&[
                ("interval", self.config.interval.as_str()),
                ("range", self.config.range.as_str()),
            ])
            .send()
            .await
            .map_err(FetchError::from_reqwest)?;

        if !response.status().is_success() {
            return Err(FetchError::from_status(response.status()));
        }

        let body: ChartResponse = response.json().await.map_err(FetchError::from_reqwest)?;

        if let Some(error) = body.chart.error {
            return Err(FetchError::Provider {
                message: error
                    .description
                    .unwrap_or_else(|| "unspecified chart error".to_string()),
            });
        }

        let result = body
            .chart
            .result
            .and_then(|mut r| if r.is_empty() { None } else { Some(r.remove(0)) })
            .ok_or(FetchError::Empty)?;
        let quote = result.indicators.quote.first().ok_or(FetchError::Empty)?;

        self.normalize(instrument, quote)
    }
}
