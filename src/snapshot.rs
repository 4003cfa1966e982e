//! Normalized market observation model
//!
//! Every adapter converts its provider payload into a [`MarketSnapshot`].
//! Absent horizon entries mean *unknown*, never zero: a venue that does not
//! report a 5-minute volume simply leaves [`Horizon::M5`] out of the map, and
//! rules must abstain rather than treat the gap as a failing or passing value.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Trading venue category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VenueKind {
    /// Centralized exchange (candle data)
    Cex,
    /// Decentralized exchange (pair state)
    Dex,
    /// Equities / ETF market feed
    Equity,
}

impl VenueKind {
    /// Stable lowercase label used in asset keys and log fields
    pub fn as_str(&self) -> &'static str {
        match self {
            VenueKind::Cex => "cex",
            VenueKind::Dex => "dex",
            VenueKind::Equity => "equity",
        }
    }
}

/// Time horizon for per-snapshot change/volume figures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Horizon {
    /// 5 minutes
    M5,
    /// 15 minutes
    M15,
    /// 1 hour
    H1,
    /// 24 hours
    H24,
}

impl Horizon {
    /// Number of one-hour periods contained in this horizon, if it spans
    /// at least an hour
    pub fn hourly_periods(&self) -> Option<u32> {
        match self {
            Horizon::H1 => Some(1),
            Horizon::H24 => Some(24),
            _ => None,
        }
    }
}

/// One polled observation of one instrument on one venue.
///
/// Created fresh each poll cycle, evaluated by the rules, then discarded.
/// Optional fields are venue-specific: `liquidity_usd`, `fdv_usd` and
/// `pair_age_minutes` only exist for DEX pairs, `volume_ratio` only for
/// equity bars, `realized_volatility_pct` only for CEX candles.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketSnapshot {
    /// Stable identity: venue label + instrument symbol (+ pair address for
    /// DEX instruments). Unique within a poll cycle.
    pub asset_key: String,
    /// Venue category
    pub venue_kind: VenueKind,
    /// When the observation was taken
    pub observed_at: DateTime<Utc>,
    /// Last trade or quote price (>= 0)
    pub price: Decimal,
    /// Signed percentage price change per horizon; absent = unknown
    pub price_change_pct: HashMap<Horizon, Decimal>,
    /// Traded volume in quote currency per horizon; absent = unknown
    pub volume: HashMap<Horizon, Decimal>,
    /// Pool reserve value in USD (DEX only)
    pub liquidity_usd: Option<Decimal>,
    /// Fully diluted valuation in USD (DEX only)
    pub fdv_usd: Option<Decimal>,
    /// Minutes since pool creation (DEX only); absent = unknown, treated as
    /// old by the callers that care, never as zero
    pub pair_age_minutes: Option<Decimal>,
    /// High-low range of the last closed candle as a percent of its open
    /// (CEX only)
    pub realized_volatility_pct: Option<Decimal>,
    /// Latest bar volume over trailing average bar volume (equities only)
    pub volume_ratio: Option<Decimal>,
}

impl MarketSnapshot {
    /// Create a snapshot with the mandatory fields; horizon maps start empty
    /// and optional metrics unset.
    pub fn new(asset_key: impl Into<String>, venue_kind: VenueKind, price: Decimal) -> Self {
        Self {
            asset_key: asset_key.into(),
            venue_kind,
            observed_at: Utc::now(),
            price,
            price_change_pct: HashMap::new(),
            volume: HashMap::new(),
            liquidity_usd: None,
            fdv_usd: None,
            pair_age_minutes: None,
            realized_volatility_pct: None,
            volume_ratio: None,
        }
    }

    /// Price change over a horizon, if the venue reported it
    pub fn price_change(&self, horizon: Horizon) -> Option<Decimal> {
        self.price_change_pct.get(&horizon).copied()
    }

    /// Traded volume over a horizon, if the venue reported it
    pub fn volume_at(&self, horizon: Horizon) -> Option<Decimal> {
        self.volume.get(&horizon).copied()
    }

    /// Average hourly volume derived from the 24h figure.
    ///
    /// Returns `None` when the 24h volume is unknown or zero: a zero
    /// denominator must surface as *undefined*, never as zero or infinity.
    pub fn hourly_avg_volume(&self) -> Option<Decimal> {
        let h24 = self.volume_at(Horizon::H24)?;
        if h24 <= Decimal::ZERO {
            return None;
        }
        let periods = Decimal::from(Horizon::H24.hourly_periods().unwrap_or(24));
        Some(h24 / periods)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn snapshot() -> MarketSnapshot {
        MarketSnapshot::new("cex:BTC/USDT", VenueKind::Cex, dec!(95000))
    }

    #[test]
    fn test_new_snapshot_has_no_horizons() {
        let snap = snapshot();
        assert!(snap.price_change(Horizon::H1).is_none());
        assert!(snap.volume_at(Horizon::H24).is_none());
        assert!(snap.liquidity_usd.is_none());
    }

    #[test]
    fn test_hourly_avg_volume() {
        let mut snap = snapshot();
        snap.volume.insert(Horizon::H24, dec!(2400));
        assert_eq!(snap.hourly_avg_volume(), Some(dec!(100)));
    }

    #[test]
    fn test_hourly_avg_volume_unknown() {
        let snap = snapshot();
        assert!(snap.hourly_avg_volume().is_none());
    }

    #[test]
    fn test_hourly_avg_volume_zero_is_undefined() {
        let mut snap = snapshot();
        snap.volume.insert(Horizon::H24, Decimal::ZERO);
        assert!(snap.hourly_avg_volume().is_none());
    }

    #[test]
    fn test_horizon_hourly_periods() {
        assert_eq!(Horizon::H24.hourly_periods(), Some(24));
        assert_eq!(Horizon::H1.hourly_periods(), Some(1));
        assert_eq!(Horizon::M5.hourly_periods(), None);
    }

    #[test]
    fn test_venue_kind_labels() {
        assert_eq!(VenueKind::Cex.as_str(), "cex");
        assert_eq!(VenueKind::Dex.as_str(), "dex");
        assert_eq!(VenueKind::Equity.as_str(), "equity");
    }
}
