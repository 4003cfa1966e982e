//! Rule A: volume/price divergence
//!
//! Detects "iceberg" accumulation: a volume spike without a matching price
//! move, the signature of large orders fractionated to avoid moving the
//! market. High 1h volume against the 24h hourly average while the 1h price
//! change stays inside a stability band.

use super::{Rule, RuleSignal};
use crate::snapshot::{Horizon, MarketSnapshot, VenueKind};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;

/// Thresholds for the divergence rule
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DivergenceConfig {
    /// Volume must exceed this multiple of the hourly average (default 3.0x)
    pub volume_threshold: Decimal,
    /// Absolute 1h price change must stay within this percentage (default 5%)
    pub price_stability_pct: Decimal,
    /// Ratio at which the extreme-spike bonus applies (default 5.0x)
    pub extreme_volume_threshold: Decimal,
    /// Known liquidity at or above this gate earns a bonus (default $10k)
    pub min_liquidity_gate_usd: Decimal,
    /// Realized volatility at or below this earns the calm bonus (default 2%)
    pub calm_volatility_pct: Decimal,
}

impl Default for DivergenceConfig {
    fn default() -> Self {
        Self {
            volume_threshold: dec!(3.0),
            price_stability_pct: dec!(5),
            extreme_volume_threshold: dec!(5.0),
            min_liquidity_gate_usd: dec!(10000),
            calm_volatility_pct: dec!(2),
        }
    }
}

/// Volume/price divergence detector ("Rule A")
pub struct VolumePriceDivergence {
    config: DivergenceConfig,
}

impl VolumePriceDivergence {
    pub fn new(config: DivergenceConfig) -> Self {
        Self { config }
    }

    pub fn with_defaults() -> Self {
        Self::new(DivergenceConfig::default())
    }
}

impl Rule for VolumePriceDivergence {
    fn id(&self) -> &'static str {
        "volume-price-divergence"
    }

    fn applies_to(&self, venue: VenueKind) -> bool {
        matches!(venue, VenueKind::Cex | VenueKind::Dex)
    }

    fn evaluate(&self, snapshot: &MarketSnapshot) -> RuleSignal {
        // All three inputs must be known; a zero or missing average volume
        // means the ratio is undefined and the rule abstains.
        let (volume_h1, avg_volume, price_change) = match (
            snapshot.volume_at(Horizon::H1),
            snapshot.hourly_avg_volume(),
            snapshot.price_change(Horizon::H1),
        ) {
            (Some(v), Some(a), Some(p)) => (v, a, p),
            _ => return RuleSignal::insufficient_data(self.id(), snapshot),
        };

        let mut signal = RuleSignal::pending(self.id(), snapshot);

        let volume_ratio = volume_h1 / avg_volume;
        signal.record_metric("volume_h1", volume_h1);
        signal.record_metric("avg_volume_h1", avg_volume);
        signal.record_metric("volume_ratio", volume_ratio);
        signal.record_metric("price_change_h1", price_change);

        let volume_spiked = volume_ratio >= self.config.volume_threshold;
        let price_stable = price_change.abs() <= self.config.price_stability_pct;

        if !(volume_spiked && price_stable) {
            return signal;
        }

        signal.fired = true;
        signal.add_score(25, format!("volume {volume_ratio:.1}x above average"));
        signal.add_score(25, format!("price stable ({price_change:.1}%)"));

        if volume_ratio >= self.config.extreme_volume_threshold {
            signal.add_score(15, format!("extreme volume spike ({volume_ratio:.1}x)"));
        }

        if let Some(liquidity) = snapshot.liquidity_usd {
            signal.record_metric("liquidity_usd", liquidity);
            if liquidity >= self.config.min_liquidity_gate_usd {
                signal.add_score(10, format!("liquidity ${liquidity:.0}"));
            }
        }

        if let Some(volatility) = snapshot.realized_volatility_pct {
            signal.record_metric("realized_volatility_pct", volatility);
            if volatility <= self.config.calm_volatility_pct {
                signal.add_score(10, format!("low volatility ({volatility:.2}%)"));
            }
        }

        signal
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule() -> VolumePriceDivergence {
        VolumePriceDivergence::with_defaults()
    }

    fn snapshot_with(volume_h1: Decimal, volume_h24: Decimal, change_h1: Decimal) -> MarketSnapshot {
        let mut snap = MarketSnapshot::new("cex:BTC/USDT", VenueKind::Cex, dec!(95000));
        snap.volume.insert(Horizon::H1, volume_h1);
        snap.volume.insert(Horizon::H24, volume_h24);
        snap.price_change_pct.insert(Horizon::H1, change_h1);
        snap
    }

    #[test]
    fn test_abstains_without_volume_data() {
        let snap = MarketSnapshot::new("cex:BTC/USDT", VenueKind::Cex, dec!(95000));
        let signal = rule().evaluate(&snap);
        assert!(!signal.fired);
        assert_eq!(signal.explanations, vec!["insufficient data"]);
        assert!(signal.raw_metrics.is_empty());
    }

    #[test]
    fn test_abstains_on_zero_average_volume() {
        // 24h volume of zero makes the hourly average undefined
        let snap = snapshot_with(dec!(500), Decimal::ZERO, dec!(1));
        let signal = rule().evaluate(&snap);
        assert!(!signal.fired);
        assert!(signal.raw_metrics.get("volume_ratio").is_none());
    }

    #[test]
    fn test_fires_on_divergence() {
        // ratio = 400 / (2400/24) = 4.0x, change 1% within 5% band
        let snap = snapshot_with(dec!(400), dec!(2400), dec!(1));
        let signal = rule().evaluate(&snap);
        assert!(signal.fired);
        assert!(signal.partial_score >= 50);
        assert_eq!(signal.raw_metrics.get("volume_ratio"), Some(&dec!(4.0)));
        assert!(signal.explanations.iter().any(|e| e.contains("volume")));
        assert!(signal.explanations.iter().any(|e| e.contains("price stable")));
    }

    #[test]
    fn test_no_fire_when_price_moved() {
        // 4x volume but 8% move: accumulation already became a pump
        let snap = snapshot_with(dec!(400), dec!(2400), dec!(8));
        let signal = rule().evaluate(&snap);
        assert!(!signal.fired);
        // Metrics still recorded for audit
        assert_eq!(signal.raw_metrics.get("volume_ratio"), Some(&dec!(4.0)));
    }

    #[test]
    fn test_no_fire_below_volume_threshold() {
        let snap = snapshot_with(dec!(200), dec!(2400), dec!(1));
        let signal = rule().evaluate(&snap);
        assert!(!signal.fired);
    }

    #[test]
    fn test_extreme_spike_bonus() {
        // ratio 6x earns base 50 plus the 15 point extreme bonus
        let snap = snapshot_with(dec!(600), dec!(2400), dec!(1));
        let signal = rule().evaluate(&snap);
        assert!(signal.fired);
        assert_eq!(signal.partial_score, 65);
    }

    #[test]
    fn test_liquidity_and_volatility_bonuses() {
        let mut snap = snapshot_with(dec!(400), dec!(2400), dec!(1));
        snap.liquidity_usd = Some(dec!(75000));
        snap.realized_volatility_pct = Some(dec!(1.2));
        let signal = rule().evaluate(&snap);
        assert!(signal.fired);
        // 25 + 25 + 10 liquidity + 10 calm volatility
        assert_eq!(signal.partial_score, 70);
    }

    #[test]
    fn test_unknown_liquidity_earns_no_bonus() {
        let snap = snapshot_with(dec!(400), dec!(2400), dec!(1));
        let signal = rule().evaluate(&snap);
        assert_eq!(signal.partial_score, 50);
    }

    #[test]
    fn test_negative_price_change_within_band_fires() {
        let snap = snapshot_with(dec!(400), dec!(2400), dec!(-4));
        let signal = rule().evaluate(&snap);
        assert!(signal.fired);
    }

    #[test]
    fn test_applies_to_cex_and_dex_only() {
        let rule = rule();
        assert!(rule.applies_to(VenueKind::Cex));
        assert!(rule.applies_to(VenueKind::Dex));
        assert!(!rule.applies_to(VenueKind::Equity));
    }
}
