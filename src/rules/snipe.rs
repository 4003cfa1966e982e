//! Rule B: liquidity snipe
//!
//! Detects freshly created trading pools backed by meaningful capital, a
//! proxy for a serious launch rather than a disposable one. Scores tier up
//! with liquidity magnitude and pool youth, with a bonus when early volume
//! is already meaningful relative to pool size.

use super::{Rule, RuleSignal};
use crate::snapshot::{Horizon, MarketSnapshot, VenueKind};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;

/// Thresholds for the liquidity snipe rule
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SnipeConfig {
    /// Minimum pool liquidity to fire (default $50k)
    pub min_liquidity_usd: Decimal,
    /// Maximum pool age to fire (default 60 minutes)
    pub max_age_minutes: Decimal,
    /// Pools at or below this age earn the higher age tier (default 30 minutes)
    pub fresh_age_minutes: Decimal,
    /// Liquidity at or above this earns the higher liquidity tier (default $100k)
    pub high_liquidity_usd: Decimal,
    /// Early 1h volume above this fraction of liquidity earns a bonus (default 0.2)
    pub early_volume_fraction: Decimal,
}

impl Default for SnipeConfig {
    fn default() -> Self {
        Self {
            min_liquidity_usd: dec!(50000),
            max_age_minutes: dec!(60),
            fresh_age_minutes: dec!(30),
            high_liquidity_usd: dec!(100000),
            early_volume_fraction: dec!(0.2),
        }
    }
}

/// New-pool detector ("Rule B")
pub struct LiquiditySnipe {
    config: SnipeConfig,
}

impl LiquiditySnipe {
    pub fn new(config: SnipeConfig) -> Self {
        Self { config }
    }

    pub fn with_defaults() -> Self {
        Self::new(SnipeConfig::default())
    }
}

impl Rule for LiquiditySnipe {
    fn id(&self) -> &'static str {
        "liquidity-snipe"
    }

    fn applies_to(&self, venue: VenueKind) -> bool {
        venue == VenueKind::Dex
    }

    fn evaluate(&self, snapshot: &MarketSnapshot) -> RuleSignal {
        // A venue that does not report pool creation time leaves the age
        // unknown; assuming either "new" or "old" would fabricate a signal,
        // so the rule abstains.
        let (age_minutes, liquidity) = match (snapshot.pair_age_minutes, snapshot.liquidity_usd) {
            (Some(age), Some(liq)) => (age, liq),
            _ => return RuleSignal::insufficient_data(self.id(), snapshot),
        };

        let mut signal = RuleSignal::pending(self.id(), snapshot);
        signal.record_metric("pair_age_minutes", age_minutes);
        signal.record_metric("liquidity_usd", liquidity);

        if age_minutes > self.config.max_age_minutes || liquidity < self.config.min_liquidity_usd {
            return signal;
        }

        signal.fired = true;

        if liquidity >= self.config.high_liquidity_usd {
            signal.add_score(30, format!("high liquidity ${liquidity:.0}"));
        } else {
            signal.add_score(20, format!("liquidity ${liquidity:.0}"));
        }

        if age_minutes <= self.config.fresh_age_minutes {
            signal.add_score(25, format!("pool created {age_minutes:.0}min ago"));
        } else {
            signal.add_score(15, format!("new pool ({age_minutes:.0}min)"));
        }

        if let Some(volume_h1) = snapshot.volume_at(Horizon::H1) {
            signal.record_metric("volume_h1", volume_h1);
            if volume_h1 > liquidity * self.config.early_volume_fraction {
                signal.add_score(20, "early volume already meaningful".to_string());
            }
        }

        signal
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule() -> LiquiditySnipe {
        LiquiditySnipe::with_defaults()
    }

    fn pool_snapshot(age_minutes: Decimal, liquidity: Decimal) -> MarketSnapshot {
        let mut snap = MarketSnapshot::new("solana:NEW:pair123", VenueKind::Dex, dec!(0.002));
        snap.pair_age_minutes = Some(age_minutes);
        snap.liquidity_usd = Some(liquidity);
        snap
    }

    #[test]
    fn test_abstains_on_unknown_age() {
        let mut snap = MarketSnapshot::new("solana:NEW:pair123", VenueKind::Dex, dec!(0.002));
        snap.liquidity_usd = Some(dec!(80000));
        let signal = rule().evaluate(&snap);
        assert!(!signal.fired);
        assert_eq!(signal.explanations, vec!["insufficient data"]);
    }

    #[test]
    fn test_fresh_funded_pool_scores_65() {
        // age 20min (25) + liquidity $75k (20) + volume 20k > 0.2 * 75k (20)
        let mut snap = pool_snapshot(dec!(20), dec!(75000));
        snap.volume.insert(Horizon::H1, dec!(20000));
        let signal = rule().evaluate(&snap);
        assert!(signal.fired);
        assert_eq!(signal.partial_score, 65);
    }

    #[test]
    fn test_high_liquidity_tier() {
        let signal = rule().evaluate(&pool_snapshot(dec!(45), dec!(150000)));
        assert!(signal.fired);
        // 30 liquidity tier + 15 age tier, no volume data
        assert_eq!(signal.partial_score, 45);
    }

    #[test]
    fn test_old_pool_does_not_fire() {
        let signal = rule().evaluate(&pool_snapshot(dec!(90), dec!(150000)));
        assert!(!signal.fired);
    }

    #[test]
    fn test_thin_pool_does_not_fire() {
        let signal = rule().evaluate(&pool_snapshot(dec!(10), dec!(20000)));
        assert!(!signal.fired);
    }

    #[test]
    fn test_boundary_age_and_liquidity_fire() {
        let signal = rule().evaluate(&pool_snapshot(dec!(60), dec!(50000)));
        assert!(signal.fired);
        // 20 liquidity tier + 15 age tier
        assert_eq!(signal.partial_score, 35);
    }

    #[test]
    fn test_low_early_volume_earns_no_bonus() {
        let mut snap = pool_snapshot(dec!(20), dec!(75000));
        snap.volume.insert(Horizon::H1, dec!(5000));
        let signal = rule().evaluate(&snap);
        assert_eq!(signal.partial_score, 45);
    }

    #[test]
    fn test_applies_to_dex_only() {
        let rule = rule();
        assert!(rule.applies_to(VenueKind::Dex));
        assert!(!rule.applies_to(VenueKind::Cex));
        assert!(!rule.applies_to(VenueKind::Equity));
    }
}
