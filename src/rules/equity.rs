//! Equity dip/breakout rule
//!
//! Applies to equity/ETF snapshots only. A dip is a decline over the last
//! hour without panic volume; a breakout is a rally that needs volume
//! confirmation before it counts for much.

use super::{Rule, RuleSignal};
use crate::snapshot::{Horizon, MarketSnapshot, VenueKind};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;

/// Thresholds for the dip/breakout rule
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DipBreakoutConfig {
    /// Hourly decline at or below this triggers a dip (default -2%)
    pub dip_threshold_pct: Decimal,
    /// Decline at or below this earns the deep-discount bonus (default -3%)
    pub deep_dip_pct: Decimal,
    /// Hourly rally at or above this triggers a breakout (default +3%)
    pub breakout_threshold_pct: Decimal,
    /// Volume ratio below this marks a calm decline (default 1.5)
    pub calm_volume_ratio: Decimal,
    /// Volume ratio required to confirm a breakout (default 2.0)
    pub confirm_volume_ratio: Decimal,
}

impl Default for DipBreakoutConfig {
    fn default() -> Self {
        Self {
            dip_threshold_pct: dec!(-2),
            deep_dip_pct: dec!(-3),
            breakout_threshold_pct: dec!(3),
            calm_volume_ratio: dec!(1.5),
            confirm_volume_ratio: dec!(2.0),
        }
    }
}

/// Equity dip/breakout detector
pub struct DipBreakout {
    config: DipBreakoutConfig,
}

impl DipBreakout {
    pub fn new(config: DipBreakoutConfig) -> Self {
        Self { config }
    }

    pub fn with_defaults() -> Self {
        Self::new(DipBreakoutConfig::default())
    }
}

impl Rule for DipBreakout {
    fn id(&self) -> &'static str {
        "equity-dip-breakout"
    }

    fn applies_to(&self, venue: VenueKind) -> bool {
        venue == VenueKind::Equity
    }

    fn evaluate(&self, snapshot: &MarketSnapshot) -> RuleSignal {
        let (change_1h, volume_ratio) =
            match (snapshot.price_change(Horizon::H1), snapshot.volume_ratio) {
                (Some(c), Some(v)) => (c, v),
                _ => return RuleSignal::insufficient_data(self.id(), snapshot),
            };

        let mut signal = RuleSignal::pending(self.id(), snapshot);
        signal.record_metric("change_1h", change_1h);
        signal.record_metric("volume_ratio", volume_ratio);

        if change_1h <= self.config.dip_threshold_pct {
            signal.fired = true;
            signal.add_score(60, format!("dip: {change_1h:.2}% over the last hour"));

            if volume_ratio < self.config.calm_volume_ratio {
                signal.add_score(20, "calm decline, not panic selling".to_string());
            }
            if change_1h <= self.config.deep_dip_pct {
                signal.add_score(10, "significant discount".to_string());
            }
        } else if change_1h >= self.config.breakout_threshold_pct {
            signal.fired = true;
            signal.add_score(50, format!("breakout: {change_1h:.2}% over the last hour"));

            if volume_ratio >= self.config.confirm_volume_ratio {
                signal.add_score(30, format!("volume {volume_ratio:.1}x confirms the move"));
            } else {
                signal.penalize(
                    20,
                    format!("unconfirmed breakout, low volume ({volume_ratio:.1}x)"),
                );
            }
        }

        signal
    }
}
