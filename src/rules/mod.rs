//! Detection rules
//!
//! Each rule is an independent detector evaluating one [`MarketSnapshot`]
//! for one anomaly pattern. Rules are pure except for the smart-money
//! tracker, which owns a long-lived per-wallet baseline.

mod divergence;
mod equity;
mod smart_money;
mod snipe;

pub use divergence::{DivergenceConfig, VolumePriceDivergence};
pub use equity::{DipBreakout, DipBreakoutConfig};
pub use smart_money::{SmartMoneyTracker, SMART_MONEY_RULE_ID};
pub use snipe::{LiquiditySnipe, SnipeConfig};

use crate::snapshot::{MarketSnapshot, VenueKind};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Maximum partial score a single rule can report
pub const MAX_PARTIAL_SCORE: u8 = 100;

/// Output of one rule for one snapshot.
///
/// `partial_score` is only meaningful when `fired` is true. An abstaining
/// rule (insufficient data) reports `fired = false` with an explanation so
/// the outcome stays observable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleSignal {
    /// Rule identifier, e.g. "volume-price-divergence"
    pub rule_id: String,
    /// Asset the signal refers to
    pub asset_key: String,
    /// Observation time of the evaluated snapshot
    pub observed_at: DateTime<Utc>,
    /// Whether the trigger condition held
    pub fired: bool,
    /// Contribution to confidence, 0-100, capped
    pub partial_score: u8,
    /// Ordered human-readable signal descriptions, append-only
    pub explanations: Vec<String>,
    /// Numeric inputs that produced the score, for audit and tests
    pub raw_metrics: HashMap<String, Decimal>,
}

impl RuleSignal {
    /// Start a non-fired signal for a snapshot; callers append explanations
    /// and metrics, then fire it if the trigger held.
    pub fn pending(rule_id: &str, snapshot: &MarketSnapshot) -> Self {
        Self {
            rule_id: rule_id.to_string(),
            asset_key: snapshot.asset_key.clone(),
            observed_at: snapshot.observed_at,
            fired: false,
            partial_score: 0,
            explanations: Vec::new(),
            raw_metrics: HashMap::new(),
        }
    }

    /// An abstaining outcome: the rule could not evaluate its inputs.
    pub fn insufficient_data(rule_id: &str, snapshot: &MarketSnapshot) -> Self {
        let mut signal = Self::pending(rule_id, snapshot);
        signal.explanations.push("insufficient data".to_string());
        signal
    }

    /// Add points to the partial score, capped at [`MAX_PARTIAL_SCORE`],
    /// with an explanation of the contributing condition.
    pub fn add_score(&mut self, points: u8, explanation: impl Into<String>) {
        self.partial_score = self.partial_score.saturating_add(points).min(MAX_PARTIAL_SCORE);
        self.explanations.push(explanation.into());
    }

    /// Subtract penalty points (floored at zero) with an explanation.
    pub fn penalize(&mut self, points: u8, explanation: impl Into<String>) {
        self.partial_score = self.partial_score.saturating_sub(points);
        self.explanations.push(explanation.into());
    }

    /// Record a raw metric for audit
    pub fn record_metric(&mut self, name: &str, value: Decimal) {
        self.raw_metrics.insert(name.to_string(), value);
    }
}

/// A pluggable snapshot detector.
///
/// Evaluation is synchronous, non-blocking computation; all I/O happens in
/// the adapters before a rule ever sees the data.
pub trait Rule: Send + Sync {
    /// Stable rule identifier
    fn id(&self) -> &'static str;

    /// Whether this rule applies to snapshots from the given venue
    fn applies_to(&self, venue: VenueKind) -> bool;

    /// Evaluate one snapshot
    fn evaluate(&self, snapshot: &MarketSnapshot) -> RuleSignal;
}
