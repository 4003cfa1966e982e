//! Per-asset confidence aggregation
//!
//! Combines the rule signals of one asset from one cycle into a single
//! alert. A single strongly-fired rule can reach MAX_ALERT on its own;
//! additional independent rules add a small convergence bonus instead of
//! summing naively, so many weak signals cannot fabricate a 100.

use super::{Alert, Tier};
use crate::rules::RuleSignal;
use crate::snapshot::VenueKind;
use chrono::Utc;
use uuid::Uuid;

/// Confidence cutoffs for the severity tiers
#[derive(Debug, Clone, Copy)]
pub struct TierCutoffs {
    /// Confidence at or above this is MONITOR (default 50)
    pub monitor: u8,
    /// Confidence at or above this is ALERT (default 75)
    pub alert: u8,
    /// Confidence at or above this is MAX_ALERT (default 90)
    pub max_alert: u8,
}

impl Default for TierCutoffs {
    fn default() -> Self {
        Self {
            monitor: 50,
            alert: 75,
            max_alert: 90,
        }
    }
}

/// Bonus per additional fired rule beyond the strongest one
const CONVERGENCE_BONUS: u8 = 5;

/// Combines rule signals into alerts
pub struct ConfidenceAggregator {
    cutoffs: TierCutoffs,
}

impl ConfidenceAggregator {
    pub fn new(cutoffs: TierCutoffs) -> Self {
        Self { cutoffs }
    }

    pub fn with_defaults() -> Self {
        Self::new(TierCutoffs::default())
    }

    /// Combine one asset's signals for one completed cycle.
    ///
    /// Returns `None` when no rule fired: no alert exists for this cycle.
    /// Signals that abstained or failed to fire are dropped here; their
    /// outcome was already recorded in their own explanations.
    pub fn combine(
        &self,
        asset_key: &str,
        venue_kind: VenueKind,
        signals: Vec<RuleSignal>,
    ) -> Option<Alert> {
        let fired: Vec<RuleSignal> = signals.into_iter().filter(|s| s.fired).collect();
        let strongest = fired.iter().map(|s| s.partial_score).max()?;

        let others = (fired.len() - 1) as u8;
        let confidence = strongest
            .saturating_add(others.saturating_mul(CONVERGENCE_BONUS))
            .min(100);

        let now = Utc::now();
        Some(Alert {
            id: Uuid::new_v4(),
            asset_key: asset_key.to_string(),
            venue_kind,
            confidence,
            tier: self.tier_for(confidence),
            signals: fired,
            first_seen_at: now,
            last_seen_at: now,
        })
    }

    /// Severity bucket for a confidence value
    pub fn tier_for(&self, confidence: u8) -> Tier {
        if confidence >= self.cutoffs.max_alert {
            Tier::MaxAlert
        } else if confidence >= self.cutoffs.alert {
            Tier::Alert
        } else if confidence >= self.cutoffs.monitor {
            Tier::Monitor
        } else {
            Tier::Ignore
        }
    }
}
