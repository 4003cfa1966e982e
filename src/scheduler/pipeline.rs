//! Snapshot evaluation pipeline
//!
//! One snapshot in, at most one published alert out. The pipeline runs
//! every applicable rule, combines the fired signals into a confidence
//! score, gates it against the publish floor, deduplicates, and hands the
//! survivor to the sink. A rule failure or a suppressed alert never stops
//! the cycle for the other instruments.

use crate::alert::{AlertDeduplicator, AlertSink, ConfidenceAggregator};
use crate::rules::{Rule, RuleSignal};
use crate::snapshot::{MarketSnapshot, VenueKind};
use crate::telemetry;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Shared per-engine evaluation pipeline
pub struct Pipeline {
    rules: Vec<Box<dyn Rule>>,
    aggregator: ConfidenceAggregator,
    dedup: Mutex<AlertDeduplicator>,
    sink: Arc<dyn AlertSink>,
    /// Alerts below this confidence are scored but never published
    min_confidence: u8,
}

impl Pipeline {
    pub fn new(
        rules: Vec<Box<dyn Rule>>,
        aggregator: ConfidenceAggregator,
        dedup: AlertDeduplicator,
        sink: Arc<dyn AlertSink>,
        min_confidence: u8,
    ) -> Self {
        Self {
            rules,
            aggregator,
            dedup: Mutex::new(dedup),
            sink,
            min_confidence,
        }
    }

    /// Evaluate one snapshot end to end.
    ///
    /// Returns true when an alert was published for it.
    pub async fn process(&self, snapshot: &MarketSnapshot) -> bool {
        telemetry::count_snapshot(snapshot.venue_kind);

        let signals: Vec<RuleSignal> = self
            .rules
            .iter()
            .filter(|rule| rule.applies_to(snapshot.venue_kind))
            .map(|rule| {
                let signal = rule.evaluate(snapshot);
                if signal.fired {
                    telemetry::count_rule_fired(&signal.rule_id);
                }
                signal
            })
            .collect();

        self.publish_signals(&snapshot.asset_key, snapshot.venue_kind, signals)
            .await
    }

    /// Combine pre-evaluated signals and publish if they clear the gates.
    ///
    /// The wallet loop calls this directly; its rule evaluates activity
    /// batches rather than snapshots.
    pub async fn publish_signals(
        &self,
        asset_key: &str,
        venue_kind: VenueKind,
        signals: Vec<RuleSignal>,
    ) -> bool {
        let Some(mut alert) = self.aggregator.combine(asset_key, venue_kind, signals) else {
            return false;
        };

        if alert.confidence < self.min_confidence {
            tracing::debug!(
                asset = %alert.asset_key,
                confidence = alert.confidence,
                "Alert below publish floor, dropping"
            );
            return false;
        }

        let emit = self.dedup.lock().await.should_emit(&mut alert);
        if !emit {
            telemetry::count_alert_suppressed(venue_kind);
            tracing::debug!(asset = %alert.asset_key, "Alert suppressed by dedup window");
            return false;
        }

        telemetry::count_alert_emitted(venue_kind, alert.tier);
        self.sink.publish(alert).await;
        true
    }
}
