//! Prometheus metrics

use crate::alert::Tier;
use crate::snapshot::VenueKind;
use metrics::{counter, describe_counter, describe_histogram, histogram};
use std::time::Duration;

/// Register metric descriptions with the installed recorder
pub fn describe_metrics() {
    describe_counter!(
        "icewatch_snapshots_total",
        "Snapshots normalized and evaluated, by venue"
    );
    describe_counter!(
        "icewatch_rule_fired_total",
        "Rule evaluations that fired, by rule"
    );
    describe_counter!(
        "icewatch_alerts_emitted_total",
        "Alerts published to the sink, by venue and tier"
    );
    describe_counter!(
        "icewatch_alerts_suppressed_total",
        "Alerts dropped by the dedup window, by venue"
    );
    describe_counter!(
        "icewatch_fetch_errors_total",
        "Failed instrument fetches, by venue"
    );
    describe_histogram!(
        "icewatch_cycle_duration_ms",
        "Wall time of one full venue poll cycle"
    );
}

pub fn count_snapshot(venue: VenueKind) {
    counter!("icewatch_snapshots_total", "venue" => venue.as_str()).increment(1);
}

pub fn count_rule_fired(rule_id: &str) {
    counter!("icewatch_rule_fired_total", "rule" => rule_id.to_string()).increment(1);
}

pub fn count_alert_emitted(venue: VenueKind, tier: Tier) {
    counter!(
        "icewatch_alerts_emitted_total",
        "venue" => venue.as_str(),
        "tier" => tier.as_str()
    )
    .increment(1);
}

pub fn count_alert_suppressed(venue: VenueKind) {
    counter!("icewatch_alerts_suppressed_total", "venue" => venue.as_str()).increment(1);
}

pub fn count_fetch_error(venue: VenueKind) {
    counter!("icewatch_fetch_errors_total", "venue" => venue.as_str()).increment(1);
}

/// Record the wall time of one venue poll cycle
pub fn record_cycle_duration(venue: VenueKind, duration: Duration) {
    histogram!("icewatch_cycle_duration_ms", "venue" => venue.as_str())
        .record(duration.as_millis() as f64);
}
