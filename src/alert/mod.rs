//! Alert types and the publishing boundary
//!
//! The engine's only output is [`Alert`] values pushed through an
//! [`AlertSink`]. Delivery retries, formatting and persistence belong to the
//! collaborators behind the sink, not to this crate.

mod aggregator;
mod dedup;

pub use aggregator::{ConfidenceAggregator, TierCutoffs};
pub use dedup::{AlertDeduplicator, DedupConfig};

use crate::rules::RuleSignal;
use crate::snapshot::VenueKind;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use uuid::Uuid;

/// Severity bucket derived from confidence
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    /// Below the monitor cutoff; weak signals
    Ignore,
    /// Worth watching
    Monitor,
    /// Opportunity detected
    Alert,
    /// Multiple strong signals converged
    MaxAlert,
}

impl Tier {
    /// Stable label for logs and metrics
    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Ignore => "ignore",
            Tier::Monitor => "monitor",
            Tier::Alert => "alert",
            Tier::MaxAlert => "max_alert",
        }
    }
}

/// An aggregated, deduplicated detection for one asset
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    /// Unique alert identifier
    pub id: Uuid,
    /// Asset the alert refers to
    pub asset_key: String,
    /// Venue category of the asset
    pub venue_kind: VenueKind,
    /// Aggregated confidence, clamped to [0, 100]
    pub confidence: u8,
    /// Severity bucket for this confidence
    pub tier: Tier,
    /// Contributing signals; only those with `fired = true`
    pub signals: Vec<RuleSignal>,
    /// Start of the dedup window for this occurrence
    pub first_seen_at: DateTime<Utc>,
    /// Most recent sighting within the dedup window
    pub last_seen_at: DateTime<Utc>,
}

/// Boundary interface for alert consumers.
///
/// Publishing is fire-and-forget from the engine's perspective.
#[async_trait]
pub trait AlertSink: Send + Sync {
    /// Publish a finalized alert
    async fn publish(&self, alert: Alert);
}

/// Sink that logs alerts through tracing; the default for `run` when no
/// external collaborator is attached.
pub struct LogSink;

#[async_trait]
impl AlertSink for LogSink {
    async fn publish(&self, alert: Alert) {
        tracing::info!(
            asset = %alert.asset_key,
            venue = alert.venue_kind.as_str(),
            confidence = alert.confidence,
            tier = ?alert.tier,
            rules = alert.signals.len(),
            "alert"
        );
        for signal in &alert.signals {
            for explanation in &signal.explanations {
                tracing::info!(asset = %alert.asset_key, rule = %signal.rule_id, "  {explanation}");
            }
        }
    }
}

/// Sink that forwards alerts into a channel; used by the one-shot `scan`
/// command and by tests.
pub struct ChannelSink {
    tx: mpsc::Sender<Alert>,
}

impl ChannelSink {
    /// Create a sink and the receiving half for the collaborator
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<Alert>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self { tx }, rx)
    }
}

#[async_trait]
impl AlertSink for ChannelSink {
    async fn publish(&self, alert: Alert) {
        if self.tx.send(alert).await.is_err() {
            tracing::debug!("alert receiver dropped");
        }
    }
}
