//! Time-windowed alert deduplication
//!
//! A bounded cache keyed by a coarsened asset key. The first sighting of a
//! key emits; repeats inside the TTL window are suppressed while the entry's
//! `last_seen` advances. Entries expire a TTL after their first sighting, so
//! a persistent pattern re-alerts at most once per window.
//!
//! Eviction on overflow is deterministic least-recently-seen with a key
//! tiebreak, never an arbitrary subset, so cache behavior is reproducible
//! from the same inputs.

use super::Alert;
use crate::snapshot::VenueKind;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;

/// Deduplication window and capacity bound
#[derive(Debug, Clone, Copy)]
pub struct DedupConfig {
    /// Suppression window per occurrence
    pub ttl: Duration,
    /// Hard cap on tracked keys
    pub capacity: usize,
}

impl Default for DedupConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::seconds(3600),
            capacity: 1000,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct DedupEntry {
    first_seen: DateTime<Utc>,
    last_seen: DateTime<Utc>,
}

/// Bounded, time-windowed suppression cache
pub struct AlertDeduplicator {
    config: DedupConfig,
    entries: HashMap<String, DedupEntry>,
}

impl AlertDeduplicator {
    pub fn new(config: DedupConfig) -> Self {
        Self {
            config,
            entries: HashMap::new(),
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(DedupConfig::default())
    }

    /// Number of tracked keys
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Deterministic cache key for an alert.
    ///
    /// CEX and equity alerts coarsen to the observation hour, so the same
    /// instrument re-alerts each hour at most. DEX alerts key on the asset
    /// key alone; it already embeds the pair address.
    pub fn cache_key(alert: &Alert, now: DateTime<Utc>) -> String {
        match alert.venue_kind {
            VenueKind::Cex | VenueKind::Equity => {
                format!("{}:{}", alert.asset_key, now.format("%Y%m%d%H"))
            }
            VenueKind::Dex => alert.asset_key.clone(),
        }
    }

    /// Decide whether to emit, updating the window state.
    ///
    /// Returns true on first sighting (or after expiry); returns false and
    /// refreshes `last_seen_at` while suppressed. The alert's window
    /// boundaries are rewritten to match the cache entry either way.
    pub fn should_emit(&mut self, alert: &mut Alert) -> bool {
        self.should_emit_at(alert, Utc::now())
    }

    /// Clock-injected variant of [`Self::should_emit`] for deterministic tests
    pub fn should_emit_at(&mut self, alert: &mut Alert, now: DateTime<Utc>) -> bool {
        let key = Self::cache_key(alert, now);

        if let Some(entry) = self.entries.get_mut(&key) {
            if now - entry.first_seen < self.config.ttl {
                entry.last_seen = now;
                alert.first_seen_at = entry.first_seen;
                alert.last_seen_at = now;
                return false;
            }
            // Window elapsed: this sighting starts a fresh occurrence
        }

        self.entries.insert(
            key,
            DedupEntry {
                first_seen: now,
                last_seen: now,
            },
        );
        alert.first_seen_at = now;
        alert.last_seen_at = now;

        self.enforce_capacity();
        true
    }

    /// Evict least-recently-seen entries until within capacity. Ties break
    /// on the key so eviction order never depends on map iteration order.
    fn enforce_capacity(&mut self) {
        while self.entries.len() > self.config.capacity {
            let victim = self
                .entries
                .iter()
                .min_by_key(|(key, entry)| (entry.last_seen, key.clone()))
                .map(|(key, _)| key.clone());
            match victim {
                Some(key) => {
                    tracing::debug!(key = %key, "dedup cache full, evicting least-recently-seen");
                    self.entries.remove(&key);
                }
                None => break,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alert::Tier;
    use uuid::Uuid;

    fn alert(asset_key: &str, venue: VenueKind) -> Alert {
        let now = Utc::now();
        Alert {
            id: Uuid::new_v4(),
            asset_key: asset_key.to_string(),
            venue_kind: venue,
            confidence: 80,
            tier: Tier::Alert,
            signals: vec![],
            first_seen_at: now,
            last_seen_at: now,
        }
    }

    fn at(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000 + secs, 0).unwrap()
    }

    fn dedup(ttl_secs: i64, capacity: usize) -> AlertDeduplicator {
        AlertDeduplicator::new(DedupConfig {
            ttl: Duration::seconds(ttl_secs),
            capacity,
        })
    }

    #[test]
    fn test_first_emit_then_suppress() {
        let mut cache = dedup(3600, 100);
        let mut a = alert("solana:NEW:pair1", VenueKind::Dex);

        assert!(cache.should_emit_at(&mut a, at(0)));
        assert!(!cache.should_emit_at(&mut a, at(10)));
    }

    #[test]
    fn test_suppression_updates_last_seen() {
        let mut cache = dedup(3600, 100);
        let mut a = alert("solana:NEW:pair1", VenueKind::Dex);

        cache.should_emit_at(&mut a, at(0));
        cache.should_emit_at(&mut a, at(120));

        assert_eq!(a.first_seen_at, at(0));
        assert_eq!(a.last_seen_at, at(120));
    }

    #[test]
    fn test_reemits_after_ttl() {
        let mut cache = dedup(60, 100);
        let mut a = alert("solana:NEW:pair1", VenueKind::Dex);

        assert!(cache.should_emit_at(&mut a, at(0)));
        assert!(!cache.should_emit_at(&mut a, at(30)));
        assert!(cache.should_emit_at(&mut a, at(61)));
        assert_eq!(a.first_seen_at, at(61));
    }

    #[test]
    fn test_distinct_keys_do_not_interfere() {
        let mut cache = dedup(3600, 100);
        let mut a = alert("solana:AAA:pair1", VenueKind::Dex);
        let mut b = alert("solana:BBB:pair2", VenueKind::Dex);

        assert!(cache.should_emit_at(&mut a, at(0)));
        assert!(cache.should_emit_at(&mut b, at(1)));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_cex_key_coarsens_to_hour() {
        let a = alert("cex:BTC/USDT", VenueKind::Cex);
        let key = AlertDeduplicator::cache_key(&a, at(0));
        assert!(key.starts_with("cex:BTC/USDT:"));
        // Same hour, same key
        assert_eq!(key, AlertDeduplicator::cache_key(&a, at(30)));
        // Next hour, different key
        assert_ne!(key, AlertDeduplicator::cache_key(&a, at(3600)));
    }

    #[test]
    fn test_dex_key_is_asset_key() {
        let a = alert("solana:NEW:pair1", VenueKind::Dex);
        assert_eq!(AlertDeduplicator::cache_key(&a, at(0)), "solana:NEW:pair1");
    }

    #[test]
    fn test_capacity_evicts_least_recently_seen() {
        let mut cache = dedup(3600, 3);

        for (i, key) in ["a", "b", "c"].iter().enumerate() {
            let mut a = alert(&format!("solana:{key}:p{key}"), VenueKind::Dex);
            cache.should_emit_at(&mut a, at(i as i64));
        }

        // Touch "a" so "b" becomes least-recently-seen
        let mut a = alert("solana:a:pa", VenueKind::Dex);
        assert!(!cache.should_emit_at(&mut a, at(10)));

        // Overflow: exactly "b" must go
        let mut d = alert("solana:d:pd", VenueKind::Dex);
        assert!(cache.should_emit_at(&mut d, at(11)));
        assert_eq!(cache.len(), 3);

        // "b" re-emits (evicted), "a" and "c" stay suppressed
        let mut b = alert("solana:b:pb", VenueKind::Dex);
        assert!(cache.should_emit_at(&mut b, at(12)));
        let mut c = alert("solana:c:pc", VenueKind::Dex);
        assert!(!cache.should_emit_at(&mut c, at(13)));
    }

    #[test]
    fn test_eviction_tie_breaks_on_key() {
        let mut cache = dedup(3600, 2);

        // Two entries with identical last_seen
        for key in ["bbb", "aaa"] {
            let mut a = alert(&format!("solana:{key}:{key}"), VenueKind::Dex);
            cache.should_emit_at(&mut a, at(0));
        }

        let mut c = alert("solana:ccc:ccc", VenueKind::Dex);
        assert!(cache.should_emit_at(&mut c, at(1)));

        // Lexicographically smaller key evicted on the tie
        let mut aaa = alert("solana:aaa:aaa", VenueKind::Dex);
        assert!(cache.should_emit_at(&mut aaa, at(2)));
        let mut bbb = alert("solana:bbb:bbb", VenueKind::Dex);
        assert!(!cache.should_emit_at(&mut bbb, at(3)));
    }
}
