//! Rule C: smart-money tracker
//!
//! Watches a list of wallets with a history of early entries. When a watched
//! wallet acquires a token it has never held, that is worth an alert on its
//! own. The tracker owns the only long-lived rule state in the engine: the
//! per-wallet set of previously observed holdings.
//!
//! The very first observation of a wallet only populates its baseline and
//! never fires, otherwise startup would alert on every existing holding.

use super::RuleSignal;
use crate::source::{TransferDirection, WalletActivity};
use chrono::Utc;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

/// Rule identifier for smart-money signals
pub const SMART_MONEY_RULE_ID: &str = "smart-money";

/// Stateful wallet-baseline tracker ("Rule C").
///
/// Safe for concurrent use: the held-set lives behind a mutex because the
/// wallet loop may overlap with a shutdown drain.
pub struct SmartMoneyTracker {
    holdings: Mutex<HashMap<String, HashSet<String>>>,
}

impl SmartMoneyTracker {
    pub fn new() -> Self {
        Self {
            holdings: Mutex::new(HashMap::new()),
        }
    }

    /// Number of wallets with a completed baseline
    pub fn tracked_wallets(&self) -> usize {
        self.holdings.lock().expect("holdings lock poisoned").len()
    }

    /// Feed one poll of wallet activity; returns a fired signal for every
    /// newly acquired instrument of an already-baselined wallet.
    pub fn observe(&self, activities: &[WalletActivity]) -> Vec<RuleSignal> {
        let mut holdings = self.holdings.lock().expect("holdings lock poisoned");
        let mut signals = Vec::new();

        // Wallets seen for the first time in this batch baseline silently.
        let mut baselining: HashSet<String> = HashSet::new();

        for activity in activities {
            if activity.direction != TransferDirection::Incoming {
                continue;
            }

            let known = holdings.contains_key(&activity.wallet);
            if !known {
                baselining.insert(activity.wallet.clone());
            }

            let held = holdings.entry(activity.wallet.clone()).or_default();
            let newly_acquired = held.insert(activity.token_address.clone());

            if newly_acquired && known && !baselining.contains(&activity.wallet) {
                signals.push(Self::acquisition_signal(activity));
            }
        }

        signals
    }

    fn acquisition_signal(activity: &WalletActivity) -> RuleSignal {
        RuleSignal {
            rule_id: SMART_MONEY_RULE_ID.to_string(),
            asset_key: format!(
                "{}:{}:{}",
                activity.chain, activity.token_symbol, activity.token_address
            ),
            observed_at: Utc::now(),
            fired: true,
            partial_score: 100,
            explanations: vec![format!(
                "wallet {} acquired new token {}",
                activity.wallet, activity.token_symbol
            )],
            raw_metrics: HashMap::new(),
        }
    }
}

impl Default for SmartMoneyTracker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn incoming(wallet: &str, symbol: &str, address: &str) -> WalletActivity {
        WalletActivity {
            wallet: wallet.to_string(),
            chain: "ethereum".to_string(),
            token_symbol: symbol.to_string(),
            token_address: address.to_string(),
            direction: TransferDirection::Incoming,
        }
    }

    fn outgoing(wallet: &str, symbol: &str, address: &str) -> WalletActivity {
        WalletActivity {
            direction: TransferDirection::Outgoing,
            ..incoming(wallet, symbol, address)
        }
    }

    #[test]
    fn test_first_observation_baselines_without_firing() {
        let tracker = SmartMoneyTracker::new();
        let signals = tracker.observe(&[
            incoming("0xwhale", "PEPE", "0xaaa"),
            incoming("0xwhale", "WIF", "0xbbb"),
        ]);
        assert!(signals.is_empty());
        assert_eq!(tracker.tracked_wallets(), 1);
    }

    #[test]
    fn test_second_poll_new_token_fires_once() {
        let tracker = SmartMoneyTracker::new();
        tracker.observe(&[incoming("0xwhale", "PEPE", "0xaaa")]);

        let signals = tracker.observe(&[incoming("0xwhale", "NEW", "0xccc")]);
        assert_eq!(signals.len(), 1);
        assert_eq!(signals[0].rule_id, SMART_MONEY_RULE_ID);
        assert!(signals[0].fired);
        assert_eq!(signals[0].partial_score, 100);
        assert_eq!(signals[0].asset_key, "ethereum:NEW:0xccc");

        // Repeat sighting of the same token stays silent
        let repeat = tracker.observe(&[incoming("0xwhale", "NEW", "0xccc")]);
        assert!(repeat.is_empty());
    }

    #[test]
    fn test_known_token_never_fires() {
        let tracker = SmartMoneyTracker::new();
        tracker.observe(&[incoming("0xwhale", "PEPE", "0xaaa")]);
        let signals = tracker.observe(&[incoming("0xwhale", "PEPE", "0xaaa")]);
        assert!(signals.is_empty());
    }

    #[test]
    fn test_outgoing_transfers_ignored() {
        let tracker = SmartMoneyTracker::new();
        tracker.observe(&[incoming("0xwhale", "PEPE", "0xaaa")]);
        let signals = tracker.observe(&[outgoing("0xwhale", "NEW", "0xccc")]);
        assert!(signals.is_empty());
    }

    #[test]
    fn test_wallets_baseline_independently() {
        let tracker = SmartMoneyTracker::new();
        tracker.observe(&[incoming("0xwhale", "PEPE", "0xaaa")]);

        // A new wallet in a later batch baselines while the old one can fire
        let signals = tracker.observe(&[
            incoming("0xother", "DOGE", "0xddd"),
            incoming("0xwhale", "NEW", "0xccc"),
        ]);
        assert_eq!(signals.len(), 1);
        assert_eq!(signals[0].asset_key, "ethereum:NEW:0xccc");
        assert_eq!(tracker.tracked_wallets(), 2);
    }

    #[test]
    fn test_multiple_new_tokens_in_one_batch_after_baseline() {
        let tracker = SmartMoneyTracker::new();
        tracker.observe(&[incoming("0xwhale", "PEPE", "0xaaa")]);
        let signals = tracker.observe(&[
            incoming("0xwhale", "ONE", "0x111"),
            incoming("0xwhale", "TWO", "0x222"),
        ]);
        assert_eq!(signals.len(), 2);
    }
}
