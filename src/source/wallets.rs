//! Watched-wallet transfer feed
//!
//! Polls Etherscan's token-transfer endpoint for each watched wallet and
//! emits normalized [`WalletActivity`] records. The feed is quiet by
//! nature: most polls return transfers already seen, and the smart-money
//! rule downstream decides which ones are new positions. Without an API
//! key the feed reports itself disabled and every poll is an empty batch.

use super::{FetchError, TransferDirection, WalletActivity, WalletFeed};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

/// Etherscan API base URL
pub const ETHERSCAN_API_URL: &str = "https://api.etherscan.io/api";

/// Configuration for the wallet feed
#[derive(Debug, Clone)]
pub struct WalletFeedConfig {
    /// Base URL for the Etherscan API
    pub base_url: String,
    /// Request timeout
    pub timeout: Duration,
    /// API key; `None` disables the feed
    pub api_key: Option<String>,
    /// Wallet addresses to watch
    pub wallets: Vec<String>,
    /// Transfers fetched per wallet per poll
    pub page_size: usize,
}

impl Default for WalletFeedConfig {
    fn default() -> Self {
        Self {
            base_url: ETHERSCAN_API_URL.to_string(),
            timeout: Duration::from_secs(10),
            api_key: None,
            wallets: Vec::new(),
            page_size: 10,
        }
    }
}

/// Envelope Etherscan wraps every answer in. On errors `result` degrades
/// to a plain string, so it stays untyped until the status is checked.
#[derive(Debug, Deserialize)]
struct EtherscanResponse {
    status: String,
    message: Option<String>,
    result: serde_json::Value,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TokenTransfer {
    from: String,
    to: String,
    token_symbol: String,
    contract_address: String,
}

/// Etherscan-backed wallet activity feed
pub struct WalletActivityFeed {
    config: WalletFeedConfig,
    client: Client,
}

impl WalletActivityFeed {
    pub fn new(config: WalletFeedConfig) -> Self {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .expect("Failed to create HTTP client");
        Self { config, client }
    }

    /// Whether the feed has a key and at least one wallet to watch
    pub fn is_enabled(&self) -> bool {
        self.config.api_key.is_some() && !self.config.wallets.is_empty()
    }

    fn normalize(wallet: &str, transfers: Vec<TokenTransfer>) -> Vec<WalletActivity> {
        let wallet_lower = wallet.to_lowercase();
        transfers
            .into_iter()
            .map(|tx| {
                let direction = if tx.to.to_lowercase() == wallet_lower {
                    TransferDirection::Incoming
                } else {
                    TransferDirection::Outgoing
                };
                WalletActivity {
                    wallet: wallet.to_string(),
                    chain: "ethereum".to_string(),
                    token_symbol: tx.token_symbol,
                    token_address: tx.contract_address,
                    direction,
                }
            })
            .collect()
    }

    async fn poll_wallet(&self, wallet: &str, api_key: &str) -> Result<Vec<WalletActivity>, FetchError> {
        let response = self
            .client
            .get(&self.config.base_url)
            .query(&[
                ("module", "account"),
                ("action", "tokentx"),
                ("address", wallet),
                ("page", "1"),
                ("offset", &self.config.page_size.to_string()),
                ("sort", "desc"),
                ("apikey", api_key),
            ])
            .send()
            .await
            .map_err(FetchError::from_reqwest)?;

        if !response.status().is_success() {
            return Err(FetchError::from_status(response.status()));
        }

        let body: EtherscanResponse = response.json().await.map_err(FetchError::from_reqwest)?;

        // status "0" covers both real errors and "no transactions found";
        // the latter is a normal quiet wallet, not a failure.
        if body.status != "1" {
            let message = body.message.unwrap_or_default();
            if message.eq_ignore_ascii_case("No transactions found") {
                return Ok(Vec::new());
            }
            if message.to_lowercase().contains("rate limit") {
                return Err(FetchError::RateLimited);
            }
            return Err(FetchError::Provider { message });
        }

        let transfers: Vec<TokenTransfer> =
            serde_json::from_value(body.result).map_err(|e| FetchError::Provider {
                message: format!("bad transfer list: {e}"),
            })?;

        Ok(Self::normalize(wallet, transfers))
    }
}

#[async_trait]
impl WalletFeed for WalletActivityFeed {
    async fn poll(&self) -> Result<Vec<WalletActivity>, FetchError> {
        let Some(api_key) = self.config.api_key.clone() else {
            return Ok(Vec::new());
        };

        let mut all = Vec::new();
        for wallet in &self.config.wallets {
            match self.poll_wallet(wallet, &api_key).await {
                Ok(mut activity) => all.append(&mut activity),
                Err(err) if err.is_rate_limited() => return Err(err),
                Err(err) => {
                    tracing::warn!(wallet = %wallet, error = %err, "Wallet poll failed, skipping");
                }
            }
        }
        Ok(all)
    }
}
