//! Venue data sources
//!
//! One adapter per venue category. Each converts a provider's raw response
//! into normalized [`MarketSnapshot`]s (or wallet activity) and nothing
//! else; all scoring lives in the rules. Every underlying call carries a
//! bounded timeout, and failures surface as typed [`FetchError`]s that the
//! scheduler can act on per venue.

mod cex;
mod dex;
mod equity;
mod pools;
mod wallets;

pub use cex::{CexCandleSource, CexConfig};
pub use dex::{DexPairSource, DexConfig};
pub use equity::{EquityBarSource, EquityConfig};
pub use pools::{PoolDiscoverySource, PoolDiscoveryConfig};
pub use wallets::{WalletActivityFeed, WalletFeedConfig};

use crate::snapshot::{MarketSnapshot, VenueKind};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Adapter-boundary failure taxonomy.
///
/// `RateLimited` tells the scheduler to back the venue off; everything else
/// just skips the instrument for the cycle.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The provider did not answer within the bounded timeout
    #[error("request timed out")]
    Timeout,
    /// Non-success status or malformed payload
    #[error("provider error: {message}")]
    Provider { message: String },
    /// The provider answered with no usable data
    #[error("empty result set")]
    Empty,
    /// The provider asked us to slow down
    #[error("rate limited by provider")]
    RateLimited,
}

impl FetchError {
    /// Map a transport error, distinguishing timeouts
    pub fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            FetchError::Timeout
        } else {
            FetchError::Provider {
                message: err.to_string(),
            }
        }
    }

    /// Map a non-success HTTP status; 429 and 418 are rate limiting
    pub fn from_status(status: reqwest::StatusCode) -> Self {
        match status.as_u16() {
            429 | 418 => FetchError::RateLimited,
            code => FetchError::Provider {
                message: format!("unexpected status {code}"),
            },
        }
    }

    pub fn is_rate_limited(&self) -> bool {
        matches!(self, FetchError::RateLimited)
    }
}

/// A snapshot source polled per configured instrument
#[async_trait]
pub trait DataSource: Send + Sync {
    /// Venue category of the snapshots this source produces
    fn venue(&self) -> VenueKind;

    /// Fetch one instrument's current snapshot
    async fn fetch(&self, instrument: &str) -> Result<MarketSnapshot, FetchError>;
}

/// A source that discovers instruments on its own (the pool-creation feed)
#[async_trait]
pub trait DiscoverySource: Send + Sync {
    /// Fetch the current batch of discovered snapshots
    async fn discover(&self) -> Result<Vec<MarketSnapshot>, FetchError>;
}

/// Direction of a token transfer relative to the watched wallet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransferDirection {
    /// The wallet received the token
    Incoming,
    /// The wallet sent the token
    Outgoing,
}

/// One observed token transfer touching a watched wallet
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletActivity {
    /// The watched wallet address
    pub wallet: String,
    /// Chain the transfer happened on
    pub chain: String,
    /// Token symbol
    pub token_symbol: String,
    /// Token contract address
    pub token_address: String,
    /// Transfer direction relative to the wallet
    pub direction: TransferDirection,
}

/// External wallet-activity feed consumed by the smart-money rule.
///
/// An empty batch means "no new activity", not an error.
#[async_trait]
pub trait WalletFeed: Send + Sync {
    /// Poll recent activity across the watched wallets
    async fn poll(&self) -> Result<Vec<WalletActivity>, FetchError>;
}
