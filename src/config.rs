//! Configuration types for icewatch

use crate::rules::{DipBreakoutConfig, DivergenceConfig, SnipeConfig};
use serde::Deserialize;
use thiserror::Error;

/// Root configuration structure.
///
/// Every section has defaults, so an empty file is a valid configuration
/// that watches nothing but starts cleanly.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub scheduler: SchedulerSection,
    pub watchlists: WatchlistsConfig,
    pub sources: SourcesConfig,
    pub rules: RulesConfig,
    pub alerts: AlertsConfig,
    pub telemetry: TelemetryConfig,
}

/// Venue cadences and fetch pool sizing
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SchedulerSection {
    /// CEX watchlist poll interval
    pub cex_interval_secs: u64,
    /// DEX watchlist poll interval
    pub dex_interval_secs: u64,
    /// Pool discovery sweep interval
    pub discovery_interval_secs: u64,
    /// Wallet feed poll interval
    pub wallet_interval_secs: u64,
    /// Equity watchlist poll interval
    pub equity_interval_secs: u64,
    /// Concurrent fetches per watchlist cycle
    pub max_concurrency: usize,
    /// Pacing delay before each instrument fetch, in milliseconds
    pub call_delay_ms: u64,
    /// Initial rate-limit backoff delay
    pub backoff_initial_secs: u64,
    /// Backoff ceiling
    pub backoff_max_secs: u64,
}

impl Default for SchedulerSection {
    fn default() -> Self {
        Self {
            cex_interval_secs: 60,
            dex_interval_secs: 60,
            discovery_interval_secs: 30,
            wallet_interval_secs: 120,
            equity_interval_secs: 300,
            max_concurrency: 4,
            call_delay_ms: 300,
            backoff_initial_secs: 5,
            backoff_max_secs: 300,
        }
    }
}

/// Instruments watched per venue
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct WatchlistsConfig {
    /// CEX pairs, "BASE/QUOTE" form
    pub cex: Vec<String>,
    /// DEX token addresses
    pub dex: Vec<String>,
    /// Equity/ETF ticker symbols
    pub equity: Vec<String>,
    /// Wallet addresses for the smart-money feed
    pub wallets: Vec<String>,
}

/// Provider-level settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SourcesConfig {
    /// Chain the DEX watchlist tokens live on
    pub dex_chain: String,
    /// Chains the discovery sweep searches
    pub discovery_chains: Vec<String>,
    /// Etherscan API key; absent disables the wallet feed
    pub etherscan_api_key: Option<String>,
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            dex_chain: "solana".to_string(),
            discovery_chains: vec!["solana".to_string()],
            etherscan_api_key: None,
        }
    }
}

/// Per-rule thresholds
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RulesConfig {
    pub divergence: DivergenceConfig,
    pub snipe: SnipeConfig,
    pub equity: DipBreakoutConfig,
}

/// Aggregation cutoffs, publish floor, and the dedup window
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AlertsConfig {
    /// Alerts below this confidence are never published
    pub min_confidence: u8,
    /// MONITOR tier cutoff
    pub monitor_cutoff: u8,
    /// ALERT tier cutoff
    pub alert_cutoff: u8,
    /// MAX_ALERT tier cutoff
    pub max_alert_cutoff: u8,
    /// Dedup suppression window
    pub dedup_ttl_secs: u64,
    /// Dedup cache capacity
    pub dedup_capacity: usize,
}

impl Default for AlertsConfig {
    fn default() -> Self {
        Self {
            min_confidence: 50,
            monitor_cutoff: 50,
            alert_cutoff: 75,
            max_alert_cutoff: 90,
            dedup_ttl_secs: 3600,
            dedup_capacity: 1000,
        }
    }
}

/// Telemetry configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    /// Prometheus exporter port; absent disables the exporter
    pub metrics_port: Option<u16>,
    pub log_level: String,
    /// "pretty" or "json"
    pub log_format: String,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            metrics_port: None,
            log_level: "info".to_string(),
            log_format: "pretty".to_string(),
        }
    }
}

/// Rejected configuration values
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("tier cutoffs must be ordered: monitor <= alert <= max_alert")]
    UnorderedCutoffs,
    #[error("dedup_capacity must be greater than zero")]
    ZeroDedupCapacity,
    #[error("max_concurrency must be greater than zero")]
    ZeroConcurrency,
    #[error("interval `{name}` must be greater than zero")]
    ZeroInterval { name: &'static str },
    #[error("rules.divergence.volume_threshold must be positive")]
    NonPositiveVolumeThreshold,
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<std::path::Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Check cross-field invariants the type system cannot express
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.alerts.monitor_cutoff > self.alerts.alert_cutoff
            || self.alerts.alert_cutoff > self.alerts.max_alert_cutoff
        {
            return Err(ConfigError::UnorderedCutoffs);
        }
        if self.alerts.dedup_capacity == 0 {
            return Err(ConfigError::ZeroDedupCapacity);
        }
        if self.scheduler.max_concurrency == 0 {
            return Err(ConfigError::ZeroConcurrency);
        }
        for (name, value) in [
            ("cex_interval_secs", self.scheduler.cex_interval_secs),
            ("dex_interval_secs", self.scheduler.dex_interval_secs),
            (
                "discovery_interval_secs",
                self.scheduler.discovery_interval_secs,
            ),
            ("wallet_interval_secs", self.scheduler.wallet_interval_secs),
            ("equity_interval_secs", self.scheduler.equity_interval_secs),
        ] {
            if value == 0 {
                return Err(ConfigError::ZeroInterval { name });
            }
        }
        if self.rules.divergence.volume_threshold <= rust_decimal::Decimal::ZERO {
            return Err(ConfigError::NonPositiveVolumeThreshold);
        }
        Ok(())
    }
}
