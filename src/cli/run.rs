//! Run command implementation

use crate::alert::{
    AlertDeduplicator, AlertSink, ConfidenceAggregator, DedupConfig, LogSink, TierCutoffs,
};
use crate::config::Config;
use crate::rules::{
    DipBreakout, LiquiditySnipe, Rule, SmartMoneyTracker, VolumePriceDivergence,
};
use crate::scheduler::{Pipeline, Scheduler, SchedulerConfig};
use crate::source::{
    CexCandleSource, CexConfig, DataSource, DexConfig, DexPairSource, EquityBarSource,
    EquityConfig, PoolDiscoveryConfig, PoolDiscoverySource, WalletActivityFeed, WalletFeedConfig,
};
use clap::Args;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Seconds to wait for in-flight cycles on shutdown
    #[arg(long, default_value_t = 10)]
    pub shutdown_grace_secs: u64,
}

impl RunArgs {
    pub async fn execute(&self, config: Config) -> anyhow::Result<()> {
        let scheduler = build_scheduler(&config, Arc::new(LogSink));
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        tracing::info!("Starting detection engine");
        let engine = tokio::spawn(scheduler.run(shutdown_rx));

        tokio::signal::ctrl_c().await?;
        tracing::info!("Shutdown signal received, draining venue loops");
        let _ = shutdown_tx.send(true);

        match tokio::time::timeout(Duration::from_secs(self.shutdown_grace_secs), engine).await {
            Ok(joined) => joined?,
            Err(_) => tracing::warn!(
                grace_secs = self.shutdown_grace_secs,
                "Venue loops did not drain within grace period, aborting"
            ),
        }

        Ok(())
    }
}

/// Assemble the full engine from configuration: rules, pipeline, sources,
/// and the venue schedule. Shared by `run` and `scan`.
pub(super) fn build_scheduler(config: &Config, sink: Arc<dyn AlertSink>) -> Scheduler {
    let rules: Vec<Box<dyn Rule>> = vec![
        Box::new(VolumePriceDivergence::new(config.rules.divergence.clone())),
        Box::new(LiquiditySnipe::new(config.rules.snipe.clone())),
        Box::new(DipBreakout::new(config.rules.equity.clone())),
    ];

    let aggregator = ConfidenceAggregator::new(TierCutoffs {
        monitor: config.alerts.monitor_cutoff,
        alert: config.alerts.alert_cutoff,
        max_alert: config.alerts.max_alert_cutoff,
    });

    let dedup = AlertDeduplicator::new(DedupConfig {
        ttl: chrono::Duration::seconds(config.alerts.dedup_ttl_secs as i64),
        capacity: config.alerts.dedup_capacity,
    });

    let pipeline = Arc::new(Pipeline::new(
        rules,
        aggregator,
        dedup,
        sink,
        config.alerts.min_confidence,
    ));

    let scheduler_config = SchedulerConfig {
        max_concurrency: config.scheduler.max_concurrency,
        call_delay: Duration::from_millis(config.scheduler.call_delay_ms),
        backoff_initial: Duration::from_secs(config.scheduler.backoff_initial_secs),
        backoff_max: Duration::from_secs(config.scheduler.backoff_max_secs),
    };

    let mut scheduler = Scheduler::new(scheduler_config, pipeline);

    if !config.watchlists.cex.is_empty() {
        let source: Arc<dyn DataSource> =
            Arc::new(CexCandleSource::with_config(CexConfig::default()));
        scheduler.add_watchlist(
            source,
            config.watchlists.cex.clone(),
            Duration::from_secs(config.scheduler.cex_interval_secs),
        );
    }

    if !config.watchlists.dex.is_empty() {
        let source: Arc<dyn DataSource> = Arc::new(DexPairSource::with_config(DexConfig {
            chain: config.sources.dex_chain.clone(),
            ..DexConfig::default()
        }));
        scheduler.add_watchlist(
            source,
            config.watchlists.dex.clone(),
            Duration::from_secs(config.scheduler.dex_interval_secs),
        );
    }

    if !config.watchlists.equity.is_empty() {
        let source: Arc<dyn DataSource> =
            Arc::new(EquityBarSource::with_config(EquityConfig::default()));
        scheduler.add_watchlist(
            source,
            config.watchlists.equity.clone(),
            Duration::from_secs(config.scheduler.equity_interval_secs),
        );
    }

    scheduler.set_discovery(
        Arc::new(PoolDiscoverySource::with_config(PoolDiscoveryConfig {
            chains: config.sources.discovery_chains.clone(),
            ..PoolDiscoveryConfig::default()
        })),
        Duration::from_secs(config.scheduler.discovery_interval_secs),
    );

    let wallet_feed = WalletActivityFeed::new(WalletFeedConfig {
        api_key: config.sources.etherscan_api_key.clone(),
        wallets: config.watchlists.wallets.clone(),
        ..WalletFeedConfig::default()
    });
    if wallet_feed.is_enabled() {
        scheduler.set_wallet_feed(
            Arc::new(wallet_feed),
            Arc::new(SmartMoneyTracker::new()),
            Duration::from_secs(config.scheduler.wallet_interval_secs),
        );
    } else {
        tracing::info!("Wallet feed disabled (no API key or no watched wallets)");
    }

    scheduler
}
