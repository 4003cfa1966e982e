//! Polling scheduler
//!
//! Runs one loop per configured venue, each on its own cadence: watchlist
//! venues fan their instruments out through a bounded worker pool, the
//! discovery loop sweeps for new pools, and the wallet loop feeds the
//! smart-money tracker. A rate-limited venue backs itself off with a
//! doubling delay without touching the other loops. All loops watch a
//! shared shutdown channel and drain within the grace period.

mod backoff;
mod pipeline;

pub use backoff::Backoff;
pub use pipeline::Pipeline;

use crate::rules::SmartMoneyTracker;
use crate::snapshot::VenueKind;
use crate::source::{DataSource, DiscoverySource, WalletFeed};
use futures_util::stream::{self, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinSet;

/// Cadences and pool sizing for the venue loops
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Concurrent fetches per watchlist cycle
    pub max_concurrency: usize,
    /// Pacing delay before each instrument fetch enters the pool
    pub call_delay: Duration,
    /// Initial rate-limit backoff delay
    pub backoff_initial: Duration,
    /// Backoff ceiling
    pub backoff_max: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            max_concurrency: 4,
            call_delay: Duration::from_millis(300),
            backoff_initial: Duration::from_secs(5),
            backoff_max: Duration::from_secs(300),
        }
    }
}

/// One watchlist venue: a source, its instruments, and its cadence
struct WatchlistPlan {
    source: Arc<dyn DataSource>,
    instruments: Vec<String>,
    interval: Duration,
}

/// Owns the venue loops and the shared pipeline
pub struct Scheduler {
    config: SchedulerConfig,
    pipeline: Arc<Pipeline>,
    watchlists: Vec<WatchlistPlan>,
    discovery: Option<(Arc<dyn DiscoverySource>, Duration)>,
    wallet_feed: Option<(Arc<dyn WalletFeed>, Arc<SmartMoneyTracker>, Duration)>,
}

impl Scheduler {
    pub fn new(config: SchedulerConfig, pipeline: Arc<Pipeline>) -> Self {
        Self {
            config,
            pipeline,
            watchlists: Vec::new(),
            discovery: None,
            wallet_feed: None,
        }
    }

    /// Register a watchlist venue; empty watchlists are skipped at start
    pub fn add_watchlist(
        &mut self,
        source: Arc<dyn DataSource>,
        instruments: Vec<String>,
        interval: Duration,
    ) {
        self.watchlists.push(WatchlistPlan {
            source,
            instruments,
            interval,
        });
    }

    pub fn set_discovery(&mut self, source: Arc<dyn DiscoverySource>, interval: Duration) {
        self.discovery = Some((source, interval));
    }

    pub fn set_wallet_feed(
        &mut self,
        feed: Arc<dyn WalletFeed>,
        tracker: Arc<SmartMoneyTracker>,
        interval: Duration,
    ) {
        self.wallet_feed = Some((feed, tracker, interval));
    }

    /// Run one cycle of every configured venue and return.
    ///
    /// Used by the one-shot scan command; the continuous loops go through
    /// [`Self::run`].
    pub async fn run_once(&self) {
        for plan in &self.watchlists {
            if plan.instruments.is_empty() {
                continue;
            }
            Self::poll_watchlist(&self.pipeline, &plan.source, &plan.instruments, &self.config)
                .await;
        }

        if let Some((source, _)) = &self.discovery {
            match source.discover().await {
                Ok(snapshots) => {
                    for snapshot in &snapshots {
                        self.pipeline.process(snapshot).await;
                    }
                }
                Err(err) => tracing::warn!(error = %err, "Discovery sweep failed"),
            }
        }

        if let Some((feed, tracker, _)) = &self.wallet_feed {
            match feed.poll().await {
                Ok(batch) => {
                    for signal in tracker.observe(&batch) {
                        let asset_key = signal.asset_key.clone();
                        self.pipeline
                            .publish_signals(&asset_key, VenueKind::Dex, vec![signal])
                            .await;
                    }
                }
                Err(err) => tracing::warn!(error = %err, "Wallet poll failed"),
            }
        }
    }

    /// Run all venue loops until the shutdown channel flips to true.
    ///
    /// Returns once every loop has observed the signal and finished its
    /// in-flight cycle.
    pub async fn run(self, shutdown: watch::Receiver<bool>) {
        let mut tasks = JoinSet::new();

        for plan in self.watchlists {
            if plan.instruments.is_empty() {
                continue;
            }
            let venue = plan.source.venue();
            tracing::info!(
                venue = venue.as_str(),
                instruments = plan.instruments.len(),
                interval_secs = plan.interval.as_secs(),
                "Starting watchlist loop"
            );
            tasks.spawn(Self::watchlist_loop(
                self.pipeline.clone(),
                plan,
                self.config.clone(),
                shutdown.clone(),
            ));
        }

        if let Some((source, interval)) = self.discovery {
            tracing::info!(interval_secs = interval.as_secs(), "Starting discovery loop");
            tasks.spawn(Self::discovery_loop(
                self.pipeline.clone(),
                source,
                interval,
                self.config.clone(),
                shutdown.clone(),
            ));
        }

        if let Some((feed, tracker, interval)) = self.wallet_feed {
            tracing::info!(interval_secs = interval.as_secs(), "Starting wallet loop");
            tasks.spawn(Self::wallet_loop(
                self.pipeline.clone(),
                feed,
                tracker,
                interval,
                self.config.clone(),
                shutdown.clone(),
            ));
        }

        while let Some(result) = tasks.join_next().await {
            if let Err(e) = result {
                tracing::error!(error = %e, "Venue loop panicked");
            }
        }

        tracing::info!("All venue loops stopped");
    }

    /// Fetch every instrument through the worker pool and run each
    /// snapshot through the pipeline. Reports whether the venue was
    /// rate limited during the cycle.
    async fn poll_watchlist(
        pipeline: &Pipeline,
        source: &Arc<dyn DataSource>,
        instruments: &[String],
        config: &SchedulerConfig,
    ) -> bool {
        let venue = source.venue();
        // `then` paces the entry of instruments into the pool so a large
        // watchlist does not burst the provider at cycle start.
        let results: Vec<_> = stream::iter(0..instruments.len())
            .then(move |idx| {
                let call_delay = config.call_delay;
                async move {
                    if !call_delay.is_zero() {
                        tokio::time::sleep(call_delay).await;
                    }
                    idx
                }
            })
            .map(|idx| {
                let source = Arc::clone(source);
                let instrument = &instruments[idx];
                async move { (instrument.as_str(), source.fetch(instrument).await) }
            })
            .buffer_unordered(config.max_concurrency.max(1))
            .collect()
            .await;

        let mut rate_limited = false;
        for (instrument, result) in results {
            match result {
                Ok(snapshot) => {
                    pipeline.process(&snapshot).await;
                }
                Err(err) if err.is_rate_limited() => {
                    rate_limited = true;
                }
                Err(err) => {
                    crate::telemetry::count_fetch_error(venue);
                    tracing::warn!(
                        venue = venue.as_str(),
                        instrument,
                        error = %err,
                        "Fetch failed, skipping instrument this cycle"
                    );
                }
            }
        }
        rate_limited
    }

    async fn watchlist_loop(
        pipeline: Arc<Pipeline>,
        plan: WatchlistPlan,
        config: SchedulerConfig,
        mut shutdown: watch::Receiver<bool>,
    ) {
        let venue = plan.source.venue();
        let mut backoff = Backoff::new(config.backoff_initial, config.backoff_max);
        let mut ticker = tokio::time::interval(plan.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = shutdown.changed() => break,
                _ = ticker.tick() => {
                    let started = std::time::Instant::now();
                    let rate_limited = Self::poll_watchlist(
                        &pipeline,
                        &plan.source,
                        &plan.instruments,
                        &config,
                    )
                    .await;
                    crate::telemetry::record_cycle_duration(venue, started.elapsed());

                    if rate_limited {
                        let delay = backoff.next();
                        tracing::warn!(
                            venue = venue.as_str(),
                            delay_secs = delay.as_secs(),
                            "Venue rate limited, backing off"
                        );
                        if Self::sleep_or_shutdown(delay, &mut shutdown).await {
                            break;
                        }
                    } else {
                        backoff.reset();
                    }
                }
            }
        }
        tracing::info!(venue = venue.as_str(), "Watchlist loop stopped");
    }

    async fn discovery_loop(
        pipeline: Arc<Pipeline>,
        source: Arc<dyn DiscoverySource>,
        interval: Duration,
        config: SchedulerConfig,
        mut shutdown: watch::Receiver<bool>,
    ) {
        let mut backoff = Backoff::new(config.backoff_initial, config.backoff_max);
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = shutdown.changed() => break,
                _ = ticker.tick() => {
                    match source.discover().await {
                        Ok(snapshots) => {
                            tracing::debug!(count = snapshots.len(), "Discovery cycle complete");
                            for snapshot in &snapshots {
                                pipeline.process(snapshot).await;
                            }
                            backoff.reset();
                        }
                        Err(err) if err.is_rate_limited() => {
                            let delay = backoff.next();
                            tracing::warn!(
                                delay_secs = delay.as_secs(),
                                "Discovery rate limited, backing off"
                            );
                            if Self::sleep_or_shutdown(delay, &mut shutdown).await {
                                break;
                            }
                        }
                        Err(err) => {
                            crate::telemetry::count_fetch_error(VenueKind::Dex);
                            tracing::warn!(error = %err, "Discovery cycle failed");
                        }
                    }
                }
            }
        }
        tracing::info!("Discovery loop stopped");
    }

    async fn wallet_loop(
        pipeline: Arc<Pipeline>,
        feed: Arc<dyn WalletFeed>,
        tracker: Arc<SmartMoneyTracker>,
        interval: Duration,
        config: SchedulerConfig,
        mut shutdown: watch::Receiver<bool>,
    ) {
        let mut backoff = Backoff::new(config.backoff_initial, config.backoff_max);
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = shutdown.changed() => break,
                _ = ticker.tick() => {
                    match feed.poll().await {
                        Ok(batch) => {
                            let signals = tracker.observe(&batch);
                            for signal in signals {
                                let asset_key = signal.asset_key.clone();
                                pipeline
                                    .publish_signals(&asset_key, VenueKind::Dex, vec![signal])
                                    .await;
                            }
                            backoff.reset();
                        }
                        Err(err) if err.is_rate_limited() => {
                            let delay = backoff.next();
                            tracing::warn!(
                                delay_secs = delay.as_secs(),
                                "Wallet feed rate limited, backing off"
                            );
                            if Self::sleep_or_shutdown(delay, &mut shutdown).await {
                                break;
                            }
                        }
                        Err(err) => {
                            tracing::warn!(error = %err, "Wallet poll failed");
                        }
                    }
                }
            }
        }
        tracing::info!("Wallet loop stopped");
    }

    /// Sleep that stays responsive to shutdown; returns true if shutdown
    /// fired during the wait.
    async fn sleep_or_shutdown(delay: Duration, shutdown: &mut watch::Receiver<bool>) -> bool {
        tokio::select! {
            _ = tokio::time::sleep(delay) => false,
            _ = shutdown.changed() => true,
        }
    }
}
