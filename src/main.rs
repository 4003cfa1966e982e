use clap::Parser;
use icewatch::cli::{Cli, Commands};
use icewatch::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = Config::load(&cli.config).unwrap_or_else(|e| {
        eprintln!("Warning: Could not load config from {}: {}", cli.config, e);
        eprintln!("Using default configuration");
        toml::from_str(include_str!("../config.toml.example")).expect("Invalid default config")
    });

    // Initialize telemetry
    icewatch::telemetry::init_telemetry(&config.telemetry)?;

    match cli.command {
        Commands::Run(args) => {
            args.execute(config).await?;
        }
        Commands::Scan(args) => {
            args.execute(config).await?;
        }
        Commands::Status => {
            println!("icewatch status");
            println!("  CEX instruments:    {}", config.watchlists.cex.len());
            println!("  DEX tokens:         {}", config.watchlists.dex.len());
            println!("  Equity tickers:     {}", config.watchlists.equity.len());
            println!("  Watched wallets:    {}", config.watchlists.wallets.len());
            println!(
                "  Discovery chains:   {}",
                config.sources.discovery_chains.join(", ")
            );
        }
        Commands::Config => {
            println!("Current configuration:");
            println!(
                "  Intervals: cex={}s dex={}s discovery={}s wallets={}s equity={}s",
                config.scheduler.cex_interval_secs,
                config.scheduler.dex_interval_secs,
                config.scheduler.discovery_interval_secs,
                config.scheduler.wallet_interval_secs,
                config.scheduler.equity_interval_secs,
            );
            println!(
                "  Alerts: floor={} cutoffs={}/{}/{} dedup={}s cap={}",
                config.alerts.min_confidence,
                config.alerts.monitor_cutoff,
                config.alerts.alert_cutoff,
                config.alerts.max_alert_cutoff,
                config.alerts.dedup_ttl_secs,
                config.alerts.dedup_capacity,
            );
            println!(
                "  Divergence: {}x volume within {}% price band",
                config.rules.divergence.volume_threshold,
                config.rules.divergence.price_stability_pct,
            );
        }
    }

    Ok(())
}
