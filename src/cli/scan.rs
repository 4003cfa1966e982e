//! Scan command implementation

use super::run::build_scheduler;
use crate::alert::ChannelSink;
use crate::config::Config;
use clap::Args;
use std::sync::Arc;

#[derive(Args, Debug)]
pub struct ScanArgs {
    /// Only print alerts at or above this confidence
    #[arg(long)]
    pub min_confidence: Option<u8>,
}

impl ScanArgs {
    /// One pass over every configured venue, printing alerts to stdout
    pub async fn execute(&self, mut config: Config) -> anyhow::Result<()> {
        if let Some(floor) = self.min_confidence {
            config.alerts.min_confidence = floor;
        }

        let (sink, mut rx) = ChannelSink::new(256);
        let scheduler = build_scheduler(&config, Arc::new(sink));

        tracing::info!("Running one-shot scan");
        scheduler.run_once().await;
        drop(scheduler);

        let mut count = 0;
        while let Some(alert) = rx.recv().await {
            count += 1;
            println!(
                "[{}] {} {} confidence={}",
                alert.tier.as_str().to_uppercase(),
                alert.venue_kind.as_str(),
                alert.asset_key,
                alert.confidence
            );
            for signal in &alert.signals {
                for explanation in &signal.explanations {
                    println!("    {} | {}", signal.rule_id, explanation);
                }
            }
        }

        if count == 0 {
            println!("No alerts this cycle.");
        } else {
            println!("{count} alert(s).");
        }

        Ok(())
    }
}
