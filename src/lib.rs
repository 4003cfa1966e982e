//! icewatch: multi-venue silent-accumulation detection and alerting engine
//!
//! This library provides the core components for:
//! - Normalized market snapshots across CEX, DEX, and equity venues
//! - Venue adapters for Binance klines, DexScreener pairs, Yahoo bars,
//!   pool discovery, and Etherscan wallet activity
//! - Detection rules: volume/price divergence, liquidity snipe,
//!   equity dip/breakout, and smart-money tracking
//! - Confidence aggregation with severity tiers
//! - Time-windowed alert deduplication with bounded memory
//! - A per-venue polling scheduler with rate-limit backoff
//! - Full observability stack

pub mod alert;
pub mod cli;
pub mod config;
pub mod rules;
pub mod scheduler;
pub mod snapshot;
pub mod source;
pub mod telemetry;
