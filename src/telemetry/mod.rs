//! Telemetry module
//!
//! Structured logging and Prometheus metrics

mod logging;
mod metrics;

pub use logging::{init_logging, LogFormat};
pub use metrics::{
    count_alert_emitted, count_alert_suppressed, count_fetch_error, count_rule_fired,
    count_snapshot, describe_metrics, record_cycle_duration,
};

use crate::config::TelemetryConfig;
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::{Ipv4Addr, SocketAddr};

/// Guard that keeps telemetry alive for the process lifetime
pub struct TelemetryGuard {
    _priv: (),
}

/// Initialize all telemetry subsystems
pub fn init_telemetry(config: &TelemetryConfig) -> anyhow::Result<TelemetryGuard> {
    init_logging(&config.log_level, LogFormat::parse(&config.log_format))?;

    if let Some(port) = config.metrics_port {
        let addr = SocketAddr::from((Ipv4Addr::UNSPECIFIED, port));
        PrometheusBuilder::new()
            .with_http_listener(addr)
            .install()
            .map_err(|e| anyhow::anyhow!("Failed to start metrics exporter: {}", e))?;
        describe_metrics();
        tracing::info!(port, "Prometheus exporter listening");
    }

    Ok(TelemetryGuard { _priv: () })
}
