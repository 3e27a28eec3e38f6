//! Metrics collection and exposition.
//!
//! # Metrics
//! - `config_loads_total` (counter): identity bootstraps by `source` (file, empty, default, ephemeral)
//! - `config_saves_total` (counter): snapshot writes by `result` (ok, error)
//! - `notifications_sent_total` (counter): sends by `channel` and `outcome`
//!   (delivered, coalesced, full, timeout)

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};
use std::net::SocketAddr;

/// Install the Prometheus exporter listening on `addr`.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics exporter listening");
    Ok(())
}

pub fn record_load(source: &'static str) {
    ::metrics::counter!("config_loads_total", "source" => source).increment(1);
}

pub fn record_save(result: &'static str) {
    ::metrics::counter!("config_saves_total", "result" => result).increment(1);
}

pub fn record_notification(channel: &'static str, outcome: &'static str) {
    ::metrics::counter!(
        "notifications_sent_total",
        "channel" => channel,
        "outcome" => outcome
    )
    .increment(1);
}
