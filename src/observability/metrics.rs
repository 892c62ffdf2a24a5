//! Metrics collection and exposition.
//!
//! # Metrics
//! - `ingress_resolutions_total` (counter): resolutions by outcome
//! - `ingress_config_reloads_total` (counter): reloads by result
//! - `ingress_rules` (gauge): rules in the active rule set
//!
//! # Design Decisions
//! - Recording is a no-op until an exporter is installed, so the library
//!   can be used without one

use std::net::SocketAddr;

use metrics::{counter, gauge};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter with an HTTP scrape listener.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => {
            tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter")
        }
    }
}

pub fn record_resolution(outcome: &'static str) {
    counter!("ingress_resolutions_total", "outcome" => outcome).increment(1);
}

pub fn record_reload(result: &'static str) {
    counter!("ingress_config_reloads_total", "result" => result).increment(1);
}

pub fn set_rule_count(count: usize) {
    gauge!("ingress_rules").set(count as f64);
}
