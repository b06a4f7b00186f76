//! Metrics collection and exposition.
//!
//! # Metrics
//! - `sgcache_requests_total` (counter): requests by route, outcome, status
//! - `sgcache_request_duration_seconds` (histogram): latency by route, outcome
//!
//! # Design Decisions
//! - Recording is a no-op until a recorder is installed, so tests and
//!   metrics-disabled deployments pay nothing
//! - `outcome` says who answered: local, fault, passthrough, proxy,
//!   redirect, malformed or error

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its scrape endpoint.
pub fn init_metrics(addr: SocketAddr) {
    let builder = PrometheusBuilder::new().with_http_listener(addr);
    match builder.install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics recorder"),
    }
}

/// Record one finished request.
pub fn record_request(route: &'static str, outcome: &'static str, status: u16, start: Instant) {
    metrics::counter!(
        "sgcache_requests_total",
        "route" => route,
        "outcome" => outcome,
        "status" => status.to_string()
    )
    .increment(1);

    metrics::histogram!(
        "sgcache_request_duration_seconds",
        "route" => route,
        "outcome" => outcome
    )
    .record(start.elapsed().as_secs_f64());
}
