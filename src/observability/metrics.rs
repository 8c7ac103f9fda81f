//! Metrics collection and exposition.
//!
//! # Metrics
//! - `mediator_requests_total` (counter): inbound requests by method, status, channel
//! - `mediator_request_duration_seconds` (histogram): end-to-end latency
//! - `mediator_route_calls_total` (counter): backend calls by route, kind, outcome
//! - `mediator_route_call_duration_seconds` (histogram): backend latency
//!
//! Without an installed recorder every call here is a no-op.

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Start the Prometheus scrape endpoint on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint started"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to start metrics endpoint"),
    }
}

pub fn record_request(method: &str, status: u16, channel: &str, start: Instant) {
    let labels = [
        ("method", method.to_string()),
        ("status", status.to_string()),
        ("channel", channel.to_string()),
    ];
    metrics::counter!("mediator_requests_total", &labels).increment(1);
    metrics::histogram!("mediator_request_duration_seconds", &labels).record(start.elapsed().as_secs_f64());
}

/// `kind` is `primary` or `secondary`; `outcome` is a status code,
/// `timeout` or `error`.
pub fn record_route_call(route: &str, kind: &'static str, outcome: &str, start: Instant) {
    let labels = [
        ("route", route.to_string()),
        ("kind", kind.to_string()),
        ("outcome", outcome.to_string()),
    ];
    metrics::counter!("mediator_route_calls_total", &labels).increment(1);
    metrics::histogram!("mediator_route_call_duration_seconds", &labels).record(start.elapsed().as_secs_f64());
}
