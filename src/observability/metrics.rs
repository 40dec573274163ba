//! Metrics collection and exposition.
//!
//! # Metrics
//! - `tierline_tier_attempts_total` (counter): tier calls by tier, status
//! - `tierline_tier_latency_seconds` (histogram): tier call latency by tier
//! - `tierline_pipeline_requests_total` (counter): operations by name, result
//! - `tierline_auth_rejections_total` (counter): inbound rejections by reason
//! - `tierline_pending_reports` (gauge): queued progress reports
//! - `tierline_pending_evictions_total` (counter): reports dropped at capacity
//!
//! # Design Decisions
//! - Recording goes through the `metrics` facade; without an installed
//!   recorder every call is a no-op, so tests need no setup
//! - The Prometheus exporter is only installed when enabled in config

use std::net::SocketAddr;
use std::time::Duration;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its HTTP listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_tier_attempt(tier: &str, status: &'static str, latency: Duration) {
    counter!(
        "tierline_tier_attempts_total",
        "tier" => tier.to_string(),
        "status" => status
    )
    .increment(1);
    histogram!("tierline_tier_latency_seconds", "tier" => tier.to_string())
        .record(latency.as_secs_f64());
}

pub fn record_pipeline_request(operation: &'static str, result: &'static str) {
    counter!(
        "tierline_pipeline_requests_total",
        "operation" => operation,
        "result" => result
    )
    .increment(1);
}

pub fn record_auth_rejection(reason: &'static str) {
    counter!("tierline_auth_rejections_total", "reason" => reason).increment(1);
}

pub fn set_pending_reports(depth: usize) {
    gauge!("tierline_pending_reports").set(depth as f64);
}

pub fn record_pending_eviction() {
    counter!("tierline_pending_evictions_total").increment(1);
}
