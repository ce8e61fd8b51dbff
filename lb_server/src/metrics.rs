//! Prometheus metrics.
//!
//! Metrics are exposed in Prometheus text format on a separate listener
//! (`METRICS_BIND`). When no exporter is installed the recording functions
//! are no-ops.
//!
//! # Metrics
//!
//! - `http_requests_total`, `http_request_duration_ms`: per route and status
//! - `tournaments_created_total`, `tournaments_started_total`,
//!   `tournaments_completed_total`
//! - `match_results_total`: recorded results by bracket
//! - `bracket_generation_duration_ms`: preview and start latency by format

use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;

/// Install the Prometheus exporter with a scrape endpoint on `addr`
pub fn init_metrics(addr: SocketAddr) -> Result<(), String> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| format!("Failed to install Prometheus exporter: {}", e))
}

// ============================================================================
// HTTP Metrics
// ============================================================================

/// Record HTTP request; `path` is the route template, not the raw URI
pub fn http_requests_total(method: &str, path: &str, status: u16) {
    metrics::counter!("http_requests_total",
        "method" => method.to_string(),
        "path" => path.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

/// Record HTTP request duration in milliseconds.
pub fn http_request_duration_ms(method: &str, path: &str, duration_ms: f64) {
    metrics::histogram!("http_request_duration_ms",
        "method" => method.to_string(),
        "path" => path.to_string()
    )
    .record(duration_ms);
}

// ============================================================================
// Tournament Metrics
// ============================================================================

pub fn tournaments_created_total(format: &str) {
    metrics::counter!("tournaments_created_total", "format" => format.to_string()).increment(1);
}

pub fn tournaments_started_total(format: &str) {
    metrics::counter!("tournaments_started_total", "format" => format.to_string()).increment(1);
}

pub fn tournaments_completed_total() {
    metrics::counter!("tournaments_completed_total").increment(1);
}

pub fn match_results_total(bracket: &str) {
    metrics::counter!("match_results_total", "bracket" => bracket.to_string()).increment(1);
}

/// Record how long generating (and for start, persisting) a bracket took
pub fn bracket_generation_duration_ms(format: &str, duration_ms: f64) {
    metrics::histogram!("bracket_generation_duration_ms",
        "format" => format.to_string()
    )
    .record(duration_ms);
}
