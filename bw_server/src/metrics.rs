//! Prometheus metrics for the dashboard server.
//!
//! Recording goes through the `metrics` facade and is a no-op until
//! [`init_metrics`] installs the exporter, so handlers call these helpers
//! unconditionally.
//!
//! # Example Usage
//!
//! ```rust,no_run
//! use bw_server::metrics;
//! use std::net::SocketAddr;
//!
//! let addr: SocketAddr = "127.0.0.1:9090".parse().unwrap();
//! metrics::init_metrics(addr).unwrap();
//!
//! metrics::http_requests_total("POST", "/auth/login", 200);
//! metrics::login_attempts_total("success");
//! ```

use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;

/// Initialize Prometheus metrics exporter.
///
/// Metrics will be available at `http://<addr>/metrics`.
pub fn init_metrics(addr: SocketAddr) -> Result<(), String> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| format!("Failed to install Prometheus exporter: {}", e))
}

// ============================================================================
// HTTP Metrics
// ============================================================================

/// Record HTTP request.
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
// Auth Metrics
// ============================================================================

/// Password login attempts by outcome (`success`, `two_factor`, `failure`, `locked`).
pub fn login_attempts_total(outcome: &str) {
    metrics::counter!("login_attempts_total",
        "outcome" => outcome.to_string()
    )
    .increment(1);
}

/// One-time code verifications by outcome.
pub fn two_factor_verifications_total(outcome: &str) {
    metrics::counter!("two_factor_verifications_total",
        "outcome" => outcome.to_string()
    )
    .increment(1);
}

// ============================================================================
// Audit Metrics
// ============================================================================

/// Audit entries written, by action.
pub fn audit_entries_total(action: &str) {
    metrics::counter!("audit_entries_total",
        "action" => action.to_string()
    )
    .increment(1);
}
