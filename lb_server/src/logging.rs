//! Structured logging configuration.
//!
//! The library logs through the `log` facade; the subscriber installed here
//! picks those records up alongside the server's own `tracing` events.

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize structured logging
///
/// Log levels come from `RUST_LOG` (default `info,sqlx=warn,hyper=warn`).
///
/// # Example
///
/// ```no_run
/// use lb_server::logging;
///
/// #[tokio::main]
/// async fn main() {
///     logging::init();
///     tracing::info!("Server starting");
/// }
/// ```
pub fn init() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,sqlx=warn,hyper=warn"));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();

    tracing::info!("Structured logging initialized");
}

/// Log performance metric; anything over a second is a warning
pub fn log_performance(operation: &str, duration_ms: u64, metadata: Option<&str>) {
    if duration_ms > 1000 {
        tracing::warn!(
            operation = operation,
            duration_ms = duration_ms,
            metadata = metadata,
            "PERFORMANCE: Slow operation"
        );
    } else {
        tracing::debug!(
            operation = operation,
            duration_ms = duration_ms,
            metadata = metadata,
            "Performance metric"
        );
    }
}

/// Log API request/response
pub fn log_api_request(
    request_id: &str,
    method: &str,
    path: &str,
    status_code: u16,
    duration_ms: u64,
) {
    if status_code >= 500 {
        tracing::error!(
            request_id = request_id,
            http_method = method,
            http_path = path,
            http_status = status_code,
            duration_ms = duration_ms,
            "API request failed"
        );
    } else {
        tracing::info!(
            request_id = request_id,
            http_method = method,
            http_path = path,
            http_status = status_code,
            duration_ms = duration_ms,
            "API request completed"
        );
    }
}
