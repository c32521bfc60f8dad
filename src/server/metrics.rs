use axum::{http::StatusCode, response::IntoResponse};
use lazy_static::lazy_static;
use prometheus::{
    Counter, CounterVec, Encoder, HistogramOpts, HistogramVec, Opts, Registry, TextEncoder,
};
use std::time::Duration;

/// Metric name prefix for all catalog server metrics
const PREFIX: &str = "music_catalog";

lazy_static! {
    // Global Prometheus registry
    pub static ref REGISTRY: Registry = Registry::new();

    // HTTP Request Metrics
    pub static ref HTTP_REQUESTS_TOTAL: CounterVec = CounterVec::new(
        Opts::new(format!("{PREFIX}_http_requests_total"), "Total number of HTTP requests"),
        &["method", "path", "status"]
    ).expect("Failed to create http_requests_total metric");

    pub static ref HTTP_REQUEST_DURATION_SECONDS: HistogramVec = HistogramVec::new(
        HistogramOpts::new(
            format!("{PREFIX}_http_request_duration_seconds"),
            "HTTP request duration in seconds"
        )
        .buckets(vec![0.001, 0.01, 0.05, 0.1, 0.5, 1.0, 2.0, 5.0, 10.0]),
        &["method", "path"]
    ).expect("Failed to create http_request_duration_seconds metric");

    // Store Metrics
    pub static ref STORE_CALL_DURATION_SECONDS: HistogramVec = HistogramVec::new(
        HistogramOpts::new(
            format!("{PREFIX}_store_call_duration_seconds"),
            "Key-value store call duration in seconds"
        )
        .buckets(vec![0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0]),
        &["operation"]
    ).expect("Failed to create store_call_duration_seconds metric");

    pub static ref STORE_ERRORS_TOTAL: CounterVec = CounterVec::new(
        Opts::new(format!("{PREFIX}_store_errors_total"), "Failed or timed out store calls"),
        &["operation"]
    ).expect("Failed to create store_errors_total metric");

    pub static ref BATCH_GET_CHUNKS_TOTAL: Counter = Counter::new(
        format!("{PREFIX}_batch_get_chunks_total"),
        "Batched multi-get calls issued for subscription listings"
    ).expect("Failed to create batch_get_chunks_total metric");

    // Asset Metrics
    pub static ref ASSET_FETCHES_TOTAL: CounterVec = CounterVec::new(
        Opts::new(format!("{PREFIX}_asset_fetches_total"), "Cover image fetches by outcome"),
        &["outcome"]
    ).expect("Failed to create asset_fetches_total metric");

    // Error Metrics
    pub static ref ERRORS_TOTAL: CounterVec = CounterVec::new(
        Opts::new(format!("{PREFIX}_errors_total"), "Error responses by type and status"),
        &["error_type", "status"]
    ).expect("Failed to create errors_total metric");
}

/// Initialize all metrics and register them with the Prometheus registry
pub fn init_metrics() {
    // Register all metrics - ignore errors if already registered (for tests)
    let _ = REGISTRY.register(Box::new(HTTP_REQUESTS_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(HTTP_REQUEST_DURATION_SECONDS.clone()));
    let _ = REGISTRY.register(Box::new(STORE_CALL_DURATION_SECONDS.clone()));
    let _ = REGISTRY.register(Box::new(STORE_ERRORS_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(BATCH_GET_CHUNKS_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(ASSET_FETCHES_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(ERRORS_TOTAL.clone()));

    tracing::info!("Metrics system initialized successfully");
}

/// Record an HTTP request
pub fn record_http_request(method: &str, path: &str, status: u16, duration: Duration) {
    HTTP_REQUESTS_TOTAL
        .with_label_values(&[method, path, &status.to_string()])
        .inc();

    HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&[method, path])
        .observe(duration.as_secs_f64());
}

/// Record a key-value store call, successful or not
pub fn record_store_call(operation: &str, duration: Duration, ok: bool) {
    STORE_CALL_DURATION_SECONDS
        .with_label_values(&[operation])
        .observe(duration.as_secs_f64());

    if !ok {
        STORE_ERRORS_TOTAL.with_label_values(&[operation]).inc();
    }
}

/// Record the number of multi-get chunks one listing needed
pub fn record_batch_get_chunks(chunks: usize) {
    BATCH_GET_CHUNKS_TOTAL.inc_by(chunks as f64);
}

/// Record a cover image fetch: `hit`, `missing`, `error` or `timeout`
pub fn record_asset_fetch(outcome: &str) {
    ASSET_FETCHES_TOTAL.with_label_values(&[outcome]).inc();
}

/// Record an error response
pub fn record_error(error_type: &str, status: u16) {
    ERRORS_TOTAL
        .with_label_values(&[error_type, &status.to_string()])
        .inc();
}

/// Handler for the /metrics endpoint
pub async fn metrics_handler() -> impl IntoResponse {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();

    let mut buffer = vec![];
    match encoder.encode(&metric_families, &mut buffer) {
        Ok(()) => {
            let response = String::from_utf8(buffer).unwrap_or_else(|_| String::from(""));
            (StatusCode::OK, response)
        }
        Err(e) => {
            tracing::error!("Failed to encode metrics: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to encode metrics: {}", e),
            )
        }
    }
}
