//! Prometheus metrics for docgen-service.

use once_cell::sync::Lazy;
use prometheus::{
    register_counter_vec, register_histogram_vec, CounterVec, HistogramVec, TextEncoder,
};

/// HTTP request counter by path and status.
pub static HTTP_REQUESTS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "docgen_http_requests_total",
        "Total number of HTTP requests",
        &["path", "status"]
    )
    .expect("Failed to register http_requests_total")
});

/// Documents created, by type.
pub static DOCUMENTS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "docgen_documents_total",
        "Total number of documents created by type",
        &["document_type"] // invoice, quotation, receipt
    )
    .expect("Failed to register documents_total")
});

/// Inbound messages, by pipeline outcome.
pub static MESSAGES_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "docgen_inbound_messages_total",
        "Total number of inbound messages by outcome",
        &["outcome"] // created, parse_failure, tenant_unresolved, quota_exceeded
    )
    .expect("Failed to register inbound_messages_total")
});

/// Quota denials across both entry paths.
pub static QUOTA_DENIALS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "docgen_quota_denials_total",
        "Total number of quota denials by plan",
        &["plan"]
    )
    .expect("Failed to register quota_denials_total")
});

/// Documents persisted whose usage increment failed.
pub static PARTIAL_FAILURES_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "docgen_partial_failures_total",
        "Documents persisted without a usage increment",
        &["stage"]
    )
    .expect("Failed to register partial_failures_total")
});

/// Error counter for alerting.
pub static ERRORS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "docgen_errors_total",
        "Total number of errors by type",
        &["error_type"]
    )
    .expect("Failed to register errors_total")
});

/// Database query duration histogram.
pub static DB_QUERY_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "docgen_db_query_duration_seconds",
        "Database query duration in seconds",
        &["operation"],
        vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0]
    )
    .expect("Failed to register db_query_duration")
});

/// PDF render duration histogram.
pub static RENDER_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "docgen_render_duration_seconds",
        "Document render duration in seconds",
        &["outcome"], // ok, degraded, failed
        vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]
    )
    .expect("Failed to register render_duration")
});

/// Initialize all metrics (forces lazy initialization).
pub fn init_metrics() {
    Lazy::force(&HTTP_REQUESTS_TOTAL);
    Lazy::force(&DOCUMENTS_TOTAL);
    Lazy::force(&MESSAGES_TOTAL);
    Lazy::force(&QUOTA_DENIALS_TOTAL);
    Lazy::force(&PARTIAL_FAILURES_TOTAL);
    Lazy::force(&ERRORS_TOTAL);
    Lazy::force(&DB_QUERY_DURATION);
    Lazy::force(&RENDER_DURATION);
}

/// Get metrics in Prometheus text format.
pub fn get_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    encoder
        .encode_to_string(&metric_families)
        .unwrap_or_default()
}
