/// Metrics and telemetry for the broadcast service
///
/// Provides Prometheus-compatible metrics for monitoring:
/// - broadcast requests by outcome
/// - individual email sends by result
/// - end-to-end broadcast latency
use lazy_static::lazy_static;
use prometheus::{
    register_histogram, register_int_counter_vec, Encoder, Histogram, IntCounterVec, TextEncoder,
};

lazy_static! {
    /// Broadcast requests by terminal outcome (`sent`, `unauthorized`, ...)
    pub static ref BROADCAST_REQUESTS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "broadcast_requests_total",
        "Total number of broadcast requests by outcome",
        &["outcome"]
    )
    .unwrap();

    /// Individual email sends by result
    pub static ref EMAILS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "broadcast_emails_total",
        "Total number of individual email sends by result",
        &["result"]
    )
    .unwrap();

    /// Time spent dispatching one broadcast
    pub static ref DISPATCH_DURATION_SECONDS: Histogram = register_histogram!(
        "broadcast_dispatch_duration_seconds",
        "Broadcast dispatch latencies in seconds",
        vec![0.1, 0.5, 1.0, 2.5, 5.0, 10.0, 15.0, 30.0]
    )
    .unwrap();
}

pub fn record_request(outcome: &str) {
    BROADCAST_REQUESTS_TOTAL.with_label_values(&[outcome]).inc();
}

pub fn record_email(success: bool) {
    let result = if success { "sent" } else { "failed" };
    EMAILS_TOTAL.with_label_values(&[result]).inc();
}

/// Render all registered metrics in the Prometheus text format
pub fn gather() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!("Failed to encode metrics: {}", e);
        return String::new();
    }

    String::from_utf8(buffer).unwrap_or_default()
}
