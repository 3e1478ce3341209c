// src/core/metrics.rs

//! Defines and registers Prometheus metrics for gateway monitoring.
//!
//! This module uses `lazy_static` to ensure that metrics are registered only once
//! globally for the entire application lifecycle.

use lazy_static::lazy_static;
use prometheus::{
    Counter, CounterVec, Gauge, Histogram, TextEncoder, register_counter, register_counter_vec,
    register_gauge, register_histogram,
};
use tracing::error;

lazy_static! {
    // --- Connection Gauges ---
    /// The number of self-check terminals currently connected.
    pub static ref CONNECTED_CLIENTS: Gauge =
        register_gauge!("sip2gate_connected_clients", "Number of currently connected clients.").unwrap();

    // --- Connection Counters ---
    /// The total number of connections accepted since startup.
    pub static ref CONNECTIONS_RECEIVED_TOTAL: Counter =
        register_counter!("sip2gate_connections_received_total", "Total number of connections received.").unwrap();
    /// Connections closed because of a socket or framing error.
    pub static ref SOCKET_ERRORS_TOTAL: Counter =
        register_counter!("sip2gate_socket_errors_total", "Total number of connection-level I/O or framing errors.").unwrap();

    // --- Message Counters ---
    /// Messages decoded and answered, labeled by request command.
    pub static ref MESSAGES_PROCESSED_TOTAL: CounterVec =
        register_counter_vec!("sip2gate_messages_processed_total", "Total number of messages processed, labeled by command.", &["command"]).unwrap();
    /// Messages that failed decoding or error detection and were answered with a resend request.
    pub static ref INVALID_MESSAGES_TOTAL: Counter =
        register_counter!("sip2gate_invalid_messages_total", "Total number of invalid messages.").unwrap();
    /// Handler failures answered with a negative response, labeled by request command.
    pub static ref HANDLER_ERRORS_TOTAL: CounterVec =
        register_counter_vec!("sip2gate_handler_errors_total", "Total number of handler failures, labeled by command.", &["command"]).unwrap();
    /// Request ACS Resend messages answered.
    pub static ref RESEND_REQUESTS_TOTAL: Counter =
        register_counter!("sip2gate_resend_requests_total", "Total number of resend requests answered.").unwrap();

    // --- Tenant Counters ---
    /// Successful tenant resolutions, labeled by the resolver that matched.
    pub static ref TENANT_RESOLUTIONS_TOTAL: CounterVec =
        register_counter_vec!("sip2gate_tenant_resolutions_total", "Total number of tenant resolutions, labeled by resolver.", &["resolver"]).unwrap();

    // --- Histograms ---
    /// A histogram of handler dispatch latencies.
    pub static ref DISPATCH_LATENCY_SECONDS: Histogram =
        register_histogram!("sip2gate_dispatch_latency_seconds", "Latency of request dispatch in seconds.").unwrap();
}

/// Gathers all registered metrics and encodes them in the Prometheus text format.
pub fn gather_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    encoder
        .encode_to_string(&metric_families)
        .unwrap_or_else(|e| {
            error!("Failed to encode metrics: {}", e);
            String::new()
        })
}
