//! Prometheus metrics for the rental engine.
//!
//! Counters cover the money-moving paths: bookings created and cancelled,
//! payments settled, top-ups credited, and rejected gateway callbacks.

use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;

/// Install the Prometheus scrape endpoint at `addr`.
pub fn init_metrics(addr: SocketAddr) -> Result<(), String> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| format!("failed to install Prometheus exporter: {e}"))
}

pub fn booking_created() {
    metrics::counter!("rentfleet_bookings_created_total").increment(1);
}

pub fn booking_cancelled(no_show: bool) {
    let kind = if no_show { "no_show" } else { "requested" };
    metrics::counter!("rentfleet_bookings_cancelled_total", "kind" => kind).increment(1);
}

/// `method` is `gateway` or `wallet`.
pub fn payment_confirmed(method: &'static str) {
    metrics::counter!("rentfleet_payments_confirmed_total", "method" => method).increment(1);
}

pub fn top_up_credited() {
    metrics::counter!("rentfleet_top_ups_credited_total").increment(1);
}

pub fn callback_rejected(reason: &'static str) {
    metrics::counter!("rentfleet_callbacks_rejected_total", "reason" => reason).increment(1);
}
