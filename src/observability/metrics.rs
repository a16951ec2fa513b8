//! Metrics collection and exposition.
//!
//! # Metrics
//! - `panel_mutations_total` (counter): admin mutations by op, outcome
//! - `panel_engine_restarts_total` (counter): engine restarts by trigger, outcome
//! - `panel_engine_restart_duration_seconds` (histogram): restart latency
//!
//! Recording is a no-op until [`init_metrics`] installs the exporter.

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::PrometheusBuilder;

fn outcome(ok: bool) -> &'static str {
    if ok {
        "success"
    } else {
        "failure"
    }
}

/// Start the Prometheus exporter on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_mutation(op: &'static str, ok: bool) {
    metrics::counter!("panel_mutations_total", "op" => op, "outcome" => outcome(ok)).increment(1);
}

pub fn record_restart(trigger: &'static str, ok: bool, start: Instant) {
    metrics::counter!(
        "panel_engine_restarts_total",
        "trigger" => trigger,
        "outcome" => outcome(ok)
    )
    .increment(1);
    metrics::histogram!("panel_engine_restart_duration_seconds", "trigger" => trigger)
        .record(start.elapsed().as_secs_f64());
}
