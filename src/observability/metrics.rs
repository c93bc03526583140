//! Metrics collection and exposition.
//!
//! # Metrics
//! - `runtime_phase_total` (counter): lifecycle phases entered, by phase
//! - `runtime_tasks_launched_total` (counter): tasks launched into a supervised group
//! - `runtime_tasks_finished_total` (counter): task outcomes (completed, failed, aborted)
//! - `runtime_teardown_failures_total` (counter): failed teardown steps, by subsystem
//!
//! # Design Decisions
//! - Recording is a no-op until a recorder is installed
//! - The Prometheus endpoint is opt-in from the host

use std::net::SocketAddr;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its HTTP scrape listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics recorder"),
    }
}

pub fn record_phase(phase: &'static str) {
    metrics::counter!("runtime_phase_total", "phase" => phase).increment(1);
}

pub fn record_task_launched() {
    metrics::counter!("runtime_tasks_launched_total").increment(1);
}

pub fn record_task_outcome(outcome: &'static str) {
    metrics::counter!("runtime_tasks_finished_total", "outcome" => outcome).increment(1);
}

pub fn record_teardown_failure(subsystem: &'static str) {
    metrics::counter!("runtime_teardown_failures_total", "subsystem" => subsystem).increment(1);
}
