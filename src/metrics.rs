//! Prometheus metrics for shutdown observability.
//!
//! Recording goes through the `metrics` facade and is a no-op until an
//! exporter is installed with [`init_metrics`] (the binary does so when
//! `METRICS_PORT` is non-zero).
//!
//! # Available Metrics
//!
//! ## Counters
//! - `shutdown_sequences_total` - Shutdown sessions entered (label: trigger)
//! - `shutdown_cleanup_actions_total` - Cleanup actions run (label: status)
//! - `shutdown_errors_total` - Errors raised during a session (label: phase)
//!
//! ## Histograms
//! - `shutdown_cleanup_duration_seconds` - Duration of each cleanup action
//! - `shutdown_sequence_duration_seconds` - Time from session start to finalize

use std::net::SocketAddr;
use std::time::Duration;

use metrics::{counter, describe_counter, describe_histogram, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use tracing::info;

use crate::error::{CoordinatorError, CoordinatorResult};

/// Metric names as constants for consistency.
pub mod names {
    pub const SEQUENCES_TOTAL: &str = "shutdown_sequences_total";
    pub const CLEANUP_ACTIONS_TOTAL: &str = "shutdown_cleanup_actions_total";
    pub const ERRORS_TOTAL: &str = "shutdown_errors_total";
    pub const CLEANUP_DURATION_SECONDS: &str = "shutdown_cleanup_duration_seconds";
    pub const SEQUENCE_DURATION_SECONDS: &str = "shutdown_sequence_duration_seconds";
}

/// Install the Prometheus exporter and describe all metrics.
///
/// # Errors
///
/// Returns `CoordinatorError::Metrics` if the exporter cannot be installed
/// (port in use, recorder already set).
pub fn init_metrics(metrics_addr: SocketAddr) -> CoordinatorResult<()> {
    PrometheusBuilder::new()
        .with_http_listener(metrics_addr)
        .install()
        .map_err(|e| {
            CoordinatorError::Metrics(format!("Failed to install Prometheus exporter: {e}"))
        })?;

    describe_counter!(names::SEQUENCES_TOTAL, "Total number of shutdown sessions entered");
    describe_counter!(
        names::CLEANUP_ACTIONS_TOTAL,
        "Total number of cleanup actions run, by outcome"
    );
    describe_counter!(
        names::ERRORS_TOTAL,
        "Total number of errors raised during shutdown, by phase"
    );
    describe_histogram!(
        names::CLEANUP_DURATION_SECONDS,
        "Cleanup action duration in seconds"
    );
    describe_histogram!(
        names::SEQUENCE_DURATION_SECONDS,
        "Shutdown sequence duration up to finalize in seconds"
    );

    info!(addr = %metrics_addr, "Prometheus metrics endpoint started");
    Ok(())
}

pub fn record_sequence_started(trigger: &str) {
    counter!(names::SEQUENCES_TOTAL, "trigger" => trigger.to_string()).increment(1);
}

/// Record one cleanup action outcome (`success`, `failure` or `panic`).
pub fn record_cleanup(status: &'static str, duration: Duration) {
    counter!(names::CLEANUP_ACTIONS_TOTAL, "status" => status).increment(1);
    histogram!(names::CLEANUP_DURATION_SECONDS).record(duration.as_secs_f64());
}

pub fn record_error(phase: &'static str) {
    counter!(names::ERRORS_TOTAL, "phase" => phase).increment(1);
}

pub fn record_sequence_duration(duration: Duration) {
    histogram!(names::SEQUENCE_DURATION_SECONDS).record(duration.as_secs_f64());
}
