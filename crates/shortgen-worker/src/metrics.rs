//! Prometheus metrics for the worker.

use std::net::SocketAddr;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use shortgen_models::HighlightSource;

use crate::error::{WorkerError, WorkerResult};

/// Install the Prometheus recorder and serve `/metrics` on `addr`.
///
/// Must be called from within a tokio runtime.
pub fn init_metrics(addr: &str) -> WorkerResult<()> {
    let addr: SocketAddr = addr
        .parse()
        .map_err(|e| WorkerError::config_error(format!("invalid METRICS_ADDR '{}': {}", addr, e)))?;

    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| WorkerError::config_error(format!("failed to start metrics exporter: {}", e)))
}

/// Metric names as constants for consistency.
pub mod names {
    // Job lifecycle
    pub const JOBS_ENQUEUED_TOTAL: &str = "shortgen_jobs_enqueued_total";
    pub const JOBS_COMPLETED_TOTAL: &str = "shortgen_jobs_completed_total";
    pub const JOBS_FAILED_TOTAL: &str = "shortgen_jobs_failed_total";
    pub const JOBS_CANCELLED_TOTAL: &str = "shortgen_jobs_cancelled_total";
    pub const JOBS_IN_FLIGHT: &str = "shortgen_jobs_in_flight";
    pub const JOB_DURATION_SECONDS: &str = "shortgen_job_duration_seconds";

    // Pipeline
    pub const STAGE_DURATION_SECONDS: &str = "shortgen_stage_duration_seconds";
    pub const HIGHLIGHTS_TOTAL: &str = "shortgen_highlights_total";

    // Uploads
    pub const UPLOADS_TOTAL: &str = "shortgen_uploads_total";
}

pub fn record_job_enqueued() {
    counter!(names::JOBS_ENQUEUED_TOTAL).increment(1);
}

pub fn record_job_completed(duration_secs: f64) {
    counter!(names::JOBS_COMPLETED_TOTAL).increment(1);
    histogram!(names::JOB_DURATION_SECONDS).record(duration_secs);
}

pub fn record_job_failed(reason: &str) {
    let labels = [("reason", reason.to_string())];
    counter!(names::JOBS_FAILED_TOTAL, &labels).increment(1);
}

pub fn record_job_cancelled() {
    counter!(names::JOBS_CANCELLED_TOTAL).increment(1);
}

pub fn set_jobs_in_flight(count: usize) {
    gauge!(names::JOBS_IN_FLIGHT).set(count as f64);
}

/// Record how long one pipeline stage took.
pub fn record_stage_duration(stage: &str, duration_secs: f64) {
    let labels = [("stage", stage.to_string())];
    histogram!(names::STAGE_DURATION_SECONDS, &labels).record(duration_secs);
}

/// Count a selected highlight by the tier that produced it.
pub fn record_highlight(source: HighlightSource) {
    let labels = [("tier", source.as_str().to_string())];
    counter!(names::HIGHLIGHTS_TOTAL, &labels).increment(1);
}

pub fn record_upload(success: bool) {
    let labels = [("status", if success { "ok" } else { "error" }.to_string())];
    counter!(names::UPLOADS_TOTAL, &labels).increment(1);
}
