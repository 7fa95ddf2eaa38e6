//! Prometheus metrics for QMS observability.

use metrics::{counter, histogram};

/// Initialize metrics exporter (Prometheus).
pub fn init_metrics() {
    let builder = metrics_exporter_prometheus::PrometheusBuilder::new();
    if let Err(e) = builder.install() {
        tracing::warn!("Failed to install Prometheus exporter: {}", e);
    }
}

/// Record a newly created record of `entity` (audit, risk, nonconformance, ...).
pub fn record_created(entity: &str) {
    counter!("qms_records_created_total", "entity" => entity.to_string()).increment(1);
}

/// Record a status transition on a tracked record.
pub fn status_changed(entity: &str, status: &str) {
    counter!(
        "qms_status_changes_total",
        "entity" => entity.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

/// Record a sign-in attempt and its outcome.
pub fn sign_in(outcome: &str) {
    counter!("qms_sign_ins_total", "outcome" => outcome.to_string()).increment(1);
}

/// Record a failed request by status class.
pub fn request_failed(status: &str) {
    counter!("qms_request_failures_total", "status" => status.to_string()).increment(1);
}

/// Record the number of rows written to a CSV export.
pub fn export_rows(entity: &str, rows: usize) {
    histogram!("qms_export_rows", "entity" => entity.to_string()).record(rows as f64);
}
