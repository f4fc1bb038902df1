//! Prometheus metrics for bill-service.
//!
//! Business counters are `prometheus` statics; the HTTP middleware records
//! through the `metrics` facade, rendered by the installed Prometheus recorder.

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::Lazy;
use prometheus::{
    register_counter_vec, register_histogram_vec, CounterVec, HistogramVec, TextEncoder,
};
use std::sync::OnceLock;

/// Global handle to the HTTP metrics recorder.
pub static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

pub static BILLS_CREATED: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "bill_bills_created_total",
        "Total number of bills created",
        &["status"]
    )
    .expect("Failed to register bills_created")
});

/// Payment submissions by outcome (ok, rejected, error).
pub static PAYMENTS_RECORDED: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "bill_payments_recorded_total",
        "Total number of payment submissions",
        &["status"]
    )
    .expect("Failed to register payments_recorded")
});

pub static PAYMENTS_REMOVED: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "bill_payments_removed_total",
        "Total number of payments removed",
        &["status"]
    )
    .expect("Failed to register payments_removed")
});

pub static SELECTION_ACTIONS: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "bill_selection_actions_total",
        "Total number of selection actions replayed",
        &["action"]
    )
    .expect("Failed to register selection_actions")
});

pub static ERRORS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "bill_errors_total",
        "Total number of errors by type",
        &["error_type"]
    )
    .expect("Failed to register errors_total")
});

pub static DB_QUERY_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "bill_db_query_duration_seconds",
        "Database query duration in seconds",
        &["operation"],
        vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0]
    )
    .expect("Failed to register db_query_duration")
});

/// Force the statics and install the HTTP recorder.
///
/// Safe to call more than once; only the first call installs a recorder.
pub fn init_metrics() {
    Lazy::force(&BILLS_CREATED);
    Lazy::force(&PAYMENTS_RECORDED);
    Lazy::force(&PAYMENTS_REMOVED);
    Lazy::force(&SELECTION_ACTIONS);
    Lazy::force(&ERRORS_TOTAL);
    Lazy::force(&DB_QUERY_DURATION);

    if METRICS_HANDLE.get().is_some() {
        return;
    }
    match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => {
            let _ = METRICS_HANDLE.set(handle);
        }
        Err(e) => tracing::warn!(error = %e, "Prometheus recorder not installed"),
    }
}

/// All metrics in Prometheus text format.
pub fn get_metrics() -> String {
    let encoder = TextEncoder::new();
    let mut output = encoder
        .encode_to_string(&prometheus::gather())
        .unwrap_or_default();

    if let Some(handle) = METRICS_HANDLE.get() {
        output.push_str(&handle.render());
    }
    output
}

pub fn record_error(error_type: &str) {
    ERRORS_TOTAL.with_label_values(&[error_type]).inc();
}

pub fn record_bill_created(status: &str) {
    BILLS_CREATED.with_label_values(&[status]).inc();
}

pub fn record_payment(status: &str) {
    PAYMENTS_RECORDED.with_label_values(&[status]).inc();
}

pub fn record_payment_removed(status: &str) {
    PAYMENTS_REMOVED.with_label_values(&[status]).inc();
}

pub fn record_selection_action(action: &str) {
    SELECTION_ACTIONS.with_label_values(&[action]).inc();
}
