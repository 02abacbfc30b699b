//! Prometheus metrics for import runs
//!
//! Tracks terminal run outcomes, reconciliation decisions, publish outcomes
//! and run duration.
//!
//! Call `init_metrics()` at application startup to register all metrics.
//! If initialization fails, metrics operations become no-ops.

use prometheus::{
    register_counter_vec, register_histogram_vec, CounterVec, Encoder, HistogramVec, TextEncoder,
};
use std::sync::OnceLock;

/// Container for all import metrics
struct ImportMetrics {
    runs: CounterVec,
    decisions: CounterVec,
    published: CounterVec,
    scheduled: CounterVec,
    run_duration: HistogramVec,
}

static IMPORT_METRICS: OnceLock<ImportMetrics> = OnceLock::new();

/// Flag to track if initialization was attempted
static METRICS_INIT_ATTEMPTED: OnceLock<bool> = OnceLock::new();

/// Initialize all Prometheus metrics
///
/// Safe to call more than once; later calls are no-ops.
///
/// ```ignore
/// if let Err(e) = jobsync::metrics::init_metrics() {
///     tracing::warn!(error = %e, "metrics disabled");
/// }
/// ```
pub fn init_metrics() -> Result<(), Box<dyn std::error::Error>> {
    if METRICS_INIT_ATTEMPTED.get().is_some() {
        return Ok(());
    }
    METRICS_INIT_ATTEMPTED.set(true).ok();

    let metrics = ImportMetrics {
        runs: register_counter_vec!(
            "jobsync_import_runs_total",
            "Import runs by terminal status",
            &["status"]
        )?,
        decisions: register_counter_vec!(
            "jobsync_job_decisions_total",
            "Reconciliation decisions by kind",
            &["decision"]
        )?,
        published: register_counter_vec!(
            "jobsync_jobs_published_total",
            "Job events by kind and outcome",
            &["kind", "outcome"]
        )?,
        scheduled: register_counter_vec!(
            "jobsync_imports_scheduled_total",
            "Scheduling attempts by outcome",
            &["outcome"]
        )?,
        run_duration: register_histogram_vec!(
            "jobsync_import_duration_seconds",
            "Wall time of an import run in seconds",
            &["status"],
            vec![0.5, 1.0, 5.0, 10.0, 30.0, 60.0, 120.0, 300.0, 600.0, 1800.0]
        )?,
    };

    IMPORT_METRICS
        .set(metrics)
        .map_err(|_| "Import metrics already initialized")?;

    tracing::info!("Prometheus metrics initialized successfully");
    Ok(())
}

/// Check if metrics have been initialized
pub fn metrics_initialized() -> bool {
    IMPORT_METRICS.get().is_some()
}

/// Encode all metrics to Prometheus text format
pub fn encode_metrics() -> Result<String, Box<dyn std::error::Error>> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    Ok(String::from_utf8(buffer)?)
}

/// Record a run reaching a terminal status
pub fn record_import_run(status: &str, duration_secs: f64) {
    let Some(m) = IMPORT_METRICS.get() else {
        return;
    };

    m.runs.with_label_values(&[status]).inc();
    m.run_duration
        .with_label_values(&[status])
        .observe(duration_secs);
}

pub fn record_decision(decision: &str) {
    if let Some(m) = IMPORT_METRICS.get() {
        m.decisions.with_label_values(&[decision]).inc();
    }
}

/// Record one job event publish attempt
pub fn record_publish(kind: &str, success: bool) {
    if let Some(m) = IMPORT_METRICS.get() {
        let outcome = if success { "ok" } else { "error" };
        m.published.with_label_values(&[kind, outcome]).inc();
    }
}

pub fn record_scheduled(success: bool) {
    if let Some(m) = IMPORT_METRICS.get() {
        let outcome = if success { "ok" } else { "error" };
        m.scheduled.with_label_values(&[outcome]).inc();
    }
}
