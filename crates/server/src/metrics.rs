//! Application metrics for Prometheus monitoring.
//!
//! This module provides:
//! - Prometheus metrics recorder initialization
//! - Metric definitions (counters, histograms)
//! - Helper functions for recording download metrics
//!
//! Recording before [`init_metrics`] is a no-op.

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;
use std::time::Duration;

/// Global Prometheus handle for rendering metrics.
static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Initialize the Prometheus metrics recorder.
///
/// Returns `true` if initialization succeeded, `false` if already initialized.
pub fn init_metrics() -> bool {
    if PROMETHEUS_HANDLE.get().is_some() {
        return false;
    }

    let recorder = PrometheusBuilder::new().build_recorder();
    let handle = recorder.handle();

    if metrics::set_global_recorder(recorder).is_err() {
        tracing::warn!("Failed to set global metrics recorder (already set)");
        return false;
    }

    if PROMETHEUS_HANDLE.set(handle).is_err() {
        tracing::warn!("Failed to store Prometheus handle (already set)");
    }

    describe_metrics();

    tracing::info!("Prometheus metrics initialized");
    true
}

fn describe_metrics() {
    describe_counter!("downloads_started_total", "Download jobs handed to the downloader");
    describe_counter!(
        "downloads_finished_total",
        "Download jobs that reached a terminal state, by outcome"
    );
    describe_histogram!(
        "download_duration_seconds",
        "Wall-clock time from job start to terminal state"
    );
    describe_gauge!("download_jobs", "Job records held in memory");
    describe_gauge!("downloads_in_flight", "Downloads whose process is still running");
    describe_counter!(
        "housekeeping_files_removed_total",
        "Stale files deleted from the output directory"
    );
}

/// Render current metrics in Prometheus text format.
///
/// Returns `None` if metrics are not initialized.
pub fn render_metrics() -> Option<String> {
    PROMETHEUS_HANDLE.get().map(|h| h.render())
}

pub fn record_download_started() {
    counter!("downloads_started_total").increment(1);
}

/// Record a terminal outcome (`"completed"` or a failure kind).
pub fn record_download_finished(outcome: &'static str, duration: Duration) {
    counter!("downloads_finished_total", "outcome" => outcome).increment(1);
    histogram!("download_duration_seconds", "outcome" => outcome).record(duration.as_secs_f64());
}

/// Point-in-time job counts, refreshed on each scrape.
pub fn record_jobs_snapshot(jobs: usize, in_flight: usize) {
    gauge!("download_jobs").set(jobs as f64);
    gauge!("downloads_in_flight").set(in_flight as f64);
}

pub fn record_housekeeping(files_removed: usize) {
    if files_removed > 0 {
        counter!("housekeeping_files_removed_total").increment(files_removed as u64);
    }
}
