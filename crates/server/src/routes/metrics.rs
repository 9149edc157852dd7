// crates/server/src/routes/metrics.rs
//! `GET /metrics`: scrape target for the download counters.

use std::sync::Arc;

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};

use crate::metrics::{record_jobs_snapshot, render_metrics};
use crate::state::AppState;

const PROMETHEUS_TEXT: &str = "text/plain; version=0.0.4; charset=utf-8";

/// Job gauges are sampled at scrape time, then everything is rendered.
/// 503 until the recorder is installed.
pub async fn metrics_handler(State(state): State<Arc<AppState>>) -> Response {
    record_jobs_snapshot(state.store.len(), state.runner.in_flight());
    match render_metrics() {
        Some(text) => (StatusCode::OK, [(header::CONTENT_TYPE, PROMETHEUS_TEXT)], text).into_response(),
        None => (StatusCode::SERVICE_UNAVAILABLE, "metrics recorder not installed").into_response(),
    }
}

/// Mounted at the root, outside `/api`.
pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/metrics", get(metrics_handler))
}
