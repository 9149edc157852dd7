// crates/server/src/routes/mod.rs
//! API route handlers.

pub mod downloads;
pub mod health;
pub mod metrics;
pub mod tool;

use std::sync::Arc;

use axum::Router;

use crate::state::AppState;

/// Create the combined API router with all routes under /api prefix.
///
/// Routes:
/// - GET   /api/health - Health check
/// - GET   /api/check-ytdlp - Whether the downloader can be run
/// - POST  /api/downloads - Create a download job
/// - GET   /api/downloads/{id} - Poll a download job
/// - PATCH /api/downloads/{id} - Overwrite job fields
/// - GET   /api/downloads/{id}/file - Fetch the finished file, then forget it
/// - GET   /metrics - Prometheus metrics (no /api prefix)
pub fn api_routes(state: Arc<AppState>) -> Router {
    Router::new()
        .nest("/api", health::router())
        .nest("/api", tool::router())
        .nest("/api", downloads::router())
        .merge(metrics::router())
        .with_state(state)
}
