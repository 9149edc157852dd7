// crates/server/src/routes/tool.rs
//! GET /check-ytdlp: is the downloader installed and runnable?

use std::sync::Arc;

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;

use crate::state::AppState;
use crate::tool::PROBE_TIMEOUT;

#[derive(Debug, Serialize)]
#[cfg_attr(test, derive(serde::Deserialize))]
pub struct ToolStatus {
    pub available: bool,
}

/// GET /api/check-ytdlp
///
/// A probe that errors or outlives [`PROBE_TIMEOUT`] reports `false`.
pub async fn check_ytdlp(State(state): State<Arc<AppState>>) -> Json<ToolStatus> {
    let available = state.tool().probe(PROBE_TIMEOUT).await;
    Json(ToolStatus { available })
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/check-ytdlp", get(check_ytdlp))
}
