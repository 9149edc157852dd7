// crates/server/src/lib.rs
//! ytgrab server library.
//!
//! Axum HTTP surface over an in-memory job table and a background
//! downloader that drives yt-dlp as a subprocess.

pub mod config;
pub mod downloader;
pub mod error;
pub mod metrics;
pub mod routes;
pub mod state;
pub mod tool;

pub use config::{Config, LogFormat};
pub use downloader::{DownloadError, DownloadRunner, JobHandle, RunnerConfig};
pub use error::*;
pub use metrics::init_metrics;
pub use routes::api_routes;
pub use state::AppState;
pub use tool::ToolCommand;

use std::path::Path;
use std::sync::Arc;

use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

/// Create the Axum application with all routes and middleware (API only).
pub fn create_app(state: Arc<AppState>) -> Router {
    create_app_full(state, None)
}

/// Create the Axum application, optionally serving the web UI from
/// `static_dir` for every path the API does not claim.
pub fn create_app_full(state: Arc<AppState>, static_dir: Option<&Path>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let mut app = Router::new().merge(api_routes(state));
    if let Some(dir) = static_dir {
        tracing::info!(dir = %dir.display(), "serving static files");
        app = app.fallback_service(ServeDir::new(dir));
    }

    app.layer(cors).layer(TraceLayer::new_for_http())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use tower::ServiceExt;
    use ytgrab_core::{JobStore, OutputDir};

    fn test_state(tool: &str, dir: &Path) -> Arc<AppState> {
        let store = Arc::new(JobStore::new());
        let config = RunnerConfig::new(ToolCommand::new(tool), OutputDir::new(dir));
        let runner = Arc::new(DownloadRunner::new(store.clone(), config));
        AppState::new(store, runner)
    }

    /// Helper to make a GET request to the app.
    async fn get(app: Router, uri: &str) -> (StatusCode, String) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();

        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, String::from_utf8(body.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn test_health_endpoint_response_structure() {
        let tmp = tempfile::tempdir().unwrap();
        let app = create_app(test_state("yt-dlp", tmp.path()));
        let (status, body) = get(app, "/api/health").await;

        assert_eq!(status, StatusCode::OK);
        let json: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(json["status"], "ok");
        assert!(json["version"].is_string());
        assert!(json["uptime_secs"].is_number());
        assert_eq!(json["jobs"], 0);
    }

    #[tokio::test]
    async fn test_unknown_download_is_404() {
        let tmp = tempfile::tempdir().unwrap();
        let app = create_app(test_state("yt-dlp", tmp.path()));
        let (status, body) = get(app, "/api/downloads/12345").await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        let json: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(json["error"], "Download not found");
    }

    #[tokio::test]
    async fn test_non_numeric_id_is_400() {
        let tmp = tempfile::tempdir().unwrap();
        let app = create_app(test_state("yt-dlp", tmp.path()));
        let (status, _) = get(app, "/api/downloads/abc").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_check_ytdlp_reports_missing_tool() {
        let tmp = tempfile::tempdir().unwrap();
        let app = create_app(test_state("ytgrab-no-such-program", tmp.path()));
        let (status, body) = get(app, "/api/check-ytdlp").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, r#"{"available":false}"#);
    }

    #[tokio::test]
    async fn test_static_fallback() {
        let tmp = tempfile::tempdir().unwrap();
        let web = tempfile::tempdir().unwrap();
        std::fs::write(web.path().join("index.html"), "<h1>ytgrab</h1>").unwrap();

        let app = create_app_full(test_state("yt-dlp", tmp.path()), Some(web.path()));
        let (status, body) = get(app.clone(), "/index.html").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "<h1>ytgrab</h1>");

        // API routes still win over the fallback.
        let (status, _) = get(app, "/api/health").await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_no_static_dir_means_404() {
        let tmp = tempfile::tempdir().unwrap();
        let app = create_app(test_state("yt-dlp", tmp.path()));
        let (status, _) = get(app, "/index.html").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_cors_allows_any_origin() {
        let tmp = tempfile::tempdir().unwrap();
        let app = create_app(test_state("yt-dlp", tmp.path()));

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/health")
                    .header("Origin", "http://example.com")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        let allow_origin = response
            .headers()
            .get("access-control-allow-origin")
            .expect("CORS header present");
        assert_eq!(allow_origin, "*");
    }
}
