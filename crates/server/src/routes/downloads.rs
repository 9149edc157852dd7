// crates/server/src/routes/downloads.rs
//! Download job routes.
//!
//! - POST  /downloads: create a job and start it in the background
//! - GET   /downloads/{id}: poll a job
//! - PATCH /downloads/{id}: overwrite job fields directly
//! - GET   /downloads/{id}/file: fetch the finished file, once

use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    body::{Body, Bytes},
    extract::{rejection::JsonRejection, Path, State},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use futures_util::StreamExt;
use serde::Deserialize;
use tokio_util::io::ReaderStream;
use ytgrab_core::{Job, JobId, JobPatch, JobStatus, JobStore};

use crate::error::{ApiError, ApiResult, FieldError};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateDownloadRequest {
    #[serde(default)]
    pub url: Option<String>,
}

impl CreateDownloadRequest {
    fn validate(self) -> Result<String, ApiError> {
        match self.url.map(|u| u.trim().to_string()) {
            Some(url) if !url.is_empty() => Ok(url),
            Some(_) => Err(ApiError::Validation(vec![FieldError::new(
                "url",
                "URL must not be empty",
            )])),
            None => Err(ApiError::Validation(vec![FieldError::new(
                "url",
                "URL is required",
            )])),
        }
    }
}

fn parse_id(raw: &str) -> ApiResult<JobId> {
    raw.parse()
        .map_err(|_| ApiError::BadRequest(format!("invalid download id: {raw}")))
}

fn json_body<T>(body: Result<Json<T>, JsonRejection>) -> ApiResult<T> {
    body.map(|Json(v)| v)
        .map_err(|rejection| ApiError::BadRequest(rejection.body_text()))
}

/// POST /api/downloads
async fn create_download(
    State(state): State<Arc<AppState>>,
    body: Result<Json<CreateDownloadRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Job>)> {
    let url = json_body(body)?.validate()?;

    let job = state.store.create(&url);
    tracing::info!(job_id = job.id, url = %url, "download requested");
    // The handle is dropped: the job keeps running on its own.
    let _ = state.runner.start(job.id, url);

    Ok((StatusCode::CREATED, Json(job)))
}

/// GET /api/downloads/{id}
async fn get_download(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<Job>> {
    let id = parse_id(&id)?;
    state
        .store
        .get(id)
        .map(Json)
        .ok_or(ApiError::DownloadNotFound(id))
}

/// PATCH /api/downloads/{id}
///
/// Unrestricted: lifecycle rules do not apply here.
async fn patch_download(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    body: Result<Json<serde_json::Value>, JsonRejection>,
) -> ApiResult<Json<Job>> {
    let id = parse_id(&id)?;
    let patch = parse_patch(json_body(body)?)?;
    if patch.is_empty() {
        tracing::debug!(job_id = id, "patch carries no mutable fields");
        return state.store.get(id).map(Json).ok_or(ApiError::DownloadNotFound(id));
    }
    state
        .store
        .update(id, patch)
        .map(Json)
        .ok_or(ApiError::DownloadNotFound(id))
}

fn parse_patch(value: serde_json::Value) -> ApiResult<JobPatch> {
    if !value.is_object() {
        return Err(ApiError::BadRequest("expected a JSON object".to_string()));
    }

    let mut errors = Vec::new();
    if let Some(progress) = value.get("progress") {
        if !progress.as_u64().is_some_and(|p| p <= 100) {
            errors.push(FieldError::new(
                "progress",
                "progress must be an integer between 0 and 100",
            ));
        }
    }
    if let Some(status) = value.get("status") {
        if serde_json::from_value::<JobStatus>(status.clone()).is_err() {
            errors.push(FieldError::new(
                "status",
                "status must be one of pending, downloading, completed, error",
            ));
        }
    }
    for field in ["filename", "errorMessage"] {
        if value.get(field).is_some_and(|v| !(v.is_null() || v.is_string())) {
            errors.push(FieldError::new(field, "must be a string or null"));
        }
    }
    if !errors.is_empty() {
        return Err(ApiError::Validation(errors));
    }

    serde_json::from_value(value).map_err(|e| ApiError::BadRequest(e.to_string()))
}

/// GET /api/downloads/{id}/file
///
/// Streams the finished file. Once the last byte has been handed to the
/// client the file and the job record are both removed.
async fn download_file(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Response> {
    let id = parse_id(&id)?;
    let job = state.store.get(id).ok_or(ApiError::DownloadNotFound(id))?;

    let filename = match (&job.status, &job.filename) {
        (JobStatus::Completed, Some(name)) => name.clone(),
        _ => return Err(ApiError::FileNotFound(id)),
    };
    let path = state.output_dir().resolve(&filename).ok_or_else(|| {
        tracing::warn!(job_id = id, file = %filename, "refusing to serve non-bare filename");
        ApiError::FileNotFound(id)
    })?;

    let file = match tokio::fs::File::open(&path).await {
        Ok(f) => f,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(ApiError::FileNotFound(id))
        }
        Err(e) => return Err(ApiError::Internal(format!("open {}: {e}", path.display()))),
    };

    tracing::info!(job_id = id, file = %filename, "serving download");
    let body = Body::from_stream(serve_once(state.store.clone(), id, path, file));

    let mut response = (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "application/octet-stream")],
        body,
    )
        .into_response();
    if let Ok(value) = HeaderValue::from_str(&content_disposition(&filename)) {
        response
            .headers_mut()
            .insert(header::CONTENT_DISPOSITION, value);
    }
    Ok(response)
}

/// Yield the file's bytes, then clean up. Nothing is removed if reading
/// fails or the client goes away before the stream is drained.
fn serve_once(
    store: Arc<JobStore>,
    id: JobId,
    path: PathBuf,
    file: tokio::fs::File,
) -> impl futures_util::Stream<Item = std::io::Result<Bytes>> {
    async_stream::stream! {
        let mut chunks = ReaderStream::new(file);
        let mut complete = true;
        while let Some(chunk) = chunks.next().await {
            match chunk {
                Ok(bytes) => yield Ok(bytes),
                Err(e) => {
                    tracing::warn!(job_id = id, error = %e, "file read failed mid-transfer");
                    complete = false;
                    yield Err(e);
                    break;
                }
            }
        }
        if complete {
            if let Err(e) = tokio::fs::remove_file(&path).await {
                tracing::warn!(job_id = id, path = %path.display(), error = %e, "failed to remove served file");
            }
            store.delete(id);
            tracing::info!(job_id = id, "download served and removed");
        }
    }
}

/// `attachment` disposition with an ASCII fallback name and the exact
/// name in RFC 5987 form.
fn content_disposition(filename: &str) -> String {
    let fallback: String = filename
        .chars()
        .map(|c| match c {
            '"' | '\\' => '_',
            c if c.is_ascii() && !c.is_ascii_control() => c,
            _ => '_',
        })
        .collect();
    let mut encoded = String::with_capacity(filename.len());
    for b in filename.bytes() {
        if b.is_ascii_alphanumeric() || b"!#$&+-.^_`|~".contains(&b) {
            encoded.push(b as char);
        } else {
            encoded.push_str(&format!("%{b:02X}"));
        }
    }
    format!("attachment; filename=\"{fallback}\"; filename*=UTF-8''{encoded}")
}

/// Build the downloads router.
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/downloads", axum::routing::post(create_download))
        .route("/downloads/{id}", get(get_download).patch(patch_download))
        .route("/downloads/{id}/file", get(download_file))
}
