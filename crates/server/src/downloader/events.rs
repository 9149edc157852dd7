// crates/server/src/downloader/events.rs
//! Messages from running jobs to the job store.

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use ytgrab_core::{JobId, JobPatch, JobStatus, JobStore};

/// Why a download ended in `error`. `Display` is the user-facing message
/// stored on the job; causes are logged, not exposed.
#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("yt-dlp not found. See the installation guide.")]
    ToolMissing(#[source] std::io::Error),

    #[error("Download failed. Check that the URL is valid and that yt-dlp is installed.")]
    ProcessFailed { exit_code: Option<i32> },

    #[error("Download finished but no output file was found.")]
    MissingOutput,

    #[error("Download cancelled.")]
    Cancelled,

    #[error("Internal server error.")]
    Internal(String),
}

impl DownloadError {
    /// Short label for metrics and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            DownloadError::ToolMissing(_) => "tool_missing",
            DownloadError::ProcessFailed { .. } => "process_failed",
            DownloadError::MissingOutput => "missing_output",
            DownloadError::Cancelled => "cancelled",
            DownloadError::Internal(_) => "internal",
        }
    }
}

/// State change reported by a job task.
#[derive(Debug)]
pub enum JobEvent {
    Started(JobId),
    Progress(JobId, u8),
    /// Terminal outcome: the bare output file name, or why it failed.
    Finished(JobId, Result<String, DownloadError>),
    /// Acknowledged once every earlier event has been applied.
    Flush(oneshot::Sender<()>),
}

impl JobEvent {
    fn into_patch(self) -> Option<(JobId, JobPatch)> {
        match self {
            JobEvent::Started(id) => Some((id, JobPatch::status(JobStatus::Downloading))),
            JobEvent::Progress(id, pct) => Some((id, JobPatch::progress(pct))),
            JobEvent::Finished(id, Ok(filename)) => Some((id, JobPatch::completed(filename))),
            JobEvent::Finished(id, Err(e)) => Some((id, JobPatch::failed(e.to_string()))),
            JobEvent::Flush(ack) => {
                let _ = ack.send(());
                None
            }
        }
    }
}

/// Single writer for runner-originated updates: drains `rx` into `store`
/// until every sender is gone.
pub fn spawn_event_applier(
    store: Arc<JobStore>,
    mut rx: mpsc::UnboundedReceiver<JobEvent>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            let Some((id, patch)) = event.into_patch() else { continue };
            match store.advance(id, patch) {
                Some(job) if job.status.is_terminal() => {
                    tracing::debug!(job_id = id, status = %job.status, "job finished");
                }
                Some(_) => {}
                None => tracing::debug!(job_id = id, "event for unknown job dropped"),
            }
        }
    })
}
