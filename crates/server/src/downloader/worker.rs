// crates/server/src/downloader/worker.rs
//! The procedure run for one job: prepare, spawn, scan output, settle.

use std::sync::Arc;
use std::time::Instant;

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, BufReader};
use tokio::sync::mpsc;
use ytgrab_core::output::LineBuffer;
use ytgrab_core::{JobId, OutputParser, OUTPUT_EXTENSION};

use super::events::{DownloadError, JobEvent};
use super::RunnerConfig;
use crate::metrics::{record_download_finished, record_housekeeping};

/// Name recorded when the process succeeded but no file could be located.
pub(crate) const FALLBACK_FILENAME: &str = "download.mp4";

const READ_CHUNK: usize = 8 * 1024;

/// Shared, cloneable context handed to every job task.
#[derive(Clone)]
pub(crate) struct Worker {
    pub config: Arc<RunnerConfig>,
    pub parser: Arc<dyn OutputParser>,
    pub events: mpsc::UnboundedSender<JobEvent>,
}

impl Worker {
    pub fn emit(&self, event: JobEvent) {
        // The applier only stops once every sender is gone.
        let _ = self.events.send(event);
    }

    /// Log, count and report a terminal outcome.
    pub fn settle(&self, id: JobId, t0: Instant, outcome: Result<String, DownloadError>) {
        let elapsed = t0.elapsed();
        match &outcome {
            Ok(filename) => {
                tracing::info!(job_id = id, file = %filename, elapsed_ms = elapsed.as_millis() as u64, "download completed");
                record_download_finished("completed", elapsed);
            }
            Err(e) => {
                tracing::warn!(job_id = id, kind = e.kind(), error = ?e, elapsed_ms = elapsed.as_millis() as u64, "download failed");
                record_download_finished(e.kind(), elapsed);
            }
        }
        self.emit(JobEvent::Finished(id, outcome));
    }

    /// Prepare the output directory, run the downloader, and work out
    /// which file it produced.
    pub async fn download(&self, id: JobId, url: &str) -> Result<String, DownloadError> {
        let dir = &self.config.output_dir;
        dir.ensure()
            .await
            .map_err(|e| DownloadError::Internal(e.to_string()))?;

        let swept = dir.sweep(self.config.max_file_age).await;
        if swept.failures > 0 {
            tracing::warn!(job_id = id, removed = swept.removed.len(), failures = swept.failures, "housekeeping left stale entries behind");
        }
        record_housekeeping(swept.removed.len());

        self.emit(JobEvent::Started(id));

        let mut child = self
            .config
            .tool
            .download(&dir.template(), url)
            .spawn()
            .map_err(|e| {
                tracing::error!(job_id = id, program = %self.config.tool.program(), error = %e, "downloader: failed to spawn");
                DownloadError::ToolMissing(e)
            })?;
        tracing::info!(job_id = id, pid = ?child.id(), "downloader: spawned");

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| DownloadError::Internal("failed to capture stdout".to_string()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| DownloadError::Internal("failed to capture stderr".to_string()))?;

        let (captured, ()) = tokio::join!(self.scan_stdout(id, stdout), log_stderr(id, stderr));

        let status = child
            .wait()
            .await
            .map_err(|e| DownloadError::Internal(format!("failed to wait for downloader: {e}")))?;

        if !status.success() {
            return Err(DownloadError::ProcessFailed {
                exit_code: status.code(),
            });
        }

        if let Some(filename) = captured {
            return Ok(filename);
        }
        tracing::debug!(job_id = id, "no filename in output, scanning output dir");
        match dir.latest_with_extension(OUTPUT_EXTENSION).await {
            Some(filename) => Ok(filename),
            None if self.config.strict_output => Err(DownloadError::MissingOutput),
            None => {
                tracing::warn!(job_id = id, "no output file found, using placeholder name");
                Ok(FALLBACK_FILENAME.to_string())
            }
        }
    }

    /// Feed stdout through the parser, reporting progress as it changes.
    /// Returns the last filename seen.
    async fn scan_stdout(&self, id: JobId, mut stdout: impl AsyncRead + Unpin) -> Option<String> {
        let mut buf = vec![0u8; READ_CHUNK];
        let mut lines = LineBuffer::new();
        let mut scan = Scan::default();

        loop {
            let n = match stdout.read(&mut buf).await {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) => {
                    tracing::warn!(job_id = id, error = %e, "downloader: stdout read failed");
                    break;
                }
            };
            let text = lines.push(&buf[..n]);
            if !text.is_empty() {
                tracing::trace!(job_id = id, output = %text.trim_end(), "downloader stdout");
                self.observe(id, &text, &mut scan);
            }
        }
        let rest = lines.finish();
        self.observe(id, &rest, &mut scan);

        scan.filename
    }

    fn observe(&self, id: JobId, text: &str, scan: &mut Scan) {
        let parsed = self.parser.parse(text);
        if let Some(pct) = parsed.progress {
            if scan.progress != Some(pct) {
                scan.progress = Some(pct);
                self.emit(JobEvent::Progress(id, pct));
            }
        }
        if let Some(filename) = parsed.filename {
            tracing::debug!(job_id = id, file = %filename, "downloader: output file named");
            scan.filename = Some(filename);
        }
    }
}

#[derive(Default)]
struct Scan {
    progress: Option<u8>,
    filename: Option<String>,
}

/// Diagnostic only: stderr is never parsed for state.
async fn log_stderr(id: JobId, stderr: impl AsyncRead + Unpin) {
    let mut reader = BufReader::new(stderr);
    let mut line = Vec::new();
    loop {
        line.clear();
        match reader.read_until(b'\n', &mut line).await {
            Ok(0) => break,
            Ok(_) => {
                let text = String::from_utf8_lossy(&line);
                tracing::debug!(job_id = id, line = %text.trim_end(), "downloader stderr");
            }
            Err(e) => {
                tracing::warn!(job_id = id, error = %e, "downloader: stderr read failed");
                break;
            }
        }
    }
}
