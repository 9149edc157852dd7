// crates/server/src/downloader/runner.rs
//! Central runner that owns every in-flight download task.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use ytgrab_core::{JobId, JobStore, OutputParser, YtDlpTextParser};

use super::events::{spawn_event_applier, DownloadError, JobEvent};
use super::worker::Worker;
use super::RunnerConfig;
use crate::metrics::record_download_started;

/// Handle to one started download.
///
/// Dropping it leaves the job running; `cancel` kills the process and
/// ends the job in `error`.
#[derive(Debug)]
pub struct JobHandle {
    pub id: JobId,
    cancel: CancellationToken,
}

impl JobHandle {
    /// Abandon the job. Returns false if it was already cancelled.
    pub fn cancel(self) -> bool {
        if self.cancel.is_cancelled() {
            return false;
        }
        self.cancel.cancel();
        true
    }
}

/// Spawns one tracked task per job and funnels their state changes into
/// the [`JobStore`] through a single event-applier task.
///
/// Jobs run detached from the request that created them. `shutdown`
/// waits for them for a grace period, then abandons the rest.
pub struct DownloadRunner {
    worker: Worker,
    tasks: TaskTracker,
    shutdown: CancellationToken,
}

impl DownloadRunner {
    /// Must be called inside a tokio runtime.
    pub fn new(store: Arc<JobStore>, config: RunnerConfig) -> Self {
        Self::with_parser(store, config, YtDlpTextParser)
    }

    pub fn with_parser(
        store: Arc<JobStore>,
        config: RunnerConfig,
        parser: impl OutputParser,
    ) -> Self {
        let (events, rx) = mpsc::unbounded_channel();
        spawn_event_applier(store, rx);
        Self {
            worker: Worker {
                config: Arc::new(config),
                parser: Arc::new(parser),
                events,
            },
            tasks: TaskTracker::new(),
            shutdown: CancellationToken::new(),
        }
    }

    pub fn config(&self) -> &RunnerConfig {
        &self.worker.config
    }

    /// Start downloading `url` for job `id` and return immediately.
    ///
    /// After `shutdown` has begun the job is failed straight away.
    pub fn start(&self, id: JobId, url: impl Into<String>) -> JobHandle {
        let url = url.into();
        let cancel = self.shutdown.child_token();
        let handle = JobHandle {
            id,
            cancel: cancel.clone(),
        };

        if self.tasks.is_closed() {
            tracing::warn!(job_id = id, "runner shutting down, refusing job");
            self.worker.settle(id, Instant::now(), Err(DownloadError::Cancelled));
            return handle;
        }

        record_download_started();
        tracing::info!(job_id = id, url = %url, "download queued");

        let worker = self.worker.clone();
        self.tasks.spawn(async move {
            let t0 = Instant::now();
            let outcome = tokio::select! {
                outcome = worker.download(id, &url) => outcome,
                () = cancel.cancelled() => Err(DownloadError::Cancelled),
            };
            worker.settle(id, t0, outcome);
        });

        handle
    }

    /// Number of download tasks still running.
    pub fn in_flight(&self) -> usize {
        self.tasks.len()
    }

    /// Wait until every event sent so far has reached the store.
    pub async fn flush(&self) {
        let (tx, rx) = oneshot::channel();
        self.worker.emit(JobEvent::Flush(tx));
        let _ = rx.await;
    }

    /// Stop accepting jobs, give running ones `grace` to finish, then
    /// kill whatever is left. Returns once every job has a terminal state.
    pub async fn shutdown(&self, grace: Duration) {
        self.tasks.close();
        if tokio::time::timeout(grace, self.tasks.wait()).await.is_err() {
            tracing::warn!(in_flight = self.tasks.len(), "abandoning running downloads");
            self.shutdown.cancel();
            self.tasks.wait().await;
        }
        self.flush().await;
        tracing::info!("download runner stopped");
    }
}
