// crates/server/src/state.rs
//! Application state for the Axum server.

use std::sync::Arc;
use std::time::Instant;

use ytgrab_core::{JobStore, OutputDir};

use crate::downloader::DownloadRunner;
use crate::tool::ToolCommand;

/// Shared application state accessible from all route handlers.
pub struct AppState {
    /// Server start time for uptime tracking.
    pub start_time: Instant,
    /// Every download job, keyed by id.
    pub store: Arc<JobStore>,
    /// Runs download jobs in the background.
    pub runner: Arc<DownloadRunner>,
}

impl AppState {
    /// Create a new application state wrapped in an Arc for sharing.
    pub fn new(store: Arc<JobStore>, runner: Arc<DownloadRunner>) -> Arc<Self> {
        Arc::new(Self {
            start_time: Instant::now(),
            store,
            runner,
        })
    }

    /// Get the server uptime in seconds.
    pub fn uptime_secs(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    pub fn output_dir(&self) -> &OutputDir {
        &self.runner.config().output_dir
    }

    pub fn tool(&self) -> &ToolCommand {
        &self.runner.config().tool
    }
}
