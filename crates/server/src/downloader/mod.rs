// crates/server/src/downloader/mod.rs
//! Download job execution.
//!
//! Provides:
//! - `DownloadRunner`: spawns and tracks one task per job
//! - `JobHandle`: handle to a single running job
//! - `JobEvent`: progress/outcome messages applied to the job store
//! - `DownloadError`: why a job ended in `error`

pub mod events;
pub mod runner;
mod worker;

use std::time::Duration;

use ytgrab_core::{OutputDir, DEFAULT_MAX_FILE_AGE};

use crate::tool::ToolCommand;

pub use events::{DownloadError, JobEvent};
pub use runner::{DownloadRunner, JobHandle};

/// Everything a job needs besides its URL.
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    pub tool: ToolCommand,
    pub output_dir: OutputDir,
    /// Housekeeping threshold applied before each job.
    pub max_file_age: Duration,
    /// Treat "exited 0 but no output file" as a failure.
    pub strict_output: bool,
}

impl RunnerConfig {
    pub fn new(tool: ToolCommand, output_dir: OutputDir) -> Self {
        Self {
            tool,
            output_dir,
            max_file_age: DEFAULT_MAX_FILE_AGE,
            strict_output: false,
        }
    }
}
