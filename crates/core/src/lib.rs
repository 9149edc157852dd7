// crates/core/src/lib.rs
pub mod error;
pub mod housekeeping;
pub mod job;
pub mod output;
pub mod output_dir;
pub mod store;

pub use error::*;
pub use housekeeping::{sweep_stale_files, SweepReport, DEFAULT_MAX_FILE_AGE};
pub use job::*;
pub use output::{OutputParser, ParsedOutput, YtDlpTextParser};
pub use output_dir::{OutputDir, OUTPUT_EXTENSION};
pub use store::JobStore;
