// crates/core/src/housekeeping.rs
//! Age-based sweep of the shared output directory.

use std::path::Path;
use std::time::{Duration, SystemTime};

/// Files older than this are swept before each new job.
pub const DEFAULT_MAX_FILE_AGE: Duration = Duration::from_secs(60 * 60);

/// Outcome of one sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub removed: Vec<String>,
    pub failures: usize,
}

/// Delete every regular file in `dir` last modified more than `max_age` ago.
///
/// Never fails: scan and delete errors are logged and counted in
/// [`SweepReport::failures`]. Subdirectories are left alone. A file being
/// written by a concurrent job is only at risk if its mtime is already
/// older than `max_age`.
pub async fn sweep_stale_files(dir: &Path, max_age: Duration) -> SweepReport {
    let mut report = SweepReport::default();
    let now = SystemTime::now();

    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) => {
            tracing::warn!(dir = %dir.display(), error = %e, "housekeeping: cannot scan output dir");
            report.failures += 1;
            return report;
        }
    };

    loop {
        let entry = match entries.next_entry().await {
            Ok(Some(entry)) => entry,
            Ok(None) => break,
            Err(e) => {
                tracing::warn!(dir = %dir.display(), error = %e, "housekeeping: scan interrupted");
                report.failures += 1;
                break;
            }
        };
        let path = entry.path();

        let modified = match entry.metadata().await {
            Ok(meta) if meta.is_file() => meta.modified(),
            Ok(_) => continue,
            // Deleted underneath us, most likely by another job's sweep.
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
            Err(e) => Err(e),
        };
        let age = match modified {
            Ok(mtime) => now.duration_since(mtime).unwrap_or_default(),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "housekeeping: cannot stat file");
                report.failures += 1;
                continue;
            }
        };
        if age <= max_age {
            continue;
        }

        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                let name = entry.file_name().to_string_lossy().into_owned();
                tracing::info!(file = %name, age_secs = age.as_secs(), "housekeeping: removed stale file");
                report.removed.push(name);
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "housekeeping: cannot remove file");
                report.failures += 1;
            }
        }
    }

    report
}
