// crates/core/src/output_dir.rs
//! The shared directory the downloader writes into and files are served from.

use std::ffi::OsStr;
use std::path::{Component, Path, PathBuf};
use std::time::{Duration, SystemTime};

use crate::error::CoreError;
use crate::housekeeping::{sweep_stale_files, SweepReport};

/// yt-dlp output template: one file per video, named after its title.
pub const OUTPUT_TEMPLATE: &str = "%(title)s.%(ext)s";

/// Extension produced by the downloader's container policy.
pub const OUTPUT_EXTENSION: &str = "mp4";

/// Handle on the output directory. Cheap to clone.
#[derive(Debug, Clone)]
pub struct OutputDir {
    root: PathBuf,
}

impl OutputDir {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn path(&self) -> &Path {
        &self.root
    }

    /// Output path template passed to the downloader's `-o`.
    pub fn template(&self) -> PathBuf {
        self.root.join(OUTPUT_TEMPLATE)
    }

    /// Create the directory (and parents) if absent.
    pub async fn ensure(&self) -> Result<(), CoreError> {
        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|e| CoreError::io(&self.root, e))
    }

    pub async fn sweep(&self, max_age: Duration) -> SweepReport {
        sweep_stale_files(&self.root, max_age).await
    }

    /// Name of the most recently modified file with extension `ext`.
    pub async fn latest_with_extension(&self, ext: &str) -> Option<String> {
        let mut entries = match tokio::fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!(dir = %self.root.display(), error = %e, "cannot scan output dir");
                return None;
            }
        };

        let mut latest: Option<(SystemTime, String)> = None;
        while let Ok(Some(entry)) = entries.next_entry().await {
            let path = entry.path();
            if path.extension() != Some(OsStr::new(ext)) {
                continue;
            }
            let Ok(meta) = entry.metadata().await else { continue };
            let Ok(mtime) = meta.modified() else { continue };
            if !meta.is_file() {
                continue;
            }
            if latest.as_ref().map_or(true, |(best, _)| mtime > *best) {
                latest = Some((mtime, entry.file_name().to_string_lossy().into_owned()));
            }
        }
        latest.map(|(_, name)| name)
    }

    /// Absolute location of `filename`, provided it is a bare file name.
    ///
    /// Anything with a directory component, `.` or `..` is refused so a
    /// stored filename can never address a path outside the directory.
    pub fn resolve(&self, filename: &str) -> Option<PathBuf> {
        let mut components = Path::new(filename).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(name)), None) if name == OsStr::new(filename) => {
                Some(self.root.join(name))
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::{File, OpenOptions};
    use tempfile::TempDir;

    fn touch(dir: &Path, name: &str, age: Duration) {
        let path = dir.join(name);
        File::create(&path).unwrap();
        let file = OpenOptions::new().write(true).open(&path).unwrap();
        file.set_modified(SystemTime::now() - age).unwrap();
    }

    #[tokio::test]
    async fn test_ensure_creates_nested_dirs() {
        let tmp = TempDir::new().unwrap();
        let dir = OutputDir::new(tmp.path().join("a").join("b"));
        dir.ensure().await.unwrap();
        assert!(dir.path().is_dir());
        // idempotent
        dir.ensure().await.unwrap();
    }

    #[tokio::test]
    async fn test_latest_with_extension_picks_newest() {
        let tmp = TempDir::new().unwrap();
        touch(tmp.path(), "older.mp4", Duration::from_secs(600));
        touch(tmp.path(), "newer.mp4", Duration::from_secs(10));
        touch(tmp.path(), "newest.part", Duration::from_secs(1));

        let dir = OutputDir::new(tmp.path());
        assert_eq!(dir.latest_with_extension("mp4").await.as_deref(), Some("newer.mp4"));
    }

    #[tokio::test]
    async fn test_latest_with_extension_empty_dir() {
        let tmp = TempDir::new().unwrap();
        let dir = OutputDir::new(tmp.path());
        assert!(dir.latest_with_extension("mp4").await.is_none());
    }

    #[test]
    fn test_resolve_accepts_bare_names_only() {
        let dir = OutputDir::new("/srv/dl");
        assert_eq!(dir.resolve("movie.mp4"), Some(PathBuf::from("/srv/dl/movie.mp4")));
        assert_eq!(dir.resolve("My Clip (1).mp4"), Some(PathBuf::from("/srv/dl/My Clip (1).mp4")));
        assert!(dir.resolve("../etc/passwd").is_none());
        assert!(dir.resolve("/etc/passwd").is_none());
        assert!(dir.resolve("sub/movie.mp4").is_none());
        assert!(dir.resolve("..").is_none());
        assert!(dir.resolve("").is_none());
    }

    #[test]
    fn test_template_joins_root() {
        let dir = OutputDir::new("/srv/dl");
        assert_eq!(dir.template(), PathBuf::from("/srv/dl/%(title)s.%(ext)s"));
    }
}
