// crates/core/src/job.rs
//! Download job record and the partial-update type used to mutate it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Unique identifier for a download job. Assigned monotonically, never reused.
pub type JobId = u64;

/// Lifecycle state of a download job.
///
/// `Completed` and `Error` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Downloading,
    Completed,
    Error,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Error)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Downloading => "downloading",
            JobStatus::Completed => "completed",
            JobStatus::Error => "error",
        }
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One user-initiated request to fetch one remote video.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub id: JobId,
    pub url: String,
    pub status: JobStatus,
    /// Percentage in `0..=100`.
    pub progress: u8,
    /// Bare file name inside the output directory. Set when `status = completed`.
    pub filename: Option<String>,
    /// Set when `status = error`.
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Job {
    /// A fresh job in the `pending` state.
    pub fn new(id: JobId, url: impl Into<String>) -> Self {
        Self {
            id,
            url: url.into(),
            status: JobStatus::Pending,
            progress: 0,
            filename: None,
            error_message: None,
            created_at: Utc::now(),
        }
    }

    /// Merge `patch` into this record. `id`, `url` and `created_at` are immutable.
    pub fn apply(&mut self, patch: JobPatch) {
        if let Some(status) = patch.status {
            self.status = status;
        }
        if let Some(progress) = patch.progress {
            self.progress = progress.min(100);
        }
        if let Some(filename) = patch.filename {
            self.filename = filename;
        }
        if let Some(error_message) = patch.error_message {
            self.error_message = error_message;
        }
    }
}

/// Partial set of mutable job fields.
///
/// For the nullable fields the outer `Option` says whether the field is
/// present at all; the inner one carries an explicit `null`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobPatch {
    #[serde(default)]
    pub status: Option<JobStatus>,
    #[serde(default)]
    pub progress: Option<u8>,
    #[serde(default, deserialize_with = "nullable")]
    pub filename: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub error_message: Option<Option<String>>,
}

impl JobPatch {
    pub fn status(status: JobStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    pub fn progress(progress: u8) -> Self {
        Self {
            progress: Some(progress),
            ..Self::default()
        }
    }

    pub fn completed(filename: impl Into<String>) -> Self {
        Self {
            status: Some(JobStatus::Completed),
            progress: Some(100),
            filename: Some(Some(filename.into())),
            error_message: Some(None),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            status: Some(JobStatus::Error),
            progress: None,
            filename: Some(None),
            error_message: Some(Some(message.into())),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.status.is_none()
            && self.progress.is_none()
            && self.filename.is_none()
            && self.error_message.is_none()
    }
}

/// Distinguishes an absent field (`None`) from an explicit `null` (`Some(None)`).
fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_new_job_is_pending() {
        let job = Job::new(7, "https://example.com/v");
        assert_eq!(job.id, 7);
        assert_eq!(job.status, JobStatus::Pending);
        assert_eq!(job.progress, 0);
        assert!(job.filename.is_none());
        assert!(job.error_message.is_none());
    }

    #[test]
    fn test_job_serializes_camel_case() {
        let job = Job::new(1, "https://example.com/v");
        let json = serde_json::to_value(&job).unwrap();
        assert_eq!(json["status"], "pending");
        assert_eq!(json["progress"], 0);
        assert!(json["filename"].is_null());
        assert!(json["errorMessage"].is_null());
        assert!(json["createdAt"].is_string());
    }

    #[test]
    fn test_patch_distinguishes_null_from_absent() {
        let patch: JobPatch = serde_json::from_str(r#"{"filename":null}"#).unwrap();
        assert_eq!(patch.filename, Some(None));
        assert_eq!(patch.error_message, None);

        let patch: JobPatch = serde_json::from_str(r#"{"progress":50}"#).unwrap();
        assert_eq!(patch, JobPatch::progress(50));
    }

    #[test]
    fn test_patch_ignores_immutable_fields() {
        let patch: JobPatch =
            serde_json::from_str(r#"{"id":99,"url":"x","createdAt":"2020-01-01T00:00:00Z"}"#)
                .unwrap();
        assert!(patch.is_empty());
    }

    #[test]
    fn test_apply_merges_only_present_fields() {
        let mut job = Job::new(1, "https://example.com/v");
        let before = job.clone();
        job.apply(JobPatch::progress(50));

        assert_eq!(job.progress, 50);
        assert_eq!(job.status, before.status);
        assert_eq!(job.url, before.url);
        assert_eq!(job.created_at, before.created_at);
    }

    #[test]
    fn test_completed_and_failed_patches() {
        let mut job = Job::new(1, "u");
        job.apply(JobPatch::completed("movie.mp4"));
        assert_eq!(job.status, JobStatus::Completed);
        assert_eq!(job.progress, 100);
        assert_eq!(job.filename.as_deref(), Some("movie.mp4"));

        let mut job = Job::new(2, "u");
        job.apply(JobPatch::failed("boom"));
        assert_eq!(job.status, JobStatus::Error);
        assert_eq!(job.error_message.as_deref(), Some("boom"));
        assert!(job.filename.is_none());
    }

    #[test]
    fn test_terminal_states() {
        assert!(!JobStatus::Pending.is_terminal());
        assert!(!JobStatus::Downloading.is_terminal());
        assert!(JobStatus::Completed.is_terminal());
        assert!(JobStatus::Error.is_terminal());
    }
}
