// crates/core/src/store.rs
//! In-memory job registry.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::job::{Job, JobId, JobPatch};

/// Exclusive owner of every [`Job`] record.
///
/// Construct once at startup and share behind an `Arc`. Every operation
/// takes the map lock for its whole duration, so `update` is an atomic
/// read-modify-write. Nothing is persisted.
pub struct JobStore {
    next_id: AtomicU64,
    jobs: RwLock<HashMap<JobId, Job>>,
}

impl JobStore {
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            jobs: RwLock::new(HashMap::new()),
        }
    }

    /// Allocate a new id and store a `pending` job for `url`.
    pub fn create(&self, url: impl Into<String>) -> Job {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let job = Job::new(id, url);
        self.write().insert(id, job.clone());
        tracing::debug!(job_id = id, "job created");
        job
    }

    /// Current snapshot of a job.
    pub fn get(&self, id: JobId) -> Option<Job> {
        self.read().get(&id).cloned()
    }

    /// Merge `patch` into the stored record, unconditionally.
    pub fn update(&self, id: JobId, patch: JobPatch) -> Option<Job> {
        let mut jobs = self.write();
        let job = jobs.get_mut(&id)?;
        job.apply(patch);
        Some(job.clone())
    }

    /// Lifecycle-guarded update used by the download runner.
    ///
    /// A job in a terminal state is left untouched, and progress never
    /// goes down. Returns the resulting snapshot, or `None` if the id is
    /// unknown.
    pub fn advance(&self, id: JobId, mut patch: JobPatch) -> Option<Job> {
        let mut jobs = self.write();
        let job = jobs.get_mut(&id)?;
        if job.status.is_terminal() {
            tracing::debug!(job_id = id, status = %job.status, "ignoring update to finished job");
            return Some(job.clone());
        }
        if let Some(progress) = patch.progress {
            patch.progress = Some(progress.max(job.progress));
        }
        job.apply(patch);
        Some(job.clone())
    }

    /// Remove a job. Returns whether it existed.
    pub fn delete(&self, id: JobId) -> bool {
        self.write().remove(&id).is_some()
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<JobId, Job>> {
        self.jobs.read().unwrap_or_else(|e| {
            tracing::error!("RwLock poisoned reading jobs map: {e}");
            e.into_inner()
        })
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<JobId, Job>> {
        self.jobs.write().unwrap_or_else(|e| {
            tracing::error!("RwLock poisoned writing jobs map: {e}");
            e.into_inner()
        })
    }
}

impl Default for JobStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::JobStatus;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    #[test]
    fn test_create_assigns_increasing_ids() {
        let store = JobStore::new();
        let a = store.create("https://a");
        let b = store.create("https://b");
        assert!(b.id > a.id);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_ids_not_reused_after_delete() {
        let store = JobStore::new();
        let a = store.create("https://a");
        assert!(store.delete(a.id));
        let b = store.create("https://b");
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_get_missing_returns_none() {
        let store = JobStore::new();
        assert!(store.get(42).is_none());
    }

    #[test]
    fn test_update_merges_fields() {
        let store = JobStore::new();
        let job = store.create("https://a");
        let updated = store.update(job.id, JobPatch::progress(50)).unwrap();
        assert_eq!(updated.progress, 50);
        assert_eq!(updated.status, JobStatus::Pending);
        assert_eq!(updated.url, "https://a");
        assert_eq!(store.get(job.id).unwrap(), updated);
    }

    #[test]
    fn test_update_missing_returns_none() {
        let store = JobStore::new();
        assert!(store.update(9, JobPatch::progress(1)).is_none());
    }

    #[test]
    fn test_delete_reports_existence() {
        let store = JobStore::new();
        let job = store.create("https://a");
        assert!(store.delete(job.id));
        assert!(!store.delete(job.id));
        assert!(store.is_empty());
    }

    #[test]
    fn test_advance_never_leaves_terminal_state() {
        let store = JobStore::new();
        let job = store.create("https://a");
        store.advance(job.id, JobPatch::failed("nope"));
        let after = store.advance(job.id, JobPatch::completed("x.mp4")).unwrap();
        assert_eq!(after.status, JobStatus::Error);
        assert_eq!(after.error_message.as_deref(), Some("nope"));
    }

    #[test]
    fn test_advance_keeps_progress_monotonic() {
        let store = JobStore::new();
        let job = store.create("https://a");
        store.advance(job.id, JobPatch::progress(80));
        let after = store.advance(job.id, JobPatch::progress(3)).unwrap();
        assert_eq!(after.progress, 80);
    }

    #[test]
    fn test_update_is_unrestricted() {
        let store = JobStore::new();
        let job = store.create("https://a");
        store.update(job.id, JobPatch::completed("x.mp4"));
        let after = store.update(job.id, JobPatch::progress(10)).unwrap();
        assert_eq!(after.progress, 10);
    }

    #[test]
    fn test_concurrent_creates_yield_unique_ids() {
        let store = Arc::new(JobStore::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || (0..50).map(|_| store.create("u").id).collect::<Vec<_>>())
            })
            .collect();
        let mut ids: Vec<JobId> = handles.into_iter().flat_map(|h| h.join().unwrap()).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), 400);
        assert_eq!(store.len(), 400);
    }
}
