// crates/server/src/jobs/store.rs
//! Concurrent in-memory job registry.
//!
//! The store is the single arbiter of job truth: every component reads and
//! mutates through its operations, and no caller holds a lock across an
//! await point (reads hand out clones). Uses `std::sync::RwLock` — critical
//! sections are short and never suspend.

use std::collections::HashMap;
use std::sync::RwLock;
use std::time::{Duration, SystemTime};

use super::types::{Job, JobId, JobStatus};

/// Concurrent registry mapping job ids to job state.
pub struct JobStore {
    jobs: RwLock<HashMap<JobId, Job>>,
}

impl JobStore {
    pub fn new() -> Self {
        Self {
            jobs: RwLock::new(HashMap::new()),
        }
    }

    /// Register a new job. Returns `false` if the id is already present
    /// (the entry is left untouched).
    #[must_use]
    pub fn create(&self, id: JobId, job: Job) -> bool {
        match self.jobs.write() {
            Ok(mut jobs) => {
                if jobs.contains_key(&id) {
                    return false;
                }
                jobs.insert(id, job);
                true
            }
            Err(e) => {
                tracing::error!("RwLock poisoned creating job: {e}");
                false
            }
        }
    }

    /// Current snapshot of a job, or `None` if unknown.
    pub fn get(&self, id: &JobId) -> Option<Job> {
        match self.jobs.read() {
            Ok(jobs) => jobs.get(id).cloned(),
            Err(e) => {
                tracing::error!("RwLock poisoned reading job: {e}");
                None
            }
        }
    }

    /// Apply a mutation atomically. Returns `false` (a no-op) if the id is
    /// absent — the controller uses that signal to detect a reaped job.
    pub fn update<F>(&self, id: &JobId, mutate: F) -> bool
    where
        F: FnOnce(&mut Job),
    {
        match self.jobs.write() {
            Ok(mut jobs) => match jobs.get_mut(id) {
                Some(job) => {
                    mutate(job);
                    true
                }
                None => false,
            },
            Err(e) => {
                tracing::error!("RwLock poisoned updating job: {e}");
                false
            }
        }
    }

    /// Remove a job and return it. Idempotent: a second call returns `None`.
    pub fn take(&self, id: &JobId) -> Option<Job> {
        match self.jobs.write() {
            Ok(mut jobs) => jobs.remove(id),
            Err(e) => {
                tracing::error!("RwLock poisoned removing job: {e}");
                None
            }
        }
    }

    /// Remove and return a job only if it reached `Completed`. This is the
    /// artifact server's claim step: at most one caller can win, which is
    /// what makes artifact delivery exactly-once.
    pub fn claim_completed(&self, id: &JobId) -> Option<Job> {
        match self.jobs.write() {
            Ok(mut jobs) => {
                if jobs.get(id).map(|j| j.status) == Some(JobStatus::Completed) {
                    jobs.remove(id)
                } else {
                    None
                }
            }
            Err(e) => {
                tracing::error!("RwLock poisoned claiming job: {e}");
                None
            }
        }
    }

    /// Remove every entry whose id-embedded creation timestamp is older than
    /// `max_age`, regardless of status. Returns the removed entries so the
    /// caller can delete their artifacts.
    pub fn reap_expired(&self, max_age: Duration) -> Vec<(JobId, Job)> {
        let now = SystemTime::now();
        match self.jobs.write() {
            Ok(mut jobs) => {
                let expired: Vec<JobId> = jobs
                    .keys()
                    .filter(|id| {
                        now.duration_since(id.datetime())
                            .map(|age| age > max_age)
                            .unwrap_or(false)
                    })
                    .copied()
                    .collect();
                expired
                    .into_iter()
                    .filter_map(|id| jobs.remove(&id).map(|job| (id, job)))
                    .collect()
            }
            Err(e) => {
                tracing::error!("RwLock poisoned reaping jobs: {e}");
                Vec::new()
            }
        }
    }

    pub fn len(&self) -> usize {
        match self.jobs.read() {
            Ok(jobs) => jobs.len(),
            Err(e) => {
                tracing::error!("RwLock poisoned reading job count: {e}");
                0
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for JobStore {
    fn default() -> Self {
        Self::new()
    }
}
