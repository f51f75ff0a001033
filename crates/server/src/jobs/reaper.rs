// crates/server/src/jobs/reaper.rs
//! Background reaper for abandoned and stuck jobs.
//!
//! Storage growth is bounded by removing every entry older than
//! [`JOB_EXPIRY`] on a fixed interval, regardless of status, and deleting
//! its artifact best-effort. A still-running fetcher for a reaped job is not
//! signalled from here: the controller notices the record is gone on its
//! next store update and kills the process itself.

use std::sync::Arc;
use std::time::Duration;

use super::store::JobStore;

/// Entries older than this are removed regardless of status.
pub const JOB_EXPIRY: Duration = Duration::from_secs(30 * 60);

/// How often the sweep runs.
pub const SWEEP_INTERVAL: Duration = Duration::from_secs(5 * 60);

/// Spawn the periodic sweep task. Runs for the life of the process.
pub fn spawn_reaper(store: Arc<JobStore>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticks = tokio::time::interval(SWEEP_INTERVAL);
        // The first tick fires immediately; nothing can be expired yet.
        ticks.tick().await;
        loop {
            ticks.tick().await;
            sweep(&store, JOB_EXPIRY).await;
        }
    })
}

/// Remove expired entries and their artifacts. Deletion failures are
/// swallowed — cleanup is best-effort.
pub async fn sweep(store: &JobStore, max_age: Duration) {
    for (id, job) in store.reap_expired(max_age) {
        match tokio::fs::remove_file(&job.artifact_path).await {
            Ok(()) => {
                tracing::info!(job_id = %id, status = ?job.status, path = %job.artifact_path.display(), "reaped expired job and artifact");
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(job_id = %id, status = ?job.status, "reaped expired job (no artifact)");
            }
            Err(e) => {
                tracing::warn!(job_id = %id, error = %e, "reaped expired job but artifact removal failed");
            }
        }
    }
}
