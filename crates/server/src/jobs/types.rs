// crates/server/src/jobs/types.rs
//! Types for the download job system.

use std::path::PathBuf;

use serde::Serialize;
use ulid::Ulid;

/// Unique identifier for a download job.
///
/// ULIDs are time-sortable with the creation timestamp embedded, which is
/// what the reaper uses to find expired entries without a separate field.
pub type JobId = Ulid;

/// Status of a download job.
///
/// `Downloading` is the only non-terminal state; nothing transitions out of
/// `Completed` or `Error` except deletion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Downloading,
    Completed,
    Error,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Error)
    }
}

/// One download job. Mutable only through [`super::JobStore`].
#[derive(Debug, Clone)]
pub struct Job {
    pub status: JobStatus,
    /// Percentage in [0, 100], monotonically non-decreasing.
    pub progress: f32,
    /// Best-effort display strings; empty when unknown.
    pub speed: String,
    pub eta: String,
    /// Where the fetcher writes the output file.
    pub artifact_path: PathBuf,
    /// Output container extension (`mp4` or `mp3`).
    pub ext: &'static str,
    /// Source URL, echoed from the start request.
    pub url: String,
    /// Sanitized title, used for the download filename.
    pub title: String,
    /// Present only when `status == Error`.
    pub error: Option<String>,
}

impl Job {
    pub fn new(
        url: impl Into<String>,
        title: impl Into<String>,
        ext: &'static str,
        artifact_path: PathBuf,
    ) -> Self {
        Self {
            status: JobStatus::Downloading,
            progress: 0.0,
            speed: String::new(),
            eta: String::new(),
            artifact_path,
            ext,
            url: url.into(),
            title: title.into(),
            error: None,
        }
    }

    /// Snapshot for the progress feed: full current state, not a delta.
    pub fn snapshot(&self) -> ProgressSnapshot {
        ProgressSnapshot {
            status: self.status,
            progress: self.progress,
            speed: self.speed.clone(),
            eta: self.eta.clone(),
            error: self.error.clone(),
        }
    }
}

/// Progress update sent to subscribers.
#[derive(Debug, Clone, Serialize)]
pub struct ProgressSnapshot {
    pub status: JobStatus,
    pub progress: f32,
    pub speed: String,
    pub eta: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
