// crates/server/src/state.rs
//! Application state for the Axum server.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use vidgrab_core::{MediaFetcher, MediaNormalizer};

use crate::jobs::JobStore;

/// Shared application state accessible from all route handlers.
pub struct AppState {
    /// Server start time for uptime tracking.
    pub start_time: Instant,
    /// The single source of truth for job state.
    pub store: Arc<JobStore>,
    /// External media fetcher (yt-dlp).
    pub fetcher: MediaFetcher,
    /// External container normalizer (ffmpeg).
    pub normalizer: MediaNormalizer,
    /// Directory holding transient artifact files, named `<id>.<ext>`.
    pub downloads_dir: PathBuf,
}

impl AppState {
    /// Create a new application state wrapped in an Arc for sharing.
    pub fn new(
        fetcher: MediaFetcher,
        normalizer: MediaNormalizer,
        downloads_dir: PathBuf,
    ) -> Arc<Self> {
        Arc::new(Self {
            start_time: Instant::now(),
            store: Arc::new(JobStore::new()),
            fetcher,
            normalizer,
            downloads_dir,
        })
    }

    /// Get the server uptime in seconds.
    pub fn uptime_secs(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_state_new() {
        let state = AppState::new(
            MediaFetcher::new("yt-dlp"),
            MediaNormalizer::new("ffmpeg"),
            PathBuf::from("/tmp/downloads"),
        );
        assert!(state.uptime_secs() < 1);
        assert!(state.store.is_empty());
    }
}
