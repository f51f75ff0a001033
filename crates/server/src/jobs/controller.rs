// crates/server/src/jobs/controller.rs
//! Per-job lifecycle orchestration.
//!
//! `start_download` registers the job and launches the fetcher, then returns
//! the id immediately — everything after that happens in a detached task
//! that pumps process events into the store. The pump is also where a reaped
//! job's subprocess gets terminated: when a store update reports the record
//! gone, the pump returns, dropping the event receiver, which kills the
//! child (see `vidgrab_core::runner`).

use std::path::{Path, PathBuf};
use std::sync::Arc;

use ulid::Ulid;
use vidgrab_core::{needs_normalization, FormatSelection, MediaProcess, ProcessEvent};

use crate::messages;
use crate::state::AppState;

use super::types::{Job, JobId, JobStatus};

/// Validated start parameters. Construction is the validation step.
#[derive(Debug)]
pub struct StartParams {
    pub url: String,
    pub title: String,
    pub selection: FormatSelection,
}

impl StartParams {
    /// Validate raw request fields. Both the URL and the format selector
    /// must be present; the title is sanitized with a fallback.
    pub fn validate(url: &str, format_id: &str, title: &str) -> Result<Self, &'static str> {
        let url = url.trim();
        if url.is_empty() || format_id.is_empty() {
            return Err(messages::URL_AND_FORMAT_REQUIRED);
        }
        if !url.starts_with("http") {
            return Err(messages::INVALID_URL);
        }
        Ok(Self {
            url: url.to_string(),
            title: vidgrab_core::sanitize_title(title),
            selection: FormatSelection::from_format_id(format_id),
        })
    }
}

/// Register a new job and start its download. Returns the job id right
/// away; progress is observed through the store.
///
/// A spawn failure still returns the id — the job is moved to `Error`
/// immediately with the spawn reason, and subscribers see it on their first
/// snapshot.
pub fn start_download(state: Arc<AppState>, params: StartParams) -> JobId {
    let id = Ulid::new();
    let ext = params.selection.ext();
    let artifact_path = state.downloads_dir.join(format!("{id}.{ext}"));

    let job = Job::new(params.url.clone(), params.title, ext, artifact_path.clone());
    if !state.store.create(id, job) {
        // ULIDs carry 80 bits of randomness; a collision means something is
        // deeply wrong upstream of us.
        tracing::error!(job_id = %id, "job id collision");
    }

    tracing::info!(job_id = %id, url = %params.url, ext, "starting download");

    match state
        .fetcher
        .start_download(&params.url, &params.selection, &artifact_path)
    {
        Ok(process) => {
            tokio::spawn(run_job(state, id, params.url, artifact_path, process));
        }
        Err(e) => {
            tracing::error!(job_id = %id, error = %e, "fetcher failed to spawn");
            state.store.update(&id, |job| {
                job.status = JobStatus::Error;
                job.error = Some(messages::START_FAILED.to_string());
            });
        }
    }

    id
}

/// Pump process events into the store until the process exits.
async fn run_job(
    state: Arc<AppState>,
    id: JobId,
    url: String,
    artifact_path: PathBuf,
    mut process: MediaProcess,
) {
    while let Some(event) = process.events.recv().await {
        match event {
            ProcessEvent::Progress(update) => {
                let percent = update.percent.clamp(0.0, 100.0);
                let alive = state.store.update(&id, move |job| {
                    // Monotonic: interleaved stdout/stderr matches can
                    // arrive out of order; never let progress regress.
                    if percent > job.progress {
                        job.progress = percent;
                    }
                    if let Some(speed) = update.speed {
                        job.speed = speed;
                    }
                    if let Some(eta) = update.eta {
                        job.eta = eta;
                    }
                });
                if !alive {
                    // Reaped mid-download. Returning drops the receiver,
                    // which kills the subprocess.
                    tracing::warn!(job_id = %id, "job record vanished mid-download; terminating fetcher");
                    return;
                }
            }
            ProcessEvent::Exited(status) => {
                finish(&state, id, &url, &artifact_path, status).await;
                return;
            }
        }
    }

    // Channel closed without an exit event: the reader task died. Treat it
    // like a process failure.
    tracing::error!(job_id = %id, "fetcher event stream ended without exit status");
    state.store.update(&id, |job| {
        if !job.status.is_terminal() {
            job.status = JobStatus::Error;
            job.error = Some(messages::DOWNLOAD_FAILED.to_string());
        }
    });
}

/// Completion handling: post-process if the platform needs it, then settle
/// the terminal status. Single attempt — no retries at this layer.
async fn finish(
    state: &Arc<AppState>,
    id: JobId,
    url: &str,
    artifact_path: &Path,
    status: std::process::ExitStatus,
) {
    let artifact_present = tokio::fs::try_exists(artifact_path).await.unwrap_or(false);

    if !status.success() || !artifact_present {
        tracing::error!(
            job_id = %id,
            exit_code = ?status.code(),
            artifact_present,
            "download failed"
        );
        state.store.update(&id, |job| {
            job.status = JobStatus::Error;
            job.error = Some(messages::DOWNLOAD_FAILED.to_string());
        });
        return;
    }

    let is_mp4 = artifact_path.extension().is_some_and(|e| e == "mp4");
    if is_mp4 && needs_normalization(url) {
        state.store.update(&id, |job| {
            // Hold the bar near the end while the encoder runs; never
            // regress if the fetcher already reported higher.
            if job.progress < 95.0 {
                job.progress = 95.0;
            }
            job.speed = messages::CONVERTING.to_string();
            job.eta.clear();
        });
        if let Err(e) = state.normalizer.normalize_in_place(artifact_path).await {
            // Best-effort enhancement: keep the original artifact and
            // complete the job anyway.
            tracing::warn!(job_id = %id, error = %e, "normalization failed (non-fatal)");
        }
    }

    let alive = state.store.update(&id, |job| {
        job.status = JobStatus::Completed;
        job.progress = 100.0;
        job.speed.clear();
        job.eta.clear();
    });

    if alive {
        tracing::info!(job_id = %id, "download completed");
    } else {
        // Reaped while we were normalizing. The record owns the artifact's
        // lifecycle, so don't leave an orphan file behind.
        tracing::warn!(job_id = %id, "job reaped during completion; removing artifact");
        let _ = tokio::fs::remove_file(artifact_path).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::AppState;
    use std::time::Duration;
    use vidgrab_core::{MediaFetcher, MediaNormalizer};

    fn test_state(dir: &Path, fetcher_bin: &str) -> Arc<AppState> {
        AppState::new(
            MediaFetcher::new(fetcher_bin),
            MediaNormalizer::new("/definitely/not/ffmpeg"),
            dir.to_path_buf(),
        )
    }

    /// Wait until the job reaches a terminal status, with a deadline.
    async fn wait_terminal(state: &Arc<AppState>, id: &JobId) -> Job {
        for _ in 0..200 {
            if let Some(job) = state.store.get(id) {
                if job.status.is_terminal() {
                    return job;
                }
            }
            tokio::time::sleep(Duration::from_millis(25)).await;
        }
        panic!("job never reached a terminal status");
    }

    /// A fake fetcher: prints progress lines, then creates the `-o` target.
    #[cfg(unix)]
    fn write_fake_fetcher(dir: &Path) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;

        let script = dir.join("fake-ytdlp.sh");
        std::fs::write(
            &script,
            r#"#!/bin/sh
out=""
prev=""
for arg in "$@"; do
  if [ "$prev" = "-o" ]; then out="$arg"; fi
  prev="$arg"
done
echo ' 40.0% 1.00MiB/s 00:10'
echo '100.0%  '
: > "$out"
exit 0
"#,
        )
        .unwrap();
        let mut perms = std::fs::metadata(&script).unwrap().permissions();
        perms.set_mode(0o755);
        std::fs::set_permissions(&script, perms).unwrap();
        script
    }

    #[test]
    fn test_validate_requires_url_and_format() {
        assert_eq!(
            StartParams::validate("", "best", "t").unwrap_err(),
            messages::URL_AND_FORMAT_REQUIRED
        );
        assert_eq!(
            StartParams::validate("https://example.com/v", "", "t").unwrap_err(),
            messages::URL_AND_FORMAT_REQUIRED
        );
        assert_eq!(
            StartParams::validate("ftp://example.com/v", "best", "t").unwrap_err(),
            messages::INVALID_URL
        );
    }

    #[test]
    fn test_validate_sanitizes_title_and_maps_selection() {
        let params = StartParams::validate("https://example.com/v", "bestaudio", "My/Song!").unwrap();
        assert_eq!(params.title, "MySong");
        assert_eq!(params.selection, FormatSelection::AudioOnly);

        let params = StartParams::validate("https://example.com/v", "137", "").unwrap();
        assert_eq!(params.title, "video");
        assert_eq!(params.selection, FormatSelection::ById("137".into()));
    }

    #[tokio::test]
    async fn test_spawn_failure_marks_job_error() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(dir.path(), "/definitely/not/yt-dlp");

        let params = StartParams::validate("https://example.com/v", "best", "clip").unwrap();
        let id = start_download(state.clone(), params);

        let job = wait_terminal(&state, &id).await;
        assert_eq!(job.status, JobStatus::Error);
        assert_eq!(job.error.as_deref(), Some(messages::START_FAILED));
    }

    #[tokio::test]
    async fn test_nonzero_exit_marks_job_error_with_generic_message() {
        let dir = tempfile::tempdir().unwrap();
        // `false` spawns fine, exits 1, creates no artifact.
        let state = test_state(dir.path(), "/bin/false");

        let params = StartParams::validate("https://example.com/v", "best", "clip").unwrap();
        let id = start_download(state.clone(), params);

        let job = wait_terminal(&state, &id).await;
        assert_eq!(job.status, JobStatus::Error);
        assert_eq!(job.error.as_deref(), Some(messages::DOWNLOAD_FAILED));
    }

    #[tokio::test]
    async fn test_zero_exit_without_artifact_is_error() {
        let dir = tempfile::tempdir().unwrap();
        // `true` exits 0 but never writes the artifact.
        let state = test_state(dir.path(), "/bin/true");

        let params = StartParams::validate("https://example.com/v", "best", "clip").unwrap();
        let id = start_download(state.clone(), params);

        let job = wait_terminal(&state, &id).await;
        assert_eq!(job.status, JobStatus::Error);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_successful_download_completes_with_progress() {
        let dir = tempfile::tempdir().unwrap();
        let script = write_fake_fetcher(dir.path());
        let state = test_state(dir.path(), script.to_str().unwrap());

        let params = StartParams::validate("https://example.com/v", "best", "clip").unwrap();
        let id = start_download(state.clone(), params);

        let job = wait_terminal(&state, &id).await;
        assert_eq!(job.status, JobStatus::Completed);
        assert_eq!(job.progress, 100.0);
        assert_eq!(job.ext, "mp4");
        assert!(job.artifact_path.exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_bestaudio_yields_mp3_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let script = write_fake_fetcher(dir.path());
        let state = test_state(dir.path(), script.to_str().unwrap());

        let params =
            StartParams::validate("https://example.com/song", "bestaudio", "tune").unwrap();
        let id = start_download(state.clone(), params);

        let job = wait_terminal(&state, &id).await;
        assert_eq!(job.status, JobStatus::Completed);
        assert_eq!(job.ext, "mp3");
        assert!(job.artifact_path.to_string_lossy().ends_with(".mp3"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_normalization_failure_still_completes() {
        let dir = tempfile::tempdir().unwrap();
        let script = write_fake_fetcher(dir.path());
        // Normalizer binary doesn't exist — post-processing must fail
        // without failing the job.
        let state = test_state(dir.path(), script.to_str().unwrap());

        let params =
            StartParams::validate("https://www.tiktok.com/@u/video/1", "best", "clip").unwrap();
        let id = start_download(state.clone(), params);

        let job = wait_terminal(&state, &id).await;
        assert_eq!(job.status, JobStatus::Completed);
        assert!(job.artifact_path.exists());
    }
}
