// crates/core/src/normalize.rs
//! Post-download container normalization via the external `ffmpeg` binary.
//!
//! Some platforms serve streams that certain players (notably iOS) refuse to
//! play back without a re-encode to h264/aac with faststart. Normalization
//! is a best-effort enhancement: a failure is logged and the original
//! artifact is kept — it never fails the job.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::OnceLock;
use std::time::Duration;

use regex_lite::Regex;
use tokio::process::Command;
use tokio::time::timeout;

use crate::error::FetchError;

/// Upper bound on a single re-encode.
const NORMALIZE_TIMEOUT_SECS: u64 = 600;

fn host_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)instagram\.com|tiktok\.com|facebook\.com|fb\.watch")
            .expect("valid host pattern")
    })
}

/// Whether downloads from this source URL need container normalization for
/// playback compatibility.
pub fn needs_normalization(url: &str) -> bool {
    host_pattern().is_match(url)
}

/// Handle to the normalizer binary.
#[derive(Debug, Clone)]
pub struct MediaNormalizer {
    bin: PathBuf,
}

impl MediaNormalizer {
    pub fn new(bin: impl Into<PathBuf>) -> Self {
        Self { bin: bin.into() }
    }

    /// Resolve the binary from `VIDGRAB_FFMPEG_PATH` (default `ffmpeg`).
    pub fn from_env() -> Self {
        let bin = std::env::var("VIDGRAB_FFMPEG_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("ffmpeg"));
        Self { bin }
    }

    /// Re-encode `path` in place (h264/aac/faststart).
    ///
    /// Writes to a `_converted` sibling first, then replaces the original
    /// only after the encoder succeeded, so a failure leaves the artifact
    /// untouched.
    pub async fn normalize_in_place(&self, path: &Path) -> Result<(), FetchError> {
        let converted = converted_path(path);

        let mut cmd = Command::new(&self.bin);
        cmd.arg("-i")
            .arg(path)
            .args([
                "-c:v",
                "libx264",
                "-c:a",
                "aac",
                "-b:a",
                "128k",
                "-movflags",
                "+faststart",
                "-y",
            ])
            .arg(&converted)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let output = timeout(Duration::from_secs(NORMALIZE_TIMEOUT_SECS), cmd.output())
            .await
            .map_err(|_| FetchError::Timeout {
                bin: self.bin.display().to_string(),
                secs: NORMALIZE_TIMEOUT_SECS,
            })?
            .map_err(|e| FetchError::Spawn {
                bin: self.bin.display().to_string(),
                source: e,
            })?;

        if !output.status.success() || !converted.exists() {
            // Clean up any partial sibling the encoder left behind.
            let _ = tokio::fs::remove_file(&converted).await;
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(FetchError::Upstream {
                bin: self.bin.display().to_string(),
                code: output.status.code(),
                stderr: stderr.chars().take(500).collect(),
            });
        }

        tokio::fs::remove_file(path)
            .await
            .map_err(|e| FetchError::InvalidOutput {
                bin: self.bin.display().to_string(),
                message: format!("failed to replace original: {e}"),
            })?;
        tokio::fs::rename(&converted, path)
            .await
            .map_err(|e| FetchError::InvalidOutput {
                bin: self.bin.display().to_string(),
                message: format!("failed to move converted file: {e}"),
            })?;
        Ok(())
    }
}

fn converted_path(path: &Path) -> PathBuf {
    let stem = path.file_stem().unwrap_or_default().to_string_lossy();
    let ext = path.extension().unwrap_or_default().to_string_lossy();
    path.with_file_name(format!("{stem}_converted.{ext}"))
}
