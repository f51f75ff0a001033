// crates/core/src/fetcher.rs
//! Media fetcher — the external `yt-dlp` binary.
//!
//! Two modes: a one-shot metadata dump (`--dump-json`) for the info lookup
//! path, and a streaming download whose progress lines feed the job
//! controller via [`crate::runner`].

use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::process::Command;
use tokio::time::timeout;

use crate::error::FetchError;
use crate::format::FormatSelection;
use crate::runner::{spawn_streaming, MediaProcess};

/// Progress template handed to the fetcher so stdout lines match the fixed
/// `<percent>% <speed> <eta>` pattern the parser expects.
const PROGRESS_TEMPLATE: &str =
    "%(progress._percent_str)s %(progress._speed_str)s %(progress._eta_str)s";

/// Metadata lookups are bounded; a stuck extractor should not pin a request.
const INFO_TIMEOUT_SECS: u64 = 30;

/// Handle to the fetcher binary plus optional cookies file.
#[derive(Debug, Clone)]
pub struct MediaFetcher {
    bin: PathBuf,
    cookies: Option<PathBuf>,
}

impl MediaFetcher {
    pub fn new(bin: impl Into<PathBuf>) -> Self {
        Self {
            bin: bin.into(),
            cookies: None,
        }
    }

    /// Use a cookies file for authenticated extractions.
    pub fn with_cookies(mut self, cookies: impl Into<PathBuf>) -> Self {
        self.cookies = Some(cookies.into());
        self
    }

    /// Resolve binary and cookies from the environment.
    ///
    /// `VIDGRAB_YTDLP_PATH` overrides the binary (default `yt-dlp` from
    /// PATH); a `cookies.txt` in the working directory is picked up
    /// automatically, or `VIDGRAB_COOKIES` points at one explicitly.
    pub fn from_env() -> Self {
        let bin = std::env::var("VIDGRAB_YTDLP_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("yt-dlp"));

        let cookies = std::env::var("VIDGRAB_COOKIES")
            .map(PathBuf::from)
            .ok()
            .or_else(|| {
                let default = PathBuf::from("cookies.txt");
                default.exists().then_some(default)
            });

        if let Some(path) = &cookies {
            tracing::info!(cookies = %path.display(), "using cookies file for authentication");
        }

        Self { bin, cookies }
    }

    pub fn bin(&self) -> &Path {
        &self.bin
    }

    fn cookie_args(&self) -> Vec<String> {
        match &self.cookies {
            Some(path) => vec!["--cookies".into(), path.display().to_string()],
            None => Vec::new(),
        }
    }

    /// Dump metadata for `url` as a single JSON object.
    pub async fn fetch_info(&self, url: &str) -> Result<serde_json::Value, FetchError> {
        let mut args = self.cookie_args();
        args.extend([
            "--dump-json".into(),
            "--no-playlist".into(),
            "--no-warnings".into(),
            url.to_string(),
        ]);

        let mut cmd = Command::new(&self.bin);
        cmd.args(&args)
            .stdin(std::process::Stdio::null())
            .kill_on_drop(true);

        let output = timeout(Duration::from_secs(INFO_TIMEOUT_SECS), cmd.output())
            .await
            .map_err(|_| FetchError::Timeout {
                bin: self.bin.display().to_string(),
                secs: INFO_TIMEOUT_SECS,
            })?
            .map_err(|e| FetchError::Spawn {
                bin: self.bin.display().to_string(),
                source: e,
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(FetchError::Upstream {
                bin: self.bin.display().to_string(),
                code: output.status.code(),
                stderr: stderr.chars().take(500).collect(),
            });
        }

        serde_json::from_slice(&output.stdout).map_err(|e| FetchError::InvalidOutput {
            bin: self.bin.display().to_string(),
            message: e.to_string(),
        })
    }

    /// Start a download of `url` into `out_path` with the given selection.
    ///
    /// Returns immediately with the event stream; the download runs until
    /// process exit regardless of whether anyone is watching.
    pub fn start_download(
        &self,
        url: &str,
        selection: &FormatSelection,
        out_path: &Path,
    ) -> Result<MediaProcess, FetchError> {
        let mut args = self.cookie_args();
        args.extend(selection.fetcher_args());
        args.extend([
            "--no-playlist".into(),
            "--no-warnings".into(),
            "--newline".into(),
            "--progress-template".into(),
            PROGRESS_TEMPLATE.into(),
            "--concurrent-fragments".into(),
            "8".into(),
            "-o".into(),
            out_path.display().to_string(),
            url.to_string(),
        ]);

        spawn_streaming(&self.bin, &args)
    }
}
