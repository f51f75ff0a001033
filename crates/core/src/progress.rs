// crates/core/src/progress.rs
//! Progress-line parsing for fetcher output.
//!
//! The fetcher is started with a progress template that prints
//! `<percent>% <speed> <eta>` per line on stdout. Stderr occasionally carries
//! bare percentages (merge/ffmpeg phases). Both parsers are defensive:
//! partial lines from pipe buffering and unrelated log output simply fail to
//! match and are skipped — a failed match is never an error.

use regex_lite::Regex;
use std::sync::OnceLock;

/// A single progress observation extracted from one output line.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressUpdate {
    /// Raw percentage as printed by the fetcher. Not yet clamped; the
    /// controller owns clamping and monotonicity.
    pub percent: f32,
    /// Display speed token (`"2.41MiB/s"`). `None` when the line carried
    /// only a percentage.
    pub speed: Option<String>,
    /// Display ETA token (`"00:12"`). Same optionality as `speed`.
    pub eta: Option<String>,
}

fn stdout_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"([\d.]+)%\s*(\S*)\s*(\S*)").expect("valid progress pattern"))
}

fn percent_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"([\d.]+)%").expect("valid percent pattern"))
}

/// Parse a stdout progress line into a full update.
///
/// Returns `None` for lines that don't look like progress output.
pub fn parse_progress_line(line: &str) -> Option<ProgressUpdate> {
    let caps = stdout_pattern().captures(line)?;
    let percent = caps
        .get(1)
        .map(|m| m.as_str().parse::<f32>().unwrap_or(0.0))
        .unwrap_or(0.0);
    let speed = caps.get(2).map(|m| m.as_str().to_string());
    let eta = caps.get(3).map(|m| m.as_str().to_string());
    Some(ProgressUpdate {
        percent,
        speed,
        eta,
    })
}

/// Parse a stderr line for a bare percentage. Speed/eta are left untouched.
pub fn parse_stderr_percent(line: &str) -> Option<f32> {
    let caps = percent_pattern().captures(line)?;
    caps.get(1)
        .map(|m| m.as_str().parse::<f32>().unwrap_or(0.0))
}
