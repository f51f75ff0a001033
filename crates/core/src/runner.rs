// crates/core/src/runner.rs
//! Subprocess runner: spawns an external media process and streams its
//! stdout/stderr line by line, converting matching lines into progress
//! events on an mpsc channel.
//!
//! The runner knows nothing about jobs or the store — callers consume the
//! event receiver and apply state changes themselves. Dropping the receiver
//! kills the child: that is the only cancellation path, and it is what the
//! reaper relies on for expired jobs whose process is still alive.

use std::path::Path;
use std::process::Stdio;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc;

use crate::error::FetchError;
use crate::progress::{parse_progress_line, parse_stderr_percent, ProgressUpdate};

/// Events emitted by a running media process.
#[derive(Debug)]
pub enum ProcessEvent {
    /// A progress line matched on stdout or stderr.
    Progress(ProgressUpdate),
    /// The process terminated. Always the last event.
    Exited(std::process::ExitStatus),
}

/// Handle to a spawned media process. The receiver yields [`ProcessEvent`]s
/// until the process exits; dropping it terminates the child.
pub struct MediaProcess {
    pub events: mpsc::Receiver<ProcessEvent>,
}

/// Spawn `bin` with `args` and stream its output as progress events.
///
/// Fails only if the process cannot be started; everything after a
/// successful spawn is reported through the event channel.
pub fn spawn_streaming(bin: &Path, args: &[String]) -> Result<MediaProcess, FetchError> {
    let mut cmd = Command::new(bin);
    cmd.args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let mut child = cmd.spawn().map_err(|e| FetchError::Spawn {
        bin: bin.display().to_string(),
        source: e,
    })?;

    let stdout = child.stdout.take().ok_or_else(|| FetchError::Spawn {
        bin: bin.display().to_string(),
        source: std::io::Error::other("failed to capture stdout"),
    })?;
    let stderr = child.stderr.take().ok_or_else(|| FetchError::Spawn {
        bin: bin.display().to_string(),
        source: std::io::Error::other("failed to capture stderr"),
    })?;

    let (tx, rx) = mpsc::channel::<ProcessEvent>(64);

    tokio::spawn(async move {
        let mut out_lines = BufReader::new(stdout).lines();
        let mut err_lines = BufReader::new(stderr).lines();
        let mut out_done = false;
        let mut err_done = false;

        while !(out_done && err_done) {
            tokio::select! {
                line = out_lines.next_line(), if !out_done => match line {
                    Ok(Some(line)) => {
                        if let Some(update) = parse_progress_line(&line) {
                            if tx.send(ProcessEvent::Progress(update)).await.is_err() {
                                // Receiver dropped — abort the child.
                                let _ = child.kill().await;
                                return;
                            }
                        }
                    }
                    _ => out_done = true,
                },
                line = err_lines.next_line(), if !err_done => match line {
                    Ok(Some(line)) => {
                        if let Some(percent) = parse_stderr_percent(&line) {
                            let update = ProgressUpdate {
                                percent,
                                speed: None,
                                eta: None,
                            };
                            if tx.send(ProcessEvent::Progress(update)).await.is_err() {
                                let _ = child.kill().await;
                                return;
                            }
                        }
                    }
                    _ => err_done = true,
                },
                _ = tx.closed() => {
                    let _ = child.kill().await;
                    let _ = child.wait().await;
                    return;
                }
            }
        }

        match child.wait().await {
            Ok(status) => {
                let _ = tx.send(ProcessEvent::Exited(status)).await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to wait for media process");
            }
        }
    });

    Ok(MediaProcess { events: rx })
}
