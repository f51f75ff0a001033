// crates/core/src/error.rs
//! Error types for external media tooling.

use thiserror::Error;

/// Errors from invoking the fetcher or normalizer binaries.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The binary could not be started at all.
    #[error("failed to spawn {bin}: {source}")]
    Spawn {
        bin: String,
        #[source]
        source: std::io::Error,
    },

    /// The process ran past its deadline and was abandoned.
    #[error("{bin} timed out after {secs}s")]
    Timeout { bin: String, secs: u64 },

    /// The process exited nonzero. Raw stderr is carried for logging only
    /// and must never be surfaced to clients.
    #[error("{bin} exited with code {code:?}")]
    Upstream {
        bin: String,
        code: Option<i32>,
        stderr: String,
    },

    /// The process produced output we could not parse.
    #[error("invalid output from {bin}: {message}")]
    InvalidOutput { bin: String, message: String },
}
