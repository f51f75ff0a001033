// crates/core/src/lib.rs
//! Vidgrab core library.
//!
//! Everything that talks to the external media tooling lives here: spawning
//! the fetcher (`yt-dlp`) and normalizer (`ffmpeg`) binaries, parsing their
//! line-oriented progress output, mapping user format selectors to fetcher
//! arguments, and shaping metadata lookups into API responses. No HTTP types.

pub mod error;
pub mod fetcher;
pub mod format;
pub mod metadata;
pub mod normalize;
pub mod progress;
pub mod runner;

pub use error::FetchError;
pub use fetcher::MediaFetcher;
pub use format::{sanitize_title, FormatSelection};
pub use normalize::{needs_normalization, MediaNormalizer};
pub use progress::ProgressUpdate;
pub use runner::{MediaProcess, ProcessEvent};
