// crates/server/src/jobs/mod.rs
//! Download job lifecycle: the shared store, the per-job controller that
//! drives the external fetcher, and the background reaper.

pub mod controller;
pub mod reaper;
pub mod store;
pub mod types;

pub use store::JobStore;
pub use types::{Job, JobId, JobStatus, ProgressSnapshot};
