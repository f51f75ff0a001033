// crates/server/src/routes/download.rs
//! Download lifecycle routes.
//!
//! - POST /api/download/start         — validate, register, launch fetcher
//! - GET  /api/download/progress/{id} — SSE snapshots until terminal
//! - GET  /api/download/file/{id}     — stream the artifact exactly once

use std::convert::Infallible;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::sse::{Event, Sse};
use axum::response::Response;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tokio_stream::StreamExt;
use tokio_util::io::ReaderStream;
use ulid::Ulid;

use vidgrab_core::FormatSelection;

use crate::error::{ApiError, ApiResult};
use crate::jobs::controller::{start_download, StartParams};
use crate::messages;
use crate::state::AppState;

/// Cadence of progress emissions after the immediate first one.
const PUBLISH_INTERVAL: Duration = Duration::from_millis(300);

/// Chunk size for artifact streaming.
const STREAM_CHUNK_BYTES: usize = 1024 * 1024;

#[derive(Debug, Deserialize)]
pub struct StartRequest {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub format_id: String,
    #[serde(default)]
    pub title: String,
}

#[derive(Debug, Serialize)]
#[cfg_attr(test, derive(serde::Deserialize))]
pub struct StartResponse {
    #[serde(rename = "downloadId")]
    pub download_id: String,
}

/// POST /api/download/start — start a job, return its id immediately.
pub async fn start(
    State(state): State<Arc<AppState>>,
    Json(request): Json<StartRequest>,
) -> ApiResult<Json<StartResponse>> {
    let params = StartParams::validate(&request.url, &request.format_id, &request.title)
        .map_err(ApiError::BadRequest)?;

    let id = start_download(state, params);
    Ok(Json(StartResponse {
        download_id: id.to_string(),
    }))
}

/// GET /api/download/progress/{id} — SSE stream of job snapshots.
///
/// Emits immediately, then every 300 ms; each event is the full current
/// snapshot. Closes right after a terminal snapshot, or after a single
/// `not_found` if the id is unknown (at subscribe time or mid-stream, e.g.
/// after the reaper removed it). A disconnecting client drops the stream
/// and its timer with it.
pub async fn progress(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Sse<impl tokio_stream::Stream<Item = Result<Event, Infallible>>> {
    let store = Arc::clone(&state.store);
    let id = Ulid::from_string(&id).ok();

    let stream = async_stream::stream! {
        let mut ticks = tokio::time::interval(PUBLISH_INTERVAL);
        loop {
            // First tick completes immediately.
            ticks.tick().await;

            let job = id.as_ref().and_then(|id| store.get(id));
            match job {
                Some(job) => {
                    let snapshot = job.snapshot();
                    let terminal = snapshot.status.is_terminal();
                    let data = serde_json::to_string(&snapshot).unwrap_or_default();
                    yield Ok(Event::default().data(data));
                    if terminal {
                        break;
                    }
                }
                None => {
                    yield Ok(Event::default().data(r#"{"status":"not_found"}"#));
                    break;
                }
            }
        }
    };

    Sse::new(stream)
}

/// Deletes the artifact when the response body is dropped — whether the
/// stream completed or the client went away.
struct RemoveOnDrop(PathBuf);

impl Drop for RemoveOnDrop {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.0) {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!(path = %self.0.display(), error = %e, "failed to remove served artifact");
            }
        }
    }
}

/// GET /api/download/file/{id} — stream the finished artifact.
///
/// The job is claimed (removed from the store) atomically before streaming,
/// so this endpoint succeeds at most once per id; any later call sees
/// `not_found`. The artifact file is deleted when the stream finishes,
/// success or client abort alike.
pub async fn file(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Response> {
    let id = Ulid::from_string(&id).map_err(|_| ApiError::NotFound(messages::FILE_NOT_FOUND))?;

    let job = state
        .store
        .claim_completed(&id)
        .ok_or(ApiError::NotFound(messages::FILE_NOT_FOUND))?;

    let guard = RemoveOnDrop(job.artifact_path.clone());

    let file = match tokio::fs::File::open(&job.artifact_path).await {
        Ok(file) => file,
        Err(e) => {
            // Completed job without its artifact — the record was stale.
            // The guard has already cleaned up whatever was left.
            tracing::error!(job_id = %id, error = %e, "completed job missing artifact");
            return Err(ApiError::NotFound(messages::FILE_NOT_FOUND));
        }
    };
    let content_length = file
        .metadata()
        .await
        .map(|m| m.len())
        .map_err(|e| {
            tracing::error!(job_id = %id, error = %e, "failed to stat artifact");
            ApiError::NotFound(messages::FILE_NOT_FOUND)
        })?;

    tracing::info!(job_id = %id, bytes = content_length, "serving artifact");

    let reader = ReaderStream::with_capacity(file, STREAM_CHUNK_BYTES);
    let body_stream = async_stream::stream! {
        let _guard = guard;
        let mut reader = reader;
        while let Some(chunk) = reader.next().await {
            yield chunk;
        }
    };

    Response::builder()
        .status(StatusCode::OK)
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}.{}\"", job.title, job.ext),
        )
        .header(
            header::CONTENT_TYPE,
            FormatSelection::content_type_for_ext(job.ext),
        )
        .header(header::CONTENT_LENGTH, content_length)
        .body(Body::from_stream(body_stream))
        .map_err(|e| {
            tracing::error!(job_id = %id, error = %e, "failed to build artifact response");
            ApiError::Upstream(messages::DOWNLOAD_FAILED)
        })
}

/// Build the download router.
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/download/start", post(start))
        .route("/download/progress/{id}", get(progress))
        .route("/download/file/{id}", get(file))
}
