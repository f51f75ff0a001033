// crates/server/src/routes/info.rs
//! Video info lookup.
//!
//! - GET /api/info?url= — metadata plus the curated format list

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;

use vidgrab_core::metadata::{shape_info, VideoInfo};

use crate::error::{ApiError, ApiResult};
use crate::messages;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct InfoQuery {
    #[serde(default)]
    pub url: String,
}

/// GET /api/info — look up metadata for a video URL.
pub async fn get_info(
    State(state): State<Arc<AppState>>,
    Query(query): Query<InfoQuery>,
) -> ApiResult<Json<VideoInfo>> {
    let url = query.url.trim();
    if url.is_empty() {
        return Err(ApiError::BadRequest(messages::URL_REQUIRED));
    }
    if !url.starts_with("http") {
        return Err(ApiError::BadRequest(messages::INVALID_URL));
    }

    match state.fetcher.fetch_info(url).await {
        Ok(raw) => Ok(Json(shape_info(&raw))),
        Err(e) => {
            // Raw extractor output stays in the logs.
            tracing::error!(url, error = %e, "info lookup failed");
            Err(ApiError::Upstream(messages::INFO_FAILED))
        }
    }
}

/// Build the info router.
pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/info", get(get_info))
}
