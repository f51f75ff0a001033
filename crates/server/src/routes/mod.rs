// crates/server/src/routes/mod.rs
//! API route handlers for the vidgrab server.

pub mod download;
pub mod health;
pub mod info;

use std::sync::Arc;

use axum::Router;

use crate::state::AppState;

/// Create the combined API router with all routes under the /api prefix.
///
/// Routes:
/// - GET  /api/health                 - Health check
/// - GET  /api/info?url=              - Video metadata and format options
/// - POST /api/download/start         - Start a download job
/// - GET  /api/download/progress/{id} - SSE stream of job progress
/// - GET  /api/download/file/{id}     - Fetch the finished artifact (once)
pub fn api_routes(state: Arc<AppState>) -> Router {
    Router::new()
        .nest(
            "/api",
            health::router()
                .merge(info::router())
                .merge(download::router()),
        )
        .with_state(state)
}
