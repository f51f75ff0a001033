// crates/server/src/lib.rs
//! Vidgrab server library.
//!
//! Axum-based HTTP server around the download job lifecycle: an info lookup
//! endpoint, job start/progress/fetch routes, and a static dir for the
//! frontend. Job orchestration lives in [`jobs`].

pub mod error;
pub mod jobs;
pub mod messages;
pub mod routes;
pub mod state;

pub use error::{ApiError, ApiResult, ErrorResponse};
pub use routes::api_routes;
pub use state::AppState;

use std::path::PathBuf;
use std::sync::Arc;

use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

/// Create the Axum application with all routes and middleware.
///
/// Sets up the API routes, permissive CORS, and request tracing. When
/// `static_dir` is given, files in it are served at the root (the frontend).
pub fn create_app(state: Arc<AppState>, static_dir: Option<PathBuf>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let mut app = Router::new().merge(api_routes(state));
    if let Some(dir) = static_dir {
        app = app.fallback_service(ServeDir::new(dir));
    }

    app.layer(cors).layer(TraceLayer::new_for_http())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use tower::ServiceExt;
    use vidgrab_core::{MediaFetcher, MediaNormalizer};

    fn test_app() -> Router {
        let state = AppState::new(
            MediaFetcher::new("/definitely/not/yt-dlp"),
            MediaNormalizer::new("/definitely/not/ffmpeg"),
            std::env::temp_dir(),
        );
        create_app(state, None)
    }

    async fn get(app: Router, uri: &str) -> (StatusCode, String) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();

        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, String::from_utf8(body.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let (status, body) = get(test_app(), "/api/health").await;

        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("\"status\":\"ok\""));
        assert!(body.contains("\"version\""));
        assert!(body.contains("\"uptime_secs\""));
    }

    #[tokio::test]
    async fn test_unknown_route_is_404() {
        let (status, _) = get(test_app(), "/api/nope").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
