// crates/server/src/main.rs
//! Vidgrab server binary.
//!
//! Wires the downloads directory, the external tool handles, and the job
//! store together, spawns the background reaper, and serves the Axum app.

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Result;
use tracing_subscriber::EnvFilter;
use vidgrab_core::{MediaFetcher, MediaNormalizer};
use vidgrab_server::jobs::reaper::spawn_reaper;
use vidgrab_server::{create_app, AppState};

/// Default port for the server.
const DEFAULT_PORT: u16 = 3000;

/// Get the server port from environment or use default.
fn get_port() -> u16 {
    std::env::var("VIDGRAB_PORT")
        .ok()
        .or_else(|| std::env::var("PORT").ok())
        .and_then(|p| p.parse().ok())
        .unwrap_or(DEFAULT_PORT)
}

/// Directory for transient artifact files.
fn get_downloads_dir() -> PathBuf {
    std::env::var("VIDGRAB_DOWNLOADS_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("downloads"))
}

/// Static directory for serving frontend files.
///
/// Priority:
/// 1. STATIC_DIR environment variable (explicit override)
/// 2. ./public directory (if it exists)
/// 3. None (API-only mode)
fn get_static_dir() -> Option<PathBuf> {
    std::env::var("STATIC_DIR")
        .ok()
        .map(PathBuf::from)
        .or_else(|| {
            let public = PathBuf::from("public");
            public.exists().then_some(public)
        })
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .compact()
        .init();

    let downloads_dir = get_downloads_dir();
    std::fs::create_dir_all(&downloads_dir)?;

    let fetcher = MediaFetcher::from_env();
    tracing::info!(bin = %fetcher.bin().display(), "using media fetcher");

    let state = AppState::new(fetcher, MediaNormalizer::from_env(), downloads_dir);
    spawn_reaper(state.store.clone());

    let app = create_app(state, get_static_dir());

    let port = get_port();
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    eprintln!("\nvidgrab v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("  \u{2192} http://localhost:{port}\n");

    axum::serve(listener, app).await?;

    Ok(())
}
