//! HTTP server: Axum router exposing the scan, chat and analyze endpoints.
//!
//! Any path that is not an API route is served from the static directory.
//! CORS is open for browser frontends hosted elsewhere.

pub mod error;
pub mod routes;

use anyhow::{Context, Result};
use axum::{
    http::{header, Method},
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::info;

pub use routes::{AppState, ServerState};

/// Build the Axum router with all routes and middleware.
pub fn build_router(state: AppState, static_dir: &str) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        .route("/api/scan", get(routes::scan))
        .route("/api/scan/report", get(routes::scan_report))
        .route("/api/chat", post(routes::chat))
        .route("/api/analyze", post(routes::analyze))
        .route("/health", get(routes::health))
        .fallback_service(ServeDir::new(static_dir))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Bind `port` and serve until Ctrl+C.
pub async fn serve(state: AppState, port: u16, static_dir: &str) -> Result<()> {
    let app = build_router(state, static_dir);
    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind port {port}"))?;

    info!(port, "AWARE backend running on http://localhost:{port}");
    info!("API available at http://localhost:{port}/api");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutdown signal received.");
        })
        .await
        .context("HTTP server error")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
