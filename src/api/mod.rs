//! HTTP API: axum server exposing the allocator and journey tracker as JSON.
//!
//! CORS is enabled so a browser front-end on another origin can call it.

pub mod routes;

use anyhow::{Context, Result};
use axum::{
    http::{header, HeaderValue, Method},
    routing::{delete, get, post},
    Router,
};
use tower_http::cors::CorsLayer;
use tracing::info;

pub use routes::{ApiError, ApiState, AppState};

/// Bind `host:port` and serve until the process is stopped.
pub async fn serve(state: AppState, host: &str, port: u16) -> Result<()> {
    let app = build_router(state);
    let addr = format!("{host}:{port}");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!(addr = %addr, "API server listening on http://{addr}");

    axum::serve(listener, app).await.context("API server error")?;
    Ok(())
}

/// Build the Axum router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(HeaderValue::from_static("*"))
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        .route("/api/allocate", post(routes::allocate))
        .route("/api/reallocate", post(routes::reallocate))
        .route(
            "/api/journey/:key",
            get(routes::get_journey).delete(routes::clear_journey),
        )
        .route("/api/journey/:key/entries", post(routes::add_entry))
        .route(
            "/api/journey/:key/entries/:book/:id",
            delete(routes::remove_entry),
        )
        .route("/api/journey/:key/progress", post(routes::progress))
        .route("/health", get(routes::health))
        .layer(cors)
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
