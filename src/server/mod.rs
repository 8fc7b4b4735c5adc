//! HTTP front door.
//!
//! - `POST /media` enqueues an ingestion and answers 202 immediately.
//! - `POST /media/upload` runs a direct single-attempt upload of a local file
//!   and answers with its result.

mod handlers;

use crate::ingest::Ingestor;
use axum::Router;
use axum::routing::{get, post};
use tower_http::trace::TraceLayer;

pub use handlers::{ErrorBody, IngestAccepted, IngestBody, UploadBody, UploadDone};

/// State shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub ingestor: Ingestor,
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/media", post(handlers::ingest_media))
        .route("/media/upload", post(handlers::upload_media))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind `addr` and serve until the listener fails.
pub async fn start_server(addr: &str, state: AppState) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(addr = %listener.local_addr()?, "listening");
    axum::serve(listener, build_router(state)).await
}
