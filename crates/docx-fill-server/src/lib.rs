//! HTTP surface for the docx-fill engine.
//!
//! This service:
//! - Receives `.docx` uploads and sends their text to an extraction service
//! - Keeps the original bytes in a session store until they are filled
//! - Fills uploads with answers and streams the resulting document back

pub mod config;
pub mod error;
pub mod extractor;
pub mod handlers;
pub mod session;

use axum::extract::DefaultBodyLimit;
use axum::routing::{delete, get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use handlers::{delete_handler, fill_handler, health_handler, parse_handler, AppState};

/// Build the application router.
pub fn router(state: AppState, max_upload_bytes: usize) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/health", get(health_handler))
        .route("/api/parse", post(parse_handler))
        .route("/api/fill", post(fill_handler))
        .route("/api/files/{id}", delete(delete_handler))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
