//! Media upload and range-aware delivery over HTTP.
//!
//! Metadata lives in SQLite (`services::metadata_store`), payloads on local
//! disk (`services::blob_store`). `services::media_service` ties the two
//! together and the handlers turn its deliveries into 200/206 responses.

pub mod config;
pub mod db;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod services;

use axum::Router;
use services::media_service::MediaService;
use tower_http::trace::TraceLayer;

/// Full application router with state and request tracing attached.
pub fn app(service: MediaService) -> Router {
    routes::routes::routes()
        .layer(TraceLayer::new_for_http())
        .with_state(service)
}
