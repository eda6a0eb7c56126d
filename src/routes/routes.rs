//! Defines routes for media upload and delivery.
//!
//! ## Structure
//! - **Upload**
//!   - `POST /v1/media/upload-file` (raw body, typed by `Content-Type`)
//!
//! - **Delivery**
//!   - `GET /v1/media/image/{id}` images only, whole content
//!   - `GET /v1/media/video/{id}` video/audio, range aware
//!   - `GET /v1/media/resource/{id}` same handler as `video`
//!   - `GET /v1/media/file/{id}` everything else, whole content
//!
//! A record requested through a route that does not serve its kind is
//! reported as 404.

use crate::{
    handlers::{
        health_handlers::{healthz, readyz},
        media_handlers::{get_file, get_image, get_streamable, upload_file},
    },
    services::media_service::MediaService,
};
use axum::{
    Router,
    routing::{get, post},
};

/// Build and return the router for all media routes.
///
/// The router carries shared state (`MediaService`) to all handlers.
pub fn routes() -> Router<MediaService> {
    Router::new()
        // health endpoints (mounted at root)
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .nest("/v1/media", media_routes())
}

fn media_routes() -> Router<MediaService> {
    Router::new()
        .route("/upload-file", post(upload_file))
        .route("/image/{id}", get(get_image))
        .route("/video/{id}", get(get_streamable))
        .route("/resource/{id}", get(get_streamable))
        .route("/file/{id}", get(get_file))
}
