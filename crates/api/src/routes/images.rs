//! Route definitions for the `/images` resource.

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;

use crate::handlers::images;
use crate::state::AppState;

/// Largest accepted source image upload.
pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Routes mounted at `/images`.
///
/// ```text
/// GET    /                -> list_images
/// POST   /                -> create_image
/// POST   /uploads         -> upload_source_image
/// GET    /{id}            -> get_image
/// POST   /{id}/webhook    -> provider_webhook
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(images::list_images).post(images::create_image))
        .route(
            "/uploads",
            post(images::upload_source_image).layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)),
        )
        .route("/{id}", get(images::get_image))
        .route("/{id}/webhook", post(images::provider_webhook))
}
