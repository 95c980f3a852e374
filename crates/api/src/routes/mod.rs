pub mod health;
pub mod images;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /images                     list, create (access token)
/// /images/uploads             source image upload (access token)
/// /images/{id}                get (access token)
/// /images/{id}/webhook        provider callback (public)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new().nest("/images", images::router())
}
