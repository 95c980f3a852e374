//! Shared-secret authentication extractor for Axum handlers.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use imagegen_core::error::CoreError;
use sha2::{Digest, Sha256};

use crate::error::AppError;
use crate::state::AppState;

/// Header carrying the client's access token.
pub const ACCESS_TOKEN_HEADER: &str = "access-token";

/// Proof that the request carried the configured access token.
///
/// Add it as an extractor parameter to any handler that requires it:
///
/// ```ignore
/// async fn my_handler(_auth: AccessToken) -> AppResult<Json<()>> {
///     Ok(Json(()))
/// }
/// ```
#[derive(Debug, Clone, Copy)]
pub struct AccessToken;

impl FromRequestParts<AppState> for AccessToken {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let presented = parts
            .headers
            .get(ACCESS_TOKEN_HEADER)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| {
                AppError::Core(CoreError::Unauthorized(
                    "Missing access-token header".into(),
                ))
            })?;

        if !tokens_match(presented, &state.config.access_token) {
            return Err(AppError::Core(CoreError::Unauthorized(
                "Invalid access token".into(),
            )));
        }

        Ok(AccessToken)
    }
}

/// Compare two tokens by their SHA-256 digests.
///
/// Digests have a fixed length, so the comparison does not short-circuit on
/// the length of the presented token.
pub fn tokens_match(presented: &str, expected: &str) -> bool {
    let a = Sha256::digest(presented.as_bytes());
    let b = Sha256::digest(expected.as_bytes());
    a.iter().zip(b.iter()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
