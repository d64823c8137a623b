//! Caller identity extractor.
//!
//! Authentication happens upstream; the gateway forwards the authenticated
//! user's id in the `X-User-Id` header.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use atelier_core::error::CoreError;
use atelier_core::types::DbId;

use crate::error::AppError;

/// Header carrying the authenticated user's id.
pub const USER_ID_HEADER: &str = "x-user-id";

/// The user on whose behalf the request runs.
///
/// ```ignore
/// async fn my_handler(caller: Caller) -> AppResult<Json<()>> {
///     tracing::info!(user_id = caller.user_id, "handling request");
///     Ok(Json(()))
/// }
/// ```
#[derive(Debug, Clone, Copy)]
pub struct Caller {
    pub user_id: DbId,
}

impl<S: Send + Sync> FromRequestParts<S> for Caller {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let raw = parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| {
                AppError::Core(CoreError::Unauthorized("Missing X-User-Id header".into()))
            })?;

        let user_id: DbId = raw.trim().parse().map_err(|_| {
            AppError::Core(CoreError::Unauthorized("Invalid X-User-Id header".into()))
        })?;
        if user_id <= 0 {
            return Err(AppError::Core(CoreError::Unauthorized(
                "Invalid X-User-Id header".into(),
            )));
        }

        Ok(Caller { user_id })
    }
}
