//! Shared response envelope for API handlers.
//!
//! Successful responses are `{ "success": true, ...payload }`; failures are
//! rendered by [`crate::error::AppError`] as `{ "success": false, ... }`.

use serde::Serialize;

/// Standard success envelope. The payload's fields are flattened next to
/// `success`, so `T` must serialize as a map.
///
/// ```ignore
/// Ok(Json(SuccessResponse::new(outcome)))
/// ```
#[derive(Debug, Serialize)]
pub struct SuccessResponse<T: Serialize> {
    pub success: bool,
    #[serde(flatten)]
    pub data: T,
}

impl<T: Serialize> SuccessResponse<T> {
    pub fn new(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}
