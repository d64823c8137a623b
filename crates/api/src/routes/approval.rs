use axum::routing::{get, post};
use axum::Router;

use crate::handlers::approval;
use crate::state::AppState;

/// Approval-scoped routes, nested under `/approvals`.
///
/// ```text
/// GET    /{approval_id}                    get_approval
/// POST   /{approval_id}/decision           decide
/// POST   /{approval_id}/remaining-views    generate_remaining_views
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/{approval_id}", get(approval::get_approval))
        .route("/{approval_id}/decision", post(approval::decide))
        .route(
            "/{approval_id}/remaining-views",
            post(approval::generate_remaining_views),
        )
}
