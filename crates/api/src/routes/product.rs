use axum::routing::{get, post};
use axum::Router;

use crate::handlers::product;
use crate::state::AppState;

/// Product-scoped routes, nested under `/products`.
///
/// ```text
/// POST   /{product_id}/front-view          generate_front_view
/// POST   /{product_id}/revisions           create_revision
/// GET    /{product_id}/revisions/active    get_active_revision
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/{product_id}/front-view", post(product::generate_front_view))
        .route("/{product_id}/revisions", post(product::create_revision))
        .route(
            "/{product_id}/revisions/active",
            get(product::get_active_revision),
        )
}
