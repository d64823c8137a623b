pub mod approval;
pub mod health;
pub mod product;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// ```text
/// /products/{product_id}/front-view          generate front view (POST)
/// /products/{product_id}/revisions           commit revision batch (POST)
/// /products/{product_id}/revisions/active    active batch (GET)
///
/// /approvals/{approval_id}                   read approval (GET)
/// /approvals/{approval_id}/decision          approve or edit (POST)
/// /approvals/{approval_id}/remaining-views   generate remaining views (POST)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/products", product::router())
        .nest("/approvals", approval::router())
}
