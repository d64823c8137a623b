//! Handlers for product-scoped workflow operations: front-view generation
//! and revision commits.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};

use atelier_core::types::DbId;
use atelier_core::views::AllViews;
use atelier_pipeline::{ActiveRevision, FrontViewRequest, RevisionRequest};

use crate::error::AppResult;
use crate::middleware::caller::Caller;
use crate::response::SuccessResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct FrontViewBody {
    pub prompt: String,
    #[serde(default)]
    pub is_edit: bool,
    pub previous_front_view_url: Option<String>,
    pub session_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RevisionBody {
    pub approval_id: DbId,
    pub views: AllViews,
    pub is_initial: bool,
    pub edit_prompt: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ActiveRevisionResponse {
    pub revision: Option<ActiveRevision>,
}

/// POST /api/v1/products/{product_id}/front-view
///
/// Generate a front view. Returns 201 for a new approval row and 200 when a
/// duplicate submission resolved to an existing one.
pub async fn generate_front_view(
    caller: Caller,
    State(state): State<AppState>,
    Path(product_id): Path<DbId>,
    Json(input): Json<FrontViewBody>,
) -> AppResult<impl IntoResponse> {
    let outcome = state
        .workflow
        .generate_front_view(FrontViewRequest {
            product_id,
            user_id: caller.user_id,
            prompt: input.prompt,
            is_edit: input.is_edit,
            previous_front_view_url: input.previous_front_view_url,
            session_id: input.session_id,
        })
        .await?;

    let status = if outcome.duplicate {
        StatusCode::OK
    } else {
        StatusCode::CREATED
    };
    Ok((status, Json(SuccessResponse::new(outcome))))
}

/// POST /api/v1/products/{product_id}/revisions
///
/// Commit five approved views as the product's new active revision.
pub async fn create_revision(
    caller: Caller,
    State(state): State<AppState>,
    Path(product_id): Path<DbId>,
    Json(input): Json<RevisionBody>,
) -> AppResult<impl IntoResponse> {
    let outcome = state
        .workflow
        .create_revision_after_approval(RevisionRequest {
            user_id: caller.user_id,
            product_id,
            approval_id: input.approval_id,
            views: input.views,
            is_initial: input.is_initial,
            edit_prompt: input.edit_prompt,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(SuccessResponse::new(outcome))))
}

/// GET /api/v1/products/{product_id}/revisions/active
pub async fn get_active_revision(
    caller: Caller,
    State(state): State<AppState>,
    Path(product_id): Path<DbId>,
) -> AppResult<Json<SuccessResponse<ActiveRevisionResponse>>> {
    let revision = state
        .workflow
        .active_revision(caller.user_id, product_id)
        .await?;
    Ok(Json(SuccessResponse::new(ActiveRevisionResponse { revision })))
}
