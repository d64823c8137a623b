//! Handlers for approval-scoped workflow operations: reading an approval,
//! the approve/edit decision, and remaining-view generation.

use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use atelier_core::approval::DecisionAction;
use atelier_core::types::DbId;
use atelier_db::models::approval::FrontViewApproval;
use atelier_pipeline::{DecisionOutcome, RemainingViewsOutcome, RemainingViewsRequest};

use crate::error::AppResult;
use crate::middleware::caller::Caller;
use crate::response::SuccessResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct DecisionBody {
    pub action: DecisionAction,
    pub edit_feedback: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RemainingViewsBody {
    /// Blank uses the front view stored on the approval.
    #[serde(default)]
    pub front_view_url: String,
    pub selected_revision_number: Option<i32>,
}

/// An approval row with its status and workflow state spelled out.
#[derive(Debug, Serialize)]
pub struct ApprovalResponse {
    #[serde(flatten)]
    pub approval: FrontViewApproval,
    pub status: Option<&'static str>,
    pub state: Option<&'static str>,
}

/// GET /api/v1/approvals/{approval_id}
pub async fn get_approval(
    caller: Caller,
    State(state): State<AppState>,
    Path(approval_id): Path<DbId>,
) -> AppResult<Json<SuccessResponse<ApprovalResponse>>> {
    let approval = state
        .workflow
        .get_approval(caller.user_id, approval_id)
        .await?;

    Ok(Json(SuccessResponse::new(ApprovalResponse {
        status: approval.status().map(|s| s.as_str()),
        state: approval.state().map(|s| s.as_str()),
        approval,
    })))
}

/// POST /api/v1/approvals/{approval_id}/decision
///
/// Approve the pending front view, or reject it with feedback and
/// regenerate.
pub async fn decide(
    caller: Caller,
    State(state): State<AppState>,
    Path(approval_id): Path<DbId>,
    Json(input): Json<DecisionBody>,
) -> AppResult<Json<SuccessResponse<DecisionOutcome>>> {
    let outcome = state
        .workflow
        .handle_decision(
            caller.user_id,
            approval_id,
            input.action,
            input.edit_feedback.as_deref(),
        )
        .await?;

    tracing::info!(
        user_id = caller.user_id,
        approval_id,
        action = input.action.as_str(),
        "Front-view decision applied"
    );

    Ok(Json(SuccessResponse::new(outcome)))
}

/// POST /api/v1/approvals/{approval_id}/remaining-views
///
/// Generate back, side, top and bottom views. Succeeds even when some views
/// failed; those come back as empty strings.
pub async fn generate_remaining_views(
    caller: Caller,
    State(state): State<AppState>,
    Path(approval_id): Path<DbId>,
    Json(input): Json<RemainingViewsBody>,
) -> AppResult<Json<SuccessResponse<RemainingViewsOutcome>>> {
    let outcome = state
        .workflow
        .generate_remaining_views(RemainingViewsRequest {
            user_id: caller.user_id,
            approval_id,
            front_view_url: input.front_view_url,
            selected_revision_number: input.selected_revision_number,
        })
        .await?;

    Ok(Json(SuccessResponse::new(outcome)))
}
