//! Front-view approval model and DTOs.

use atelier_core::features::ExtractedFeatures;
use atelier_core::types::{Credits, DbId, Timestamp};
use atelier_core::views::RemainingViewUrls;
use atelier_core::workflow::GenerationState;
use serde::Serialize;
use sqlx::FromRow;

use crate::models::status::{ApprovalStatus, StatusId};

/// A row from the `front_view_approvals` table.
///
/// One row per generation attempt. Edits never mutate an earlier row's
/// image; they reject it and insert a new row with the next iteration.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct FrontViewApproval {
    pub id: DbId,
    pub user_id: DbId,
    pub product_id: DbId,
    pub session_id: String,
    pub front_view_url: String,
    pub prompt: String,
    pub reference_image_url: Option<String>,
    pub status_id: StatusId,
    pub workflow_state: i16,
    pub iteration_number: i32,
    pub credits_reserved: Credits,
    pub credits_consumed: Credits,
    pub is_initial_generation: bool,
    pub user_feedback: Option<String>,
    pub rejection_reason: Option<String>,
    pub extracted_features: Option<serde_json::Value>,
    pub back_view_url: Option<String>,
    pub side_view_url: Option<String>,
    pub top_view_url: Option<String>,
    pub bottom_view_url: Option<String>,
    pub approved_at: Option<Timestamp>,
    pub rejected_at: Option<Timestamp>,
    pub completed_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl FrontViewApproval {
    pub fn status(&self) -> Option<ApprovalStatus> {
        ApprovalStatus::from_id(self.status_id)
    }

    pub fn state(&self) -> Option<GenerationState> {
        GenerationState::from_id(self.workflow_state)
    }

    /// Cached features, if extraction has completed and the JSON parses.
    pub fn features(&self) -> Option<ExtractedFeatures> {
        self.extracted_features
            .as_ref()
            .and_then(ExtractedFeatures::from_json)
    }

    /// The remaining-view URLs recorded so far; missing views are empty.
    pub fn remaining_view_urls(&self) -> RemainingViewUrls {
        RemainingViewUrls {
            back: self.back_view_url.clone().unwrap_or_default(),
            side: self.side_view_url.clone().unwrap_or_default(),
            top: self.top_view_url.clone().unwrap_or_default(),
            bottom: self.bottom_view_url.clone().unwrap_or_default(),
        }
    }
}

/// DTO for inserting a new pending approval row.
///
/// The iteration number is assigned by the repository at insert time.
#[derive(Debug, Clone)]
pub struct CreateFrontViewApproval {
    pub user_id: DbId,
    pub product_id: DbId,
    pub session_id: String,
    pub front_view_url: String,
    pub prompt: String,
    pub reference_image_url: Option<String>,
    pub credits_reserved: Credits,
    pub credits_consumed: Credits,
    pub is_initial_generation: bool,
}

/// Incremental update after remaining views are generated.
///
/// Empty URLs leave the stored value untouched; credit figures are added to
/// the running totals.
#[derive(Debug, Clone, Default)]
pub struct RecordRemainingViews {
    pub urls: RemainingViewUrls,
    pub credits_reserved: Credits,
    pub credits_consumed: Credits,
}
