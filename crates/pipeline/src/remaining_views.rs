//! Phase 3: back, side, top and bottom views from an approved front view.
//!
//! The back view is generated first and alone. Side, top and bottom then
//! run concurrently, each referencing the front and the new back. Every view
//! settles independently: a failure leaves that view empty and never aborts
//! the batch.

use std::collections::HashMap;

use atelier_core::credits::REASON_REMAINING_VIEWS;
use atelier_core::features::ExtractedFeatures;
use atelier_core::prompt::build_view_prompt;
use atelier_core::types::{Credits, DbId};
use atelier_core::views::{RemainingViewUrls, ViewType};
use atelier_core::workflow::GenerationState;
use atelier_db::models::approval::{FrontViewApproval, RecordRemainingViews};
use atelier_db::models::status::ApprovalStatus;
use futures::future::join_all;
use serde::Serialize;

use crate::error::WorkflowError;
use crate::ports::GenerationRequest;
use crate::workflow::{detached, release_state, Workflow};

#[derive(Debug, Clone)]
pub struct RemainingViewsRequest {
    pub user_id: DbId,
    pub approval_id: DbId,
    /// Approved front view. Blank falls back to the one stored on the row.
    pub front_view_url: String,
    /// Prior revision whose views guide pose and camera angle only.
    pub selected_revision_number: Option<i32>,
}

/// A view that was generated and uploaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GeneratedView {
    pub view: ViewType,
    pub url: String,
    pub thumbnail_url: Option<String>,
    pub model: String,
}

/// Why a single view came back empty.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GenerationFailure {
    #[error("Failed to generate {view} view: {cause}")]
    Generate { view: ViewType, cause: String },

    #[error("Failed to upload {view} view: {cause}")]
    Upload { view: ViewType, cause: String },
}

impl GenerationFailure {
    pub fn view(&self) -> ViewType {
        match self {
            GenerationFailure::Generate { view, .. } | GenerationFailure::Upload { view, .. } => {
                *view
            }
        }
    }
}

pub type ViewResult = Result<GeneratedView, GenerationFailure>;

#[derive(Debug, Clone, Serialize)]
pub struct RemainingViewsOutcome {
    pub approval_id: DbId,
    /// Always four keys; failed views are empty strings.
    pub views: RemainingViewUrls,
    pub failed_views: Vec<ViewType>,
    pub credits_reserved: Credits,
    pub credits_refunded: Credits,
}

/// Inputs shared by every view of one batch.
struct ViewContext<'a> {
    product_id: DbId,
    product_prompt: &'a str,
    front_view_url: &'a str,
    features: &'a ExtractedFeatures,
    structural: HashMap<ViewType, String>,
}

/// Fold per-view results into the public shape: four URLs plus the views
/// that failed.
pub fn collect_results(results: &[ViewResult]) -> (RemainingViewUrls, Vec<ViewType>) {
    let mut urls = RemainingViewUrls::default();
    let mut failed = Vec::new();
    for result in results {
        match result {
            Ok(view) => urls.set(view.view, view.url.clone()),
            Err(failure) => failed.push(failure.view()),
        }
    }
    (urls, failed)
}

impl Workflow {
    /// Generate the four remaining views for an approved front view.
    ///
    /// Charged once for the batch. If all four views fail the charge is
    /// refunded; partial failures are reported as empty URLs.
    pub async fn generate_remaining_views(
        &self,
        request: RemainingViewsRequest,
    ) -> Result<RemainingViewsOutcome, WorkflowError> {
        let this = self.clone();
        detached("remaining views", async move {
            this.remaining_views_phase(request).await
        })
        .await
    }

    async fn remaining_views_phase(
        &self,
        request: RemainingViewsRequest,
    ) -> Result<RemainingViewsOutcome, WorkflowError> {
        let approval = self
            .get_approval(request.user_id, request.approval_id)
            .await?;
        if approval.status() != Some(ApprovalStatus::Approved) {
            return Err(WorkflowError::InvalidState(format!(
                "Front view {} must be approved before generating remaining views",
                approval.id
            )));
        }
        let claimed_from = self
            .claim(&approval, GenerationState::GeneratingRemaining)
            .await?;

        let reservation = match self
            .reserve(
                request.user_id,
                self.config.remaining_views_cost,
                REASON_REMAINING_VIEWS,
            )
            .await
        {
            Ok(reservation) => reservation,
            Err(e) => {
                let restore = release_state(claimed_from, GenerationState::GeneratingRemaining);
                self.record_state(approval.id, restore).await;
                return Err(e);
            }
        };

        let results = self.generate_batch(&approval, &request).await;
        let (views, failed_views) = collect_results(&results);

        let all_failed = failed_views.len() == ViewType::REMAINING.len();
        let credits_refunded = if all_failed {
            tracing::warn!(
                approval_id = approval.id,
                "Every remaining view failed, refunding batch credits",
            );
            self.refund(&reservation, "all remaining views failed").await;
            reservation.amount
        } else {
            0
        };

        let record = RecordRemainingViews {
            urls: views.clone(),
            credits_reserved: reservation.amount,
            credits_consumed: reservation.amount - credits_refunded,
        };
        if let Err(e) = self
            .persist("remaining views", |_| {
                self.ports
                    .approvals
                    .record_remaining_views(approval.id, &record)
            })
            .await
        {
            if !all_failed {
                self.refund(&reservation, "remaining views not saved").await;
            }
            self.record_state(approval.id, GenerationState::Error).await;
            return Err(e);
        }

        self.record_state(approval.id, GenerationState::FrontApproved)
            .await;

        tracing::info!(
            approval_id = approval.id,
            generated = views.populated(),
            failed = failed_views.len(),
            "Remaining views generated",
        );

        Ok(RemainingViewsOutcome {
            approval_id: approval.id,
            views,
            failed_views,
            credits_reserved: reservation.amount,
            credits_refunded,
        })
    }

    /// Back first, then side/top/bottom concurrently. Results are in
    /// [`ViewType::REMAINING`] order.
    async fn generate_batch(
        &self,
        approval: &FrontViewApproval,
        request: &RemainingViewsRequest,
    ) -> Vec<ViewResult> {
        let front_view_url = if request.front_view_url.trim().is_empty() {
            approval.front_view_url.as_str()
        } else {
            request.front_view_url.trim()
        };

        let features = match approval.features() {
            Some(cached) => cached,
            None => self.extract_or_default(front_view_url, approval.id).await,
        };

        let structural = match request.selected_revision_number {
            Some(revision) => {
                self.structural_references(approval.product_id, approval.user_id, revision)
                    .await
            }
            None => HashMap::new(),
        };

        let ctx = ViewContext {
            product_id: approval.product_id,
            product_prompt: &approval.prompt,
            front_view_url,
            features: &features,
            structural,
        };

        let back = self.generate_view(&ctx, ViewType::Back, None).await;
        let back_url = back.as_ref().ok().map(|v| v.url.as_str());
        if back_url.is_none() {
            tracing::warn!(
                approval_id = approval.id,
                "Back view failed; dependent views use the front view only",
            );
        }

        let dependent = join_all(
            ViewType::DEPENDENT
                .into_iter()
                .map(|view| self.generate_view(&ctx, view, back_url)),
        )
        .await;

        let mut results = Vec::with_capacity(ViewType::REMAINING.len());
        results.push(back);
        results.extend(dependent);
        results
    }

    /// Generate and upload one view. Never fails the batch.
    async fn generate_view(
        &self,
        ctx: &ViewContext<'_>,
        view: ViewType,
        back_url: Option<&str>,
    ) -> ViewResult {
        let structural = ctx.structural.get(&view).cloned();
        let request = GenerationRequest {
            prompt: build_view_prompt(view, ctx.product_prompt, ctx.features, structural.is_some()),
            reference_image: Some(ctx.front_view_url.to_string()),
            additional_reference_image: back_url.map(str::to_string),
            structural_reference: structural,
            view,
            style: self.config.style.clone(),
            options: self.config.generation.clone(),
        };

        let generated = match self.ports.generator.generate(&request).await {
            Ok(generated) => generated,
            Err(e) => {
                tracing::warn!(view = %view, error = %e, "View generation failed");
                return Err(GenerationFailure::Generate {
                    view,
                    cause: e.to_string(),
                });
            }
        };

        let uploaded = match self
            .ports
            .object_store
            .upload(&generated.url, &self.upload_options(ctx.product_id))
            .await
        {
            Ok(uploaded) => uploaded,
            Err(e) => {
                tracing::warn!(view = %view, error = %e, "View upload failed");
                return Err(GenerationFailure::Upload {
                    view,
                    cause: e.to_string(),
                });
            }
        };

        Ok(GeneratedView {
            view,
            url: uploaded.url,
            thumbnail_url: uploaded.thumbnail_url,
            model: generated.model,
        })
    }

    /// Per-view URLs of a prior revision, for pose guidance only. Missing or
    /// unreadable revisions yield no references.
    async fn structural_references(
        &self,
        product_id: DbId,
        user_id: DbId,
        revision_number: i32,
    ) -> HashMap<ViewType, String> {
        let rows = match self
            .ports
            .revisions
            .find_revision(product_id, user_id, revision_number)
            .await
        {
            Ok(rows) => rows,
            Err(e) => {
                tracing::warn!(
                    product_id,
                    revision_number,
                    error = %e,
                    "Structural reference lookup failed, continuing without",
                );
                return HashMap::new();
            }
        };

        rows.into_iter()
            .filter(|row| !row.image_url.trim().is_empty())
            .filter_map(|row| {
                let view: ViewType = row.view_type.parse().ok()?;
                (view != ViewType::Front).then_some((view, row.image_url))
            })
            .collect()
    }
}
