//! Phase 1 (front-view generation) and phase 2 (approve or edit).

use std::sync::Arc;

use atelier_core::approval::{
    duplicate_window_start, is_within_duplicate_window, validate_edit_feedback, DecisionAction,
};
use atelier_core::credits::{REASON_FRONT_VIEW, REASON_FRONT_VIEW_EDIT};
use atelier_core::features::ExtractedFeatures;
use atelier_core::generation::{resolve_reference, validate_front_view_request, ResolvedReference};
use atelier_core::prompt::{build_edit_prompt, build_front_view_prompt};
use atelier_core::types::{Credits, DbId};
use atelier_core::views::ViewType;
use atelier_core::workflow::GenerationState;
use atelier_db::models::approval::{CreateFrontViewApproval, FrontViewApproval};
use atelier_db::models::status::ApprovalStatus;
use chrono::Utc;
use serde::Serialize;
use uuid::Uuid;

use crate::error::WorkflowError;
use crate::ports::{ApprovalStore, FeatureExtractor, GenerationRequest, Reservation, UploadOptions};
use crate::workflow::{current_state, detached, Workflow};

// ---------------------------------------------------------------------------
// Requests and outcomes
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct FrontViewRequest {
    pub product_id: DbId,
    pub user_id: DbId,
    pub prompt: String,
    pub is_edit: bool,
    /// Explicit reference image; on an edit, the previous front view.
    pub previous_front_view_url: Option<String>,
    pub session_id: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FrontViewOutcome {
    pub front_view_url: String,
    pub approval_id: DbId,
    pub session_id: String,
    pub iteration_number: i32,
    pub credits_reserved: Credits,
    /// Set when a duplicate submission returned an existing row.
    pub duplicate: bool,
}

impl FrontViewOutcome {
    fn from_row(row: &FrontViewApproval, duplicate: bool) -> Self {
        Self {
            front_view_url: row.front_view_url.clone(),
            approval_id: row.id,
            session_id: row.session_id.clone(),
            iteration_number: row.iteration_number,
            credits_reserved: row.credits_reserved,
            duplicate,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum DecisionOutcome {
    Approved {
        approval_id: DbId,
        extracted_features: ExtractedFeatures,
    },
    Regenerate {
        new_front_view_url: String,
        new_approval_id: DbId,
        iteration_number: i32,
        credits_reserved: Credits,
    },
}

/// One front-view generation after its credits are reserved.
struct FrontViewJob<'a> {
    user_id: DbId,
    product_id: DbId,
    session_id: String,
    /// Prompt stored on the row.
    prompt: String,
    reference: Option<ResolvedReference>,
    is_initial: bool,
    reservation: &'a Reservation,
}

enum Persisted {
    New(FrontViewApproval),
    /// A racing duplicate landed first; this call's credits must be returned.
    Duplicate(FrontViewApproval),
}

impl Workflow {
    // -----------------------------------------------------------------------
    // Phase 1
    // -----------------------------------------------------------------------

    /// Generate a front view for a product and persist it as a pending
    /// approval.
    ///
    /// Any failure after the reservation refunds it before returning.
    pub async fn generate_front_view(
        &self,
        request: FrontViewRequest,
    ) -> Result<FrontViewOutcome, WorkflowError> {
        let this = self.clone();
        detached("front view", async move { this.front_view_phase(request).await }).await
    }

    async fn front_view_phase(
        &self,
        request: FrontViewRequest,
    ) -> Result<FrontViewOutcome, WorkflowError> {
        validate_front_view_request(request.product_id, &request.prompt)?;
        let is_initial = !request.is_edit;

        if is_initial {
            if let Some(existing) = self
                .find_duplicate(request.product_id, request.user_id)
                .await
            {
                tracing::info!(
                    approval_id = existing.id,
                    product_id = request.product_id,
                    user_id = request.user_id,
                    "Duplicate front-view submission, returning existing approval",
                );
                return Ok(FrontViewOutcome::from_row(&existing, true));
            }
        }

        let product_reference = if request
            .previous_front_view_url
            .as_deref()
            .is_some_and(|u| !u.trim().is_empty())
        {
            None
        } else {
            self.product_reference(request.product_id, request.user_id).await
        };
        let reference = resolve_reference(
            request.previous_front_view_url.as_deref(),
            product_reference.as_deref(),
        );

        let reason = if is_initial {
            REASON_FRONT_VIEW
        } else {
            REASON_FRONT_VIEW_EDIT
        };
        let reservation = self
            .reserve(request.user_id, self.config.front_view_cost, reason)
            .await?;

        let session_id = request
            .session_id
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        let job = FrontViewJob {
            user_id: request.user_id,
            product_id: request.product_id,
            session_id,
            prompt: request.prompt.trim().to_string(),
            reference,
            is_initial,
            reservation: &reservation,
        };

        match self.run_front_view_job(job).await {
            Ok(Persisted::New(row)) => Ok(FrontViewOutcome::from_row(&row, false)),
            Ok(Persisted::Duplicate(row)) => {
                self.refund(&reservation, "duplicate front view").await;
                Ok(FrontViewOutcome::from_row(&row, true))
            }
            Err(e) => {
                tracing::error!(
                    product_id = request.product_id,
                    user_id = request.user_id,
                    error = %e,
                    "Front-view generation failed",
                );
                self.refund(&reservation, "front view failed").await;
                Err(e)
            }
        }
    }

    // -----------------------------------------------------------------------
    // Phase 2
    // -----------------------------------------------------------------------

    /// Apply the user's decision on a pending front view.
    pub async fn handle_decision(
        &self,
        user_id: DbId,
        approval_id: DbId,
        action: DecisionAction,
        edit_feedback: Option<&str>,
    ) -> Result<DecisionOutcome, WorkflowError> {
        let this = self.clone();
        let edit_feedback = edit_feedback.map(str::to_string);
        detached("decision", async move {
            match action {
                DecisionAction::Approve => this.approve(user_id, approval_id).await,
                DecisionAction::Edit => match validate_edit_feedback(edit_feedback.as_deref()) {
                    Ok(feedback) => this.edit(user_id, approval_id, feedback).await,
                    Err(e) => Err(WorkflowError::from(e)),
                },
            }
        })
        .await
    }

    async fn approve(
        &self,
        user_id: DbId,
        approval_id: DbId,
    ) -> Result<DecisionOutcome, WorkflowError> {
        let approval = self.get_approval(user_id, approval_id).await?;
        ensure_pending(&approval)?;
        current_state(&approval).transition_to(GenerationState::FrontApproved)?;

        let features = match approval.features() {
            Some(cached) => cached,
            None => self.extract_or_default(&approval.front_view_url, approval_id).await,
        };

        let approved = self
            .persist("approval", |_| {
                self.ports.approvals.mark_approved(approval_id, &features)
            })
            .await?;
        if approved.is_none() {
            return Err(WorkflowError::InvalidState(
                "Front view is no longer awaiting approval".to_string(),
            ));
        }

        tracing::info!(approval_id, user_id, "Front view approved");
        Ok(DecisionOutcome::Approved {
            approval_id,
            extracted_features: features,
        })
    }

    async fn edit(
        &self,
        user_id: DbId,
        approval_id: DbId,
        feedback: &str,
    ) -> Result<DecisionOutcome, WorkflowError> {
        let approval = self.get_approval(user_id, approval_id).await?;
        ensure_pending(&approval)?;
        current_state(&approval).transition_to(GenerationState::GeneratingFront)?;

        let reservation = self
            .reserve(user_id, self.config.front_view_cost, REASON_FRONT_VIEW_EDIT)
            .await?;

        let rejected = match self
            .persist("rejection", |_| {
                self.ports.approvals.mark_rejected(approval_id, feedback)
            })
            .await
        {
            Ok(Some(row)) => row,
            Ok(None) => {
                self.refund(&reservation, "edit on non-pending approval").await;
                return Err(WorkflowError::InvalidState(
                    "Front view is no longer awaiting approval".to_string(),
                ));
            }
            Err(e) => {
                self.refund(&reservation, "rejection failed").await;
                return Err(e);
            }
        };

        let job = FrontViewJob {
            user_id,
            product_id: rejected.product_id,
            session_id: rejected.session_id.clone(),
            prompt: build_edit_prompt(&rejected.prompt, feedback),
            reference: resolve_reference(Some(&rejected.front_view_url), None),
            is_initial: false,
            reservation: &reservation,
        };

        match self.run_front_view_job(job).await {
            Ok(Persisted::New(row)) | Ok(Persisted::Duplicate(row)) => {
                self.record_state(approval_id, GenerationState::Completed)
                    .await;
                tracing::info!(
                    approval_id,
                    new_approval_id = row.id,
                    iteration = row.iteration_number,
                    "Front view regenerated from feedback",
                );
                Ok(DecisionOutcome::Regenerate {
                    new_front_view_url: row.front_view_url,
                    new_approval_id: row.id,
                    iteration_number: row.iteration_number,
                    credits_reserved: row.credits_reserved,
                })
            }
            Err(e) => {
                tracing::error!(approval_id, user_id, error = %e, "Front-view edit failed");
                self.refund(&reservation, "front view edit failed").await;
                self.record_state(approval_id, GenerationState::Error).await;
                Err(e)
            }
        }
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    /// Generate, upload and persist one front view.
    async fn run_front_view_job(&self, job: FrontViewJob<'_>) -> Result<Persisted, WorkflowError> {
        let state = GenerationState::Idle.transition_to(GenerationState::GeneratingFront)?;

        let request = GenerationRequest {
            prompt: build_front_view_prompt(&job.prompt),
            reference_image: job.reference.as_ref().map(|r| r.url.clone()),
            additional_reference_image: None,
            structural_reference: None,
            view: ViewType::Front,
            style: self.config.style.clone(),
            options: self.config.generation.clone(),
        };

        let generated = self.ports.generator.generate(&request).await.map_err(|e| {
            WorkflowError::Generation {
                view: ViewType::Front,
                cause: e.to_string(),
            }
        })?;

        let uploaded = self
            .ports
            .object_store
            .upload(&generated.url, &self.upload_options(job.product_id))
            .await
            .map_err(|e| WorkflowError::Upload {
                view: ViewType::Front,
                cause: e.to_string(),
            })?;

        if job.is_initial {
            if let Some(existing) = self.find_duplicate(job.product_id, job.user_id).await {
                return Ok(Persisted::Duplicate(existing));
            }
        }

        state.transition_to(GenerationState::AwaitingApproval)?;
        let input = CreateFrontViewApproval {
            user_id: job.user_id,
            product_id: job.product_id,
            session_id: job.session_id,
            front_view_url: uploaded.url,
            prompt: job.prompt,
            reference_image_url: job.reference.map(|r| r.url),
            credits_reserved: job.reservation.amount,
            credits_consumed: job.reservation.amount,
            is_initial_generation: job.is_initial,
        };
        let row = self
            .persist("front view approval", |_| self.ports.approvals.create(&input))
            .await?;

        tracing::info!(
            approval_id = row.id,
            product_id = row.product_id,
            user_id = row.user_id,
            iteration = row.iteration_number,
            model = %generated.model,
            "Front view generated",
        );

        self.spawn_feature_extraction(row.id, row.front_view_url.clone());
        Ok(Persisted::New(row))
    }

    /// Most recent initial row inside the duplicate window, if any.
    ///
    /// Lookup failures are logged and treated as no duplicate.
    async fn find_duplicate(&self, product_id: DbId, user_id: DbId) -> Option<FrontViewApproval> {
        let now = Utc::now();
        let since = duplicate_window_start(now, self.config.duplicate_window_secs);
        match self
            .ports
            .approvals
            .find_recent_initial(product_id, user_id, since)
            .await
        {
            Ok(found) => found.filter(|row| {
                is_within_duplicate_window(row.created_at, now, self.config.duplicate_window_secs)
            }),
            Err(e) => {
                tracing::warn!(product_id, user_id, error = %e, "Duplicate check failed");
                None
            }
        }
    }

    /// Reference image of a product the user owns. Lookup failures fall
    /// back to none.
    async fn product_reference(&self, product_id: DbId, user_id: DbId) -> Option<String> {
        match self.ports.products.reference_image(product_id, user_id).await {
            Ok(reference) => reference,
            Err(e) => {
                tracing::warn!(product_id, user_id, error = %e, "Product reference lookup failed");
                None
            }
        }
    }

    pub(crate) fn upload_options(&self, product_id: DbId) -> UploadOptions {
        UploadOptions {
            project_id: product_id.to_string(),
            preset: self.config.upload_preset.clone(),
            preserve_original: true,
        }
    }

    /// Run extraction, substituting defaults on failure.
    pub(crate) async fn extract_or_default(
        &self,
        image_url: &str,
        approval_id: DbId,
    ) -> ExtractedFeatures {
        match self.ports.extractor.analyze(image_url).await {
            Ok(features) => features,
            Err(e) => {
                tracing::warn!(approval_id, error = %e, "Feature extraction failed, using defaults");
                ExtractedFeatures::default()
            }
        }
    }

    /// Extract and cache features in the background. Never blocks the caller.
    fn spawn_feature_extraction(&self, approval_id: DbId, image_url: String) {
        let extractor: Arc<dyn FeatureExtractor> = Arc::clone(&self.ports.extractor);
        let approvals: Arc<dyn ApprovalStore> = Arc::clone(&self.ports.approvals);

        tokio::spawn(async move {
            let features = match extractor.analyze(&image_url).await {
                Ok(features) => features,
                Err(e) => {
                    tracing::warn!(approval_id, error = %e, "Background feature extraction failed");
                    return;
                }
            };
            match approvals.cache_features(approval_id, &features).await {
                Ok(true) => tracing::debug!(approval_id, "Extracted features cached"),
                Ok(false) => {}
                Err(e) => tracing::warn!(approval_id, error = %e, "Failed to cache features"),
            }
        });
    }
}

fn ensure_pending(approval: &FrontViewApproval) -> Result<(), WorkflowError> {
    if approval.status() != Some(ApprovalStatus::Pending) {
        return Err(WorkflowError::InvalidState(format!(
            "Front view {} is not awaiting approval",
            approval.id
        )));
    }
    Ok(())
}
