//! Phase 4: commit a complete five-view batch as the product's active
//! revision.

use atelier_core::revision::missing_views;
use atelier_core::types::DbId;
use atelier_core::views::AllViews;
use atelier_core::workflow::GenerationState;
use atelier_db::models::approval::FrontViewApproval;
use atelier_db::models::revision::{CommittedBatch, NewRevisionBatch, NewRevisionView};
use atelier_db::models::status::ApprovalStatus;
use atelier_db::models::upload_history::{CreateUploadHistory, SOURCE_REVISION};
use serde::Serialize;
use serde_json::json;
use uuid::Uuid;

use crate::error::WorkflowError;
use crate::workflow::{detached, Workflow};

#[derive(Debug, Clone)]
pub struct RevisionRequest {
    pub user_id: DbId,
    pub product_id: DbId,
    pub approval_id: DbId,
    pub views: AllViews,
    pub is_initial: bool,
    pub edit_prompt: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RevisionOutcome {
    pub revision_number: i32,
    pub batch_id: Uuid,
    pub revision_ids: Vec<DbId>,
    /// Whether the images were mirrored into the upload history.
    pub history_recorded: bool,
}

impl Workflow {
    /// Commit the five views as a new batch and deactivate the previous one.
    ///
    /// Refuses incomplete batches before touching anything. No credits move
    /// in this phase.
    pub async fn create_revision_after_approval(
        &self,
        request: RevisionRequest,
    ) -> Result<RevisionOutcome, WorkflowError> {
        let this = self.clone();
        detached("revision", async move { this.revision_phase(request).await }).await
    }

    async fn revision_phase(
        &self,
        request: RevisionRequest,
    ) -> Result<RevisionOutcome, WorkflowError> {
        let missing = missing_views(&request.views);
        if !missing.is_empty() {
            return Err(WorkflowError::IncompleteBatch { missing });
        }

        let approval = self
            .get_approval(request.user_id, request.approval_id)
            .await?;
        if approval.product_id != request.product_id {
            return Err(WorkflowError::Validation(format!(
                "Approval {} does not belong to product {}",
                approval.id, request.product_id
            )));
        }
        if approval.status() != Some(ApprovalStatus::Approved) {
            return Err(WorkflowError::InvalidState(format!(
                "Front view {} must be approved before creating a revision",
                approval.id
            )));
        }
        self.claim(&approval, GenerationState::CreatingRevision).await?;

        let batch = self.build_batch(&request, &approval);
        let committed = match self
            .persist("revision batch", |_| self.ports.revisions.commit_batch(&batch))
            .await
        {
            Ok(committed) => committed,
            Err(e) => {
                tracing::error!(
                    approval_id = approval.id,
                    product_id = request.product_id,
                    error = %e,
                    "Revision commit failed",
                );
                self.record_state(approval.id, GenerationState::Error).await;
                return Err(e);
            }
        };

        if let Err(e) = self
            .persist("approval completion", |_| {
                self.ports.approvals.mark_completed(approval.id)
            })
            .await
        {
            tracing::error!(
                approval_id = approval.id,
                batch_id = %committed.batch_id,
                error = %e,
                "Batch committed but approval not marked completed",
            );
        }

        let history_recorded = self.mirror_upload_history(&committed).await;

        tracing::info!(
            approval_id = approval.id,
            product_id = request.product_id,
            revision_number = committed.revision_number,
            batch_id = %committed.batch_id,
            "Revision created",
        );

        Ok(RevisionOutcome {
            revision_number: committed.revision_number,
            batch_id: committed.batch_id,
            revision_ids: committed.revision_ids(),
            history_recorded,
        })
    }

    fn build_batch(&self, request: &RevisionRequest, approval: &FrontViewApproval) -> NewRevisionBatch {
        let ai_parameters = json!({
            "style": self.config.style,
            "prompt": approval.prompt,
        });
        let metadata = json!({
            "approval_id": approval.id,
            "iteration_number": approval.iteration_number,
            "session_id": approval.session_id,
        });

        NewRevisionBatch {
            product_id: request.product_id,
            user_id: request.user_id,
            is_initial: request.is_initial,
            front_view_approval_id: Some(approval.id),
            edit_prompt: request
                .edit_prompt
                .clone()
                .filter(|p| !p.trim().is_empty()),
            ai_model: self.config.generation.preferred_model.clone(),
            views: request
                .views
                .iter()
                .map(|(view_type, url)| NewRevisionView {
                    view_type,
                    image_url: url.to_string(),
                    thumbnail_url: None,
                    ai_parameters: Some(ai_parameters.clone()),
                    metadata: Some(metadata.clone()),
                })
                .collect(),
        }
    }

    /// Mirror committed images into the upload history. Failures are logged.
    async fn mirror_upload_history(&self, committed: &CommittedBatch) -> bool {
        let entries: Vec<CreateUploadHistory> = committed
            .rows
            .iter()
            .map(|row| CreateUploadHistory {
                user_id: row.user_id,
                product_id: row.product_id,
                revision_id: Some(row.id),
                view_type: row.view_type.clone(),
                image_url: row.image_url.clone(),
                thumbnail_url: row.thumbnail_url.clone(),
                source: SOURCE_REVISION.to_string(),
            })
            .collect();

        match self.ports.upload_history.record(&entries).await {
            Ok(_) => true,
            Err(e) => {
                tracing::warn!(
                    batch_id = %committed.batch_id,
                    error = %e,
                    "Failed to mirror revision into upload history",
                );
                false
            }
        }
    }
}
