//! The workflow orchestrator: collaborators, shared helpers and read
//! operations. The four phases are implemented in sibling modules as
//! further `impl Workflow` blocks.

use std::future::Future;
use std::sync::Arc;

use atelier_core::retry::retry;
use atelier_core::types::{Credits, DbId};
use atelier_core::workflow::GenerationState;
use atelier_db::models::approval::FrontViewApproval;
use atelier_db::models::revision::RevisionView;
use chrono::Utc;
use serde::Serialize;
use uuid::Uuid;

use crate::config::WorkflowConfig;
use crate::error::WorkflowError;
use crate::pg::PgStore;
use crate::ports::{
    ApprovalStore, CreditLedger, FeatureExtractor, ImageGenerator, ObjectStore, ProductCatalog,
    Reservation, RevisionStore, StoreError, UploadHistory,
};

/// Every collaborator the workflow talks to.
#[derive(Clone)]
pub struct Collaborators {
    pub ledger: Arc<dyn CreditLedger>,
    pub generator: Arc<dyn ImageGenerator>,
    pub object_store: Arc<dyn ObjectStore>,
    pub extractor: Arc<dyn FeatureExtractor>,
    pub approvals: Arc<dyn ApprovalStore>,
    pub revisions: Arc<dyn RevisionStore>,
    pub upload_history: Arc<dyn UploadHistory>,
    pub products: Arc<dyn ProductCatalog>,
}

impl Collaborators {
    /// Wire every storage port to one Postgres store.
    pub fn with_pg_store(
        store: PgStore,
        generator: Arc<dyn ImageGenerator>,
        object_store: Arc<dyn ObjectStore>,
        extractor: Arc<dyn FeatureExtractor>,
    ) -> Self {
        let store = Arc::new(store);
        Self {
            ledger: store.clone(),
            generator,
            object_store,
            extractor,
            approvals: store.clone(),
            revisions: store.clone(),
            upload_history: store.clone(),
            products: store,
        }
    }
}

/// Entry point for the four generation phases.
///
/// Holds no per-request state; every cross-request fact lives in the stores
/// and the ledger. Cheap to clone.
#[derive(Clone)]
pub struct Workflow {
    pub(crate) ports: Collaborators,
    pub(crate) config: Arc<WorkflowConfig>,
}

/// The product's currently active batch.
#[derive(Debug, Clone, Serialize)]
pub struct ActiveRevision {
    pub product_id: DbId,
    pub revision_number: i32,
    pub batch_id: Uuid,
    pub views: Vec<RevisionView>,
}

impl Workflow {
    pub fn new(ports: Collaborators, config: WorkflowConfig) -> Self {
        Self {
            ports,
            config: Arc::new(config),
        }
    }

    pub fn config(&self) -> &WorkflowConfig {
        &self.config
    }

    // -----------------------------------------------------------------------
    // Read operations
    // -----------------------------------------------------------------------

    /// Load an approval owned by `user_id`.
    pub async fn get_approval(
        &self,
        user_id: DbId,
        approval_id: DbId,
    ) -> Result<FrontViewApproval, WorkflowError> {
        self.ports
            .approvals
            .find_for_user(approval_id, user_id)
            .await
            .map_err(|e| WorkflowError::persistence("approval lookup", e))?
            .ok_or(WorkflowError::NotFound {
                entity: "Approval",
                id: approval_id,
            })
    }

    /// The product's active batch committed by `user_id`, or `None` before
    /// the first commit.
    pub async fn active_revision(
        &self,
        user_id: DbId,
        product_id: DbId,
    ) -> Result<Option<ActiveRevision>, WorkflowError> {
        let views = self
            .ports
            .revisions
            .list_active(product_id, user_id)
            .await
            .map_err(|e| WorkflowError::persistence("revision lookup", e))?;

        let Some(first) = views.first() else {
            return Ok(None);
        };
        Ok(Some(ActiveRevision {
            product_id,
            revision_number: first.revision_number,
            batch_id: first.batch_id,
            views,
        }))
    }

    // -----------------------------------------------------------------------
    // Shared helpers
    // -----------------------------------------------------------------------

    pub(crate) async fn reserve(
        &self,
        owner_id: DbId,
        amount: Credits,
        reason: &str,
    ) -> Result<Reservation, WorkflowError> {
        let reservation = self.ports.ledger.reserve(owner_id, amount, reason).await?;
        tracing::info!(
            user_id = owner_id,
            amount,
            reason,
            reservation_id = %reservation.id,
            "Credits reserved",
        );
        Ok(reservation)
    }

    /// Return a reservation in full. Failures are logged; the caller's
    /// outcome is already decided.
    pub(crate) async fn refund(&self, reservation: &Reservation, context: &str) {
        match self
            .ports
            .ledger
            .refund(reservation.owner_id, reservation.id, reservation.amount)
            .await
        {
            Ok(balance_after) => tracing::info!(
                user_id = reservation.owner_id,
                reservation_id = %reservation.id,
                amount = reservation.amount,
                balance_after,
                context,
                "Credits refunded",
            ),
            Err(e) => tracing::error!(
                user_id = reservation.owner_id,
                reservation_id = %reservation.id,
                amount = reservation.amount,
                context,
                error = %e,
                "Refund failed; credits remain reserved",
            ),
        }
    }

    /// Run a persistence call under the configured retry policy, retrying
    /// only transient store errors.
    pub(crate) async fn persist<T, F, Fut>(
        &self,
        operation: &'static str,
        op: F,
    ) -> Result<T, WorkflowError>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, StoreError>>,
    {
        retry(&self.config.persist_policy, operation, StoreError::is_transient, op)
            .await
            .map_err(|e| WorkflowError::persistence(operation, e))
    }

    /// Claim an approval for a phase by moving it to `to`.
    ///
    /// The transition is checked against the snapshot, then written as a
    /// compare-and-set so that only one of several callers holding the same
    /// snapshot proceeds. A row left in `to` by an interrupted run can be
    /// reclaimed once it has not been written for `stale_phase_secs`.
    /// Returns the state the row was claimed from.
    pub(crate) async fn claim(
        &self,
        approval: &FrontViewApproval,
        to: GenerationState,
    ) -> Result<GenerationState, WorkflowError> {
        let from = current_state(approval);
        if from == to && self.is_stale(approval) {
            tracing::warn!(
                approval_id = approval.id,
                state = to.as_str(),
                last_write = %approval.updated_at,
                "Reclaiming approval left mid-phase",
            );
        } else {
            from.transition_to(to)?;
        }

        let claimed = self
            .persist("workflow state", |_| {
                self.ports
                    .approvals
                    .transition_state(approval.id, from, to, approval.updated_at)
            })
            .await?;
        if !claimed {
            return Err(WorkflowError::InvalidState(format!(
                "Front view {} is already being processed",
                approval.id
            )));
        }
        Ok(from)
    }

    fn is_stale(&self, approval: &FrontViewApproval) -> bool {
        (Utc::now() - approval.updated_at).num_seconds() >= self.config.stale_phase_secs
    }

    /// Record a state change. Failures are logged, not surfaced.
    pub(crate) async fn record_state(&self, approval_id: DbId, state: GenerationState) {
        if let Err(e) = self
            .persist("workflow state", |_| {
                self.ports.approvals.set_workflow_state(approval_id, state)
            })
            .await
        {
            tracing::warn!(
                approval_id,
                state = state.as_str(),
                error = %e,
                "Failed to record workflow state",
            );
        }
    }
}

/// Current state of a row, treating an unknown id as `Error`.
pub(crate) fn current_state(approval: &FrontViewApproval) -> GenerationState {
    approval.state().unwrap_or(GenerationState::Error)
}

/// State to put back when a claimed phase stops before doing any work.
pub(crate) fn release_state(
    claimed_from: GenerationState,
    claimed: GenerationState,
) -> GenerationState {
    if claimed_from == claimed {
        GenerationState::Error
    } else {
        claimed_from
    }
}

/// Run a phase on its own task.
///
/// Dropping the returned future (a request timeout or a closed connection)
/// does not cancel the task, so its refunds and state updates still run.
pub(crate) async fn detached<T, Fut>(phase: &'static str, fut: Fut) -> Result<T, WorkflowError>
where
    T: Send + 'static,
    Fut: Future<Output = Result<T, WorkflowError>> + Send + 'static,
{
    match tokio::spawn(fut).await {
        Ok(result) => result,
        Err(e) => {
            tracing::error!(phase, error = %e, "Workflow task aborted");
            Err(WorkflowError::Internal(format!("{phase} task aborted")))
        }
    }
}
