//! Postgres-backed implementations of the storage ports.

use async_trait::async_trait;
use atelier_core::features::ExtractedFeatures;
use atelier_core::types::{Credits, DbId, Timestamp};
use atelier_core::workflow::GenerationState;
use atelier_db::models::approval::{CreateFrontViewApproval, FrontViewApproval, RecordRemainingViews};
use atelier_db::models::credit::{RefundOutcome, ReserveOutcome};
use atelier_db::models::revision::{CommittedBatch, NewRevisionBatch, RevisionView};
use atelier_db::models::upload_history::CreateUploadHistory;
use atelier_db::repositories::{
    CreditRepo, FrontViewApprovalRepo, ProductRepo, RevisionRepo, UploadHistoryRepo,
};
use atelier_db::DbPool;
use uuid::Uuid;

use crate::ports::{
    ApprovalStore, CreditLedger, LedgerError, ProductCatalog, Reservation, RevisionStore,
    StoreError, UploadHistory,
};

// ---------------------------------------------------------------------------
// Error classification
// ---------------------------------------------------------------------------

/// Classify a sqlx error for the retry combinator.
///
/// Connection loss, pool exhaustion, serialization failures, deadlocks and
/// iteration-number races are transient. SQLSTATE class 42 (undefined
/// column/table, syntax) is a schema error and never retried.
pub fn classify(err: sqlx::Error) -> StoreError {
    match &err {
        sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
            StoreError::Transient(err.to_string())
        }
        sqlx::Error::RowNotFound => StoreError::NotFound(err.to_string()),
        sqlx::Error::ColumnNotFound(_) | sqlx::Error::ColumnDecode { .. } => {
            StoreError::Schema(err.to_string())
        }
        sqlx::Error::Database(db) => {
            let code = db.code().map(|c| c.into_owned()).unwrap_or_default();
            let is_iteration_race = code == "23505"
                && matches!(
                    db.constraint(),
                    Some("uq_front_view_approvals_iteration" | "uq_revision_views_view")
                );
            if code.starts_with("08") || code == "40001" || code == "40P01" || is_iteration_race {
                StoreError::Transient(err.to_string())
            } else if code.starts_with("42") {
                StoreError::Schema(err.to_string())
            } else {
                StoreError::Other(err.to_string())
            }
        }
        _ => StoreError::Other(err.to_string()),
    }
}

// ---------------------------------------------------------------------------
// PgStore
// ---------------------------------------------------------------------------

/// Implements every storage port over one connection pool.
#[derive(Clone)]
pub struct PgStore {
    pool: DbPool,
}

impl PgStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }
}

#[async_trait]
impl CreditLedger for PgStore {
    async fn reserve(
        &self,
        owner_id: DbId,
        amount: Credits,
        reason: &str,
    ) -> Result<Reservation, LedgerError> {
        match CreditRepo::reserve(&self.pool, owner_id, amount, reason)
            .await
            .map_err(classify)?
        {
            ReserveOutcome::Reserved(r) => Ok(Reservation {
                id: r.reservation_id,
                owner_id: r.owner_id,
                amount: r.amount,
            }),
            ReserveOutcome::Insufficient { balance, requested } => {
                Err(LedgerError::Insufficient { balance, requested })
            }
        }
    }

    async fn refund(
        &self,
        owner_id: DbId,
        reservation_id: Uuid,
        amount: Credits,
    ) -> Result<Credits, LedgerError> {
        match CreditRepo::refund(&self.pool, owner_id, reservation_id, amount)
            .await
            .map_err(classify)?
        {
            RefundOutcome::Refunded { balance_after } => Ok(balance_after),
            RefundOutcome::ReservationNotFound => Err(LedgerError::Store(StoreError::NotFound(
                format!("reservation {reservation_id}"),
            ))),
            RefundOutcome::Rejected(msg) => Err(LedgerError::Rejected(msg)),
        }
    }
}

#[async_trait]
impl ApprovalStore for PgStore {
    async fn create(
        &self,
        input: &CreateFrontViewApproval,
    ) -> Result<FrontViewApproval, StoreError> {
        FrontViewApprovalRepo::create(&self.pool, input)
            .await
            .map_err(classify)
    }

    async fn find_for_user(
        &self,
        id: DbId,
        user_id: DbId,
    ) -> Result<Option<FrontViewApproval>, StoreError> {
        FrontViewApprovalRepo::find_for_user(&self.pool, id, user_id)
            .await
            .map_err(classify)
    }

    async fn find_recent_initial(
        &self,
        product_id: DbId,
        user_id: DbId,
        since: Timestamp,
    ) -> Result<Option<FrontViewApproval>, StoreError> {
        FrontViewApprovalRepo::find_recent_initial(&self.pool, product_id, user_id, since)
            .await
            .map_err(classify)
    }

    async fn mark_rejected(
        &self,
        id: DbId,
        feedback: &str,
    ) -> Result<Option<FrontViewApproval>, StoreError> {
        FrontViewApprovalRepo::mark_rejected(&self.pool, id, feedback)
            .await
            .map_err(classify)
    }

    async fn mark_approved(
        &self,
        id: DbId,
        features: &ExtractedFeatures,
    ) -> Result<Option<FrontViewApproval>, StoreError> {
        FrontViewApprovalRepo::mark_approved(&self.pool, id, &features.to_json())
            .await
            .map_err(classify)
    }

    async fn cache_features(
        &self,
        id: DbId,
        features: &ExtractedFeatures,
    ) -> Result<bool, StoreError> {
        FrontViewApprovalRepo::cache_features(&self.pool, id, &features.to_json())
            .await
            .map_err(classify)
    }

    async fn set_workflow_state(&self, id: DbId, state: GenerationState) -> Result<(), StoreError> {
        let updated = FrontViewApprovalRepo::set_workflow_state(&self.pool, id, state)
            .await
            .map_err(classify)?;
        if !updated {
            return Err(StoreError::NotFound(format!("approval {id}")));
        }
        Ok(())
    }

    async fn transition_state(
        &self,
        id: DbId,
        from: GenerationState,
        to: GenerationState,
        seen_at: Timestamp,
    ) -> Result<bool, StoreError> {
        FrontViewApprovalRepo::transition_state(&self.pool, id, from, to, seen_at)
            .await
            .map_err(classify)
    }

    async fn record_remaining_views(
        &self,
        id: DbId,
        input: &RecordRemainingViews,
    ) -> Result<FrontViewApproval, StoreError> {
        FrontViewApprovalRepo::record_remaining_views(&self.pool, id, input)
            .await
            .map_err(classify)?
            .ok_or_else(|| StoreError::NotFound(format!("approval {id}")))
    }

    async fn mark_completed(&self, id: DbId) -> Result<(), StoreError> {
        FrontViewApprovalRepo::mark_completed(&self.pool, id)
            .await
            .map_err(classify)?
            .map(|_| ())
            .ok_or_else(|| StoreError::NotFound(format!("approval {id}")))
    }
}

#[async_trait]
impl RevisionStore for PgStore {
    async fn find_revision(
        &self,
        product_id: DbId,
        user_id: DbId,
        revision_number: i32,
    ) -> Result<Vec<RevisionView>, StoreError> {
        RevisionRepo::list_by_revision(&self.pool, product_id, user_id, revision_number)
            .await
            .map_err(classify)
    }

    async fn list_active(
        &self,
        product_id: DbId,
        user_id: DbId,
    ) -> Result<Vec<RevisionView>, StoreError> {
        RevisionRepo::list_active(&self.pool, product_id, user_id)
            .await
            .map_err(classify)
    }

    async fn commit_batch(&self, batch: &NewRevisionBatch) -> Result<CommittedBatch, StoreError> {
        RevisionRepo::commit_batch(&self.pool, batch)
            .await
            .map_err(classify)
    }
}

#[async_trait]
impl UploadHistory for PgStore {
    async fn record(&self, entries: &[CreateUploadHistory]) -> Result<u64, StoreError> {
        UploadHistoryRepo::create_many(&self.pool, entries)
            .await
            .map_err(classify)
    }
}

#[async_trait]
impl ProductCatalog for PgStore {
    async fn reference_image(
        &self,
        product_id: DbId,
        user_id: DbId,
    ) -> Result<Option<String>, StoreError> {
        let product = ProductRepo::find_for_user(&self.pool, product_id, user_id)
            .await
            .map_err(classify)?;
        Ok(product.and_then(|p| p.reference().map(str::to_string)))
    }
}
