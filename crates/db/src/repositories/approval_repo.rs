//! Repository for the `front_view_approvals` table.

use atelier_core::approval::REASON_SUPERSEDED;
use atelier_core::types::{DbId, Timestamp};
use atelier_core::workflow::GenerationState;
use sqlx::PgPool;

use crate::models::approval::{CreateFrontViewApproval, FrontViewApproval, RecordRemainingViews};
use crate::models::status::ApprovalStatus;

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, user_id, product_id, session_id, front_view_url, prompt, \
    reference_image_url, status_id, workflow_state, iteration_number, credits_reserved, \
    credits_consumed, is_initial_generation, user_feedback, rejection_reason, \
    extracted_features, back_view_url, side_view_url, top_view_url, bottom_view_url, \
    approved_at, rejected_at, completed_at, created_at, updated_at";

/// Provides CRUD and status-transition operations for front-view approvals.
pub struct FrontViewApprovalRepo;

impl FrontViewApprovalRepo {
    /// Insert a new pending row with the next iteration number for the
    /// product and user.
    ///
    /// Any older pending row in the same (product, user, session) is rejected
    /// as superseded in the same transaction, keeping at most one pending row.
    pub async fn create(
        pool: &PgPool,
        input: &CreateFrontViewApproval,
    ) -> Result<FrontViewApproval, sqlx::Error> {
        let mut tx = pool.begin().await?;

        sqlx::query(
            "UPDATE front_view_approvals SET
                status_id = $4,
                workflow_state = $5,
                rejection_reason = $6,
                rejected_at = NOW(),
                updated_at = NOW()
             WHERE product_id = $1 AND user_id = $2 AND session_id = $3 AND status_id = $7",
        )
        .bind(input.product_id)
        .bind(input.user_id)
        .bind(&input.session_id)
        .bind(ApprovalStatus::Rejected.id())
        .bind(GenerationState::Completed.id())
        .bind(REASON_SUPERSEDED)
        .bind(ApprovalStatus::Pending.id())
        .execute(&mut *tx)
        .await?;

        let query = format!(
            "INSERT INTO front_view_approvals
                (user_id, product_id, session_id, front_view_url, prompt, reference_image_url,
                 status_id, workflow_state, iteration_number, credits_reserved, credits_consumed,
                 is_initial_generation)
             VALUES (
                $1, $2, $3, $4, $5, $6, $7, $8,
                (SELECT COALESCE(MAX(iteration_number), 0) + 1
                   FROM front_view_approvals WHERE product_id = $2 AND user_id = $1),
                $9, $10, $11
             )
             RETURNING {COLUMNS}"
        );
        let row = sqlx::query_as::<_, FrontViewApproval>(&query)
            .bind(input.user_id)
            .bind(input.product_id)
            .bind(&input.session_id)
            .bind(&input.front_view_url)
            .bind(&input.prompt)
            .bind(&input.reference_image_url)
            .bind(ApprovalStatus::Pending.id())
            .bind(GenerationState::AwaitingApproval.id())
            .bind(input.credits_reserved)
            .bind(input.credits_consumed)
            .bind(input.is_initial_generation)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(row)
    }

    /// Find an approval by its ID.
    pub async fn find_by_id(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<FrontViewApproval>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM front_view_approvals WHERE id = $1");
        sqlx::query_as::<_, FrontViewApproval>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Find an approval by ID, scoped to its owner.
    pub async fn find_for_user(
        pool: &PgPool,
        id: DbId,
        user_id: DbId,
    ) -> Result<Option<FrontViewApproval>, sqlx::Error> {
        let query =
            format!("SELECT {COLUMNS} FROM front_view_approvals WHERE id = $1 AND user_id = $2");
        sqlx::query_as::<_, FrontViewApproval>(&query)
            .bind(id)
            .bind(user_id)
            .fetch_optional(pool)
            .await
    }

    /// Most recent initial-generation row for the product and user created
    /// at or after `since`.
    pub async fn find_recent_initial(
        pool: &PgPool,
        product_id: DbId,
        user_id: DbId,
        since: Timestamp,
    ) -> Result<Option<FrontViewApproval>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM front_view_approvals
             WHERE product_id = $1 AND user_id = $2
               AND is_initial_generation = true
               AND created_at >= $3
             ORDER BY created_at DESC
             LIMIT 1"
        );
        sqlx::query_as::<_, FrontViewApproval>(&query)
            .bind(product_id)
            .bind(user_id)
            .bind(since)
            .fetch_optional(pool)
            .await
    }

    /// Highest iteration number used for the product and user.
    pub async fn max_iteration(
        pool: &PgPool,
        product_id: DbId,
        user_id: DbId,
    ) -> Result<Option<i32>, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT MAX(iteration_number) FROM front_view_approvals
             WHERE product_id = $1 AND user_id = $2",
        )
        .bind(product_id)
        .bind(user_id)
        .fetch_one(pool)
        .await
    }

    /// List every attempt for a product and user, by iteration ascending.
    pub async fn list_for_product(
        pool: &PgPool,
        product_id: DbId,
        user_id: DbId,
    ) -> Result<Vec<FrontViewApproval>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM front_view_approvals
             WHERE product_id = $1 AND user_id = $2
             ORDER BY iteration_number ASC"
        );
        sqlx::query_as::<_, FrontViewApproval>(&query)
            .bind(product_id)
            .bind(user_id)
            .fetch_all(pool)
            .await
    }

    /// Reject a pending row, recording the user's feedback as the reason.
    ///
    /// The row moves to `generating_front` while its replacement is produced.
    /// Returns `None` if the row is not pending.
    pub async fn mark_rejected(
        pool: &PgPool,
        id: DbId,
        feedback: &str,
    ) -> Result<Option<FrontViewApproval>, sqlx::Error> {
        let query = format!(
            "UPDATE front_view_approvals SET
                status_id = $2,
                workflow_state = $3,
                user_feedback = $4,
                rejection_reason = $4,
                rejected_at = NOW(),
                updated_at = NOW()
             WHERE id = $1 AND status_id = $5
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, FrontViewApproval>(&query)
            .bind(id)
            .bind(ApprovalStatus::Rejected.id())
            .bind(GenerationState::GeneratingFront.id())
            .bind(feedback)
            .bind(ApprovalStatus::Pending.id())
            .fetch_optional(pool)
            .await
    }

    /// Approve a pending row, attaching the extracted features.
    ///
    /// Returns `None` if the row is not pending.
    pub async fn mark_approved(
        pool: &PgPool,
        id: DbId,
        features: &serde_json::Value,
    ) -> Result<Option<FrontViewApproval>, sqlx::Error> {
        let query = format!(
            "UPDATE front_view_approvals SET
                status_id = $2,
                workflow_state = $3,
                extracted_features = $4,
                approved_at = NOW(),
                updated_at = NOW()
             WHERE id = $1 AND status_id = $5
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, FrontViewApproval>(&query)
            .bind(id)
            .bind(ApprovalStatus::Approved.id())
            .bind(GenerationState::FrontApproved.id())
            .bind(features)
            .bind(ApprovalStatus::Pending.id())
            .fetch_optional(pool)
            .await
    }

    /// Cache extracted features if none are stored yet. Returns `true` if
    /// the cache was written.
    pub async fn cache_features(
        pool: &PgPool,
        id: DbId,
        features: &serde_json::Value,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE front_view_approvals SET extracted_features = $2, updated_at = NOW()
             WHERE id = $1 AND extracted_features IS NULL",
        )
        .bind(id)
        .bind(features)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Set the workflow state. Returns `true` if a row was updated.
    pub async fn set_workflow_state(
        pool: &PgPool,
        id: DbId,
        state: GenerationState,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE front_view_approvals SET workflow_state = $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(state.id())
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Move the row from `from` to `to` only if it still holds `from` and has
    /// not been written since `seen_at`.
    ///
    /// Returns `false` when another writer changed the row first. Every
    /// successful transition advances `updated_at`, so two callers holding
    /// the same snapshot cannot both succeed.
    pub async fn transition_state(
        pool: &PgPool,
        id: DbId,
        from: GenerationState,
        to: GenerationState,
        seen_at: Timestamp,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE front_view_approvals SET
                workflow_state = $3,
                updated_at = GREATEST(NOW(), updated_at + INTERVAL '1 microsecond')
             WHERE id = $1 AND workflow_state = $2 AND updated_at = $4",
        )
        .bind(id)
        .bind(from.id())
        .bind(to.id())
        .bind(seen_at)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Merge newly generated view URLs and add to the running credit totals.
    ///
    /// Empty URLs never overwrite a stored one.
    pub async fn record_remaining_views(
        pool: &PgPool,
        id: DbId,
        input: &RecordRemainingViews,
    ) -> Result<Option<FrontViewApproval>, sqlx::Error> {
        let query = format!(
            "UPDATE front_view_approvals SET
                back_view_url = COALESCE(NULLIF($2, ''), back_view_url),
                side_view_url = COALESCE(NULLIF($3, ''), side_view_url),
                top_view_url = COALESCE(NULLIF($4, ''), top_view_url),
                bottom_view_url = COALESCE(NULLIF($5, ''), bottom_view_url),
                credits_reserved = credits_reserved + $6,
                credits_consumed = credits_consumed + $7,
                updated_at = NOW()
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, FrontViewApproval>(&query)
            .bind(id)
            .bind(&input.urls.back)
            .bind(&input.urls.side)
            .bind(&input.urls.top)
            .bind(&input.urls.bottom)
            .bind(input.credits_reserved)
            .bind(input.credits_consumed)
            .fetch_optional(pool)
            .await
    }

    /// Mark an approved row as completed once its revision batch is committed.
    pub async fn mark_completed(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<FrontViewApproval>, sqlx::Error> {
        let query = format!(
            "UPDATE front_view_approvals SET
                status_id = $2,
                workflow_state = $3,
                completed_at = NOW(),
                updated_at = NOW()
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, FrontViewApproval>(&query)
            .bind(id)
            .bind(ApprovalStatus::Completed.id())
            .bind(GenerationState::Completed.id())
            .fetch_optional(pool)
            .await
    }
}
