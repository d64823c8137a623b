//! Repository for the `revision_views` table.

use atelier_core::revision::{edit_type, next_revision_number};
use atelier_core::types::DbId;
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::revision::{CommittedBatch, NewRevisionBatch, RevisionView};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, product_id, user_id, revision_number, batch_id, view_type, \
    image_url, thumbnail_url, edit_prompt, edit_type, ai_model, ai_parameters, is_active, \
    front_view_approval_id, metadata, deleted_at, created_at, updated_at";

/// Batch-level operations on per-view revision rows.
pub struct RevisionRepo;

impl RevisionRepo {
    /// Highest revision number recorded for the product.
    pub async fn max_revision_number(
        pool: &PgPool,
        product_id: DbId,
    ) -> Result<Option<i32>, sqlx::Error> {
        sqlx::query_scalar("SELECT MAX(revision_number) FROM revision_views WHERE product_id = $1")
            .bind(product_id)
            .fetch_one(pool)
            .await
    }

    /// All rows of one batch, in insertion order.
    pub async fn list_batch(pool: &PgPool, batch_id: Uuid) -> Result<Vec<RevisionView>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM revision_views WHERE batch_id = $1 ORDER BY id");
        sqlx::query_as::<_, RevisionView>(&query)
            .bind(batch_id)
            .fetch_all(pool)
            .await
    }

    /// Rows of the product's batch with the given revision number, scoped
    /// to the user who committed it.
    pub async fn list_by_revision(
        pool: &PgPool,
        product_id: DbId,
        user_id: DbId,
        revision_number: i32,
    ) -> Result<Vec<RevisionView>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM revision_views
             WHERE product_id = $1 AND user_id = $2 AND revision_number = $3
               AND deleted_at IS NULL
             ORDER BY id"
        );
        sqlx::query_as::<_, RevisionView>(&query)
            .bind(product_id)
            .bind(user_id)
            .bind(revision_number)
            .fetch_all(pool)
            .await
    }

    /// The product's active rows, scoped to the user who committed them.
    pub async fn list_active(
        pool: &PgPool,
        product_id: DbId,
        user_id: DbId,
    ) -> Result<Vec<RevisionView>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM revision_views
             WHERE product_id = $1 AND user_id = $2 AND is_active AND deleted_at IS NULL
             ORDER BY id"
        );
        sqlx::query_as::<_, RevisionView>(&query)
            .bind(product_id)
            .bind(user_id)
            .fetch_all(pool)
            .await
    }

    /// Distinct batch ids with at least one active row.
    pub async fn active_batch_ids(pool: &PgPool, product_id: DbId) -> Result<Vec<Uuid>, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT DISTINCT batch_id FROM revision_views
             WHERE product_id = $1 AND is_active",
        )
        .bind(product_id)
        .fetch_all(pool)
        .await
    }

    /// Commit a complete batch as the product's only active batch.
    ///
    /// Runs in one transaction under a per-product advisory lock: computes the
    /// revision number, deactivates every currently active row, then inserts
    /// the new rows under a fresh batch id. Nothing is visible unless every
    /// row lands.
    pub async fn commit_batch(
        pool: &PgPool,
        batch: &NewRevisionBatch,
    ) -> Result<CommittedBatch, sqlx::Error> {
        let mut tx = pool.begin().await?;

        sqlx::query("SELECT pg_advisory_xact_lock($1)")
            .bind(batch.product_id)
            .execute(&mut *tx)
            .await?;

        let current_max: Option<i32> = sqlx::query_scalar(
            "SELECT MAX(revision_number) FROM revision_views WHERE product_id = $1",
        )
        .bind(batch.product_id)
        .fetch_one(&mut *tx)
        .await?;
        let revision_number = next_revision_number(batch.is_initial, current_max);

        let deactivated = sqlx::query(
            "UPDATE revision_views SET is_active = false, updated_at = NOW()
             WHERE product_id = $1 AND is_active",
        )
        .bind(batch.product_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        let batch_id = Uuid::new_v4();
        let kind = edit_type(batch.is_initial);
        let insert = format!(
            "INSERT INTO revision_views
                (product_id, user_id, revision_number, batch_id, view_type, image_url,
                 thumbnail_url, edit_prompt, edit_type, ai_model, ai_parameters, is_active,
                 front_view_approval_id, metadata)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, true, $12, $13)
             RETURNING {COLUMNS}"
        );

        let mut rows = Vec::with_capacity(batch.views.len());
        for view in &batch.views {
            let row = sqlx::query_as::<_, RevisionView>(&insert)
                .bind(batch.product_id)
                .bind(batch.user_id)
                .bind(revision_number)
                .bind(batch_id)
                .bind(view.view_type.as_str())
                .bind(&view.image_url)
                .bind(&view.thumbnail_url)
                .bind(&batch.edit_prompt)
                .bind(kind)
                .bind(&batch.ai_model)
                .bind(&view.ai_parameters)
                .bind(batch.front_view_approval_id)
                .bind(&view.metadata)
                .fetch_one(&mut *tx)
                .await?;
            rows.push(row);
        }

        tx.commit().await?;

        tracing::info!(
            product_id = batch.product_id,
            revision_number,
            %batch_id,
            deactivated,
            "Revision batch committed",
        );

        Ok(CommittedBatch {
            revision_number,
            batch_id,
            rows,
        })
    }
}
