//! Repository for the `upload_history` table.

use atelier_core::types::DbId;
use sqlx::PgPool;

use crate::models::upload_history::{CreateUploadHistory, UploadHistoryEntry};

const COLUMNS: &str =
    "id, user_id, product_id, revision_id, view_type, image_url, thumbnail_url, source, created_at";

pub struct UploadHistoryRepo;

impl UploadHistoryRepo {
    /// Insert all entries in one transaction. Returns the number written.
    pub async fn create_many(
        pool: &PgPool,
        entries: &[CreateUploadHistory],
    ) -> Result<u64, sqlx::Error> {
        let mut tx = pool.begin().await?;
        let mut written = 0;

        for entry in entries {
            written += sqlx::query(
                "INSERT INTO upload_history
                    (user_id, product_id, revision_id, view_type, image_url, thumbnail_url, source)
                 VALUES ($1, $2, $3, $4, $5, $6, $7)",
            )
            .bind(entry.user_id)
            .bind(entry.product_id)
            .bind(entry.revision_id)
            .bind(&entry.view_type)
            .bind(&entry.image_url)
            .bind(&entry.thumbnail_url)
            .bind(&entry.source)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        }

        tx.commit().await?;
        Ok(written)
    }

    /// Entries for a product, newest first.
    pub async fn list_for_product(
        pool: &PgPool,
        product_id: DbId,
    ) -> Result<Vec<UploadHistoryEntry>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM upload_history
             WHERE product_id = $1
             ORDER BY created_at DESC, id DESC"
        );
        sqlx::query_as::<_, UploadHistoryEntry>(&query)
            .bind(product_id)
            .fetch_all(pool)
            .await
    }
}
