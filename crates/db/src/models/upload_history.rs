//! Upload history model (secondary mirror of committed images).

use atelier_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// Source label for images mirrored from a revision commit.
pub const SOURCE_REVISION: &str = "revision";

/// A row from the `upload_history` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct UploadHistoryEntry {
    pub id: DbId,
    pub user_id: DbId,
    pub product_id: DbId,
    pub revision_id: Option<DbId>,
    pub view_type: String,
    pub image_url: String,
    pub thumbnail_url: Option<String>,
    pub source: String,
    pub created_at: Timestamp,
}

/// DTO for one mirrored image.
#[derive(Debug, Clone)]
pub struct CreateUploadHistory {
    pub user_id: DbId,
    pub product_id: DbId,
    pub revision_id: Option<DbId>,
    pub view_type: String,
    pub image_url: String,
    pub thumbnail_url: Option<String>,
    pub source: String,
}
