//! Revision view model and batch DTOs.

use atelier_core::types::{DbId, Timestamp};
use atelier_core::views::ViewType;
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

/// A row from the `revision_views` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct RevisionView {
    pub id: DbId,
    pub product_id: DbId,
    pub user_id: DbId,
    pub revision_number: i32,
    pub batch_id: Uuid,
    pub view_type: String,
    pub image_url: String,
    pub thumbnail_url: Option<String>,
    pub edit_prompt: Option<String>,
    pub edit_type: String,
    pub ai_model: Option<String>,
    pub ai_parameters: Option<serde_json::Value>,
    pub is_active: bool,
    pub front_view_approval_id: Option<DbId>,
    pub metadata: Option<serde_json::Value>,
    pub deleted_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// One view of a batch about to be committed.
#[derive(Debug, Clone)]
pub struct NewRevisionView {
    pub view_type: ViewType,
    pub image_url: String,
    pub thumbnail_url: Option<String>,
    pub ai_parameters: Option<serde_json::Value>,
    pub metadata: Option<serde_json::Value>,
}

/// A complete batch to commit. The revision number is computed at commit
/// time, under the product's lock.
#[derive(Debug, Clone)]
pub struct NewRevisionBatch {
    pub product_id: DbId,
    pub user_id: DbId,
    pub is_initial: bool,
    pub front_view_approval_id: Option<DbId>,
    pub edit_prompt: Option<String>,
    pub ai_model: Option<String>,
    pub views: Vec<NewRevisionView>,
}

/// The result of a committed batch.
#[derive(Debug, Clone, Serialize)]
pub struct CommittedBatch {
    pub revision_number: i32,
    pub batch_id: Uuid,
    pub rows: Vec<RevisionView>,
}

impl CommittedBatch {
    pub fn revision_ids(&self) -> Vec<DbId> {
        self.rows.iter().map(|r| r.id).collect()
    }
}
