//! Product model.

use atelier_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `products` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Product {
    pub id: DbId,
    pub user_id: DbId,
    pub name: String,
    pub reference_image_url: Option<String>,
    pub brand_reference_url: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Product {
    /// Product-level reference, falling back to the brand's.
    pub fn reference(&self) -> Option<&str> {
        self.reference_image_url
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .or(self.brand_reference_url.as_deref())
            .filter(|s| !s.trim().is_empty())
    }
}

/// DTO for creating a product.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateProduct {
    pub user_id: DbId,
    pub name: String,
    pub reference_image_url: Option<String>,
    pub brand_reference_url: Option<String>,
}
