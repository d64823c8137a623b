//! Repository for the `products` table.

use atelier_core::types::DbId;
use sqlx::PgPool;

use crate::models::product::{CreateProduct, Product};

const COLUMNS: &str =
    "id, user_id, name, reference_image_url, brand_reference_url, created_at, updated_at";

pub struct ProductRepo;

impl ProductRepo {
    pub async fn create(pool: &PgPool, input: &CreateProduct) -> Result<Product, sqlx::Error> {
        let query = format!(
            "INSERT INTO products (user_id, name, reference_image_url, brand_reference_url)
             VALUES ($1, $2, $3, $4)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Product>(&query)
            .bind(input.user_id)
            .bind(&input.name)
            .bind(&input.reference_image_url)
            .bind(&input.brand_reference_url)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Product>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM products WHERE id = $1");
        sqlx::query_as::<_, Product>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Find a product by ID, scoped to its owner.
    pub async fn find_for_user(
        pool: &PgPool,
        id: DbId,
        user_id: DbId,
    ) -> Result<Option<Product>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM products WHERE id = $1 AND user_id = $2");
        sqlx::query_as::<_, Product>(&query)
            .bind(id)
            .bind(user_id)
            .fetch_optional(pool)
            .await
    }
}
