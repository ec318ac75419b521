//! Product repository.
//!
//! Reads always join the category so listings can show `category_name`.
//! Stock is only decremented by order placement (see [`super::orders`]).

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use tech_store_core::{CategoryId, Money, ProductId};

use super::{RepositoryError, is_foreign_key_violation};
use crate::models::{NewProduct, Product, ProductFilter, ProductUpdate};

#[derive(Debug, sqlx::FromRow)]
struct ProductRow {
    id: i32,
    name: String,
    description: Option<String>,
    price: Money,
    stock_quantity: i32,
    category_id: i32,
    category_name: String,
    image_url: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Self {
            id: ProductId::new(row.id),
            name: row.name,
            description: row.description,
            price: row.price,
            stock_quantity: row.stock_quantity,
            category_id: CategoryId::new(row.category_id),
            category_name: row.category_name,
            image_url: row.image_url,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Escape `%`, `_` and `\` so user input matches literally inside `LIKE`.
fn escape_like(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

fn on_write_error(e: sqlx::Error) -> RepositoryError {
    if is_foreign_key_violation(&e) {
        return RepositoryError::InvalidReference("category does not exist".to_owned());
    }
    RepositoryError::Database(e)
}

/// Repository for product database operations.
pub struct ProductRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ProductRepository<'a> {
    /// Create a new product repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// List products matching `filter`, ordered by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self, filter: &ProductFilter) -> Result<Vec<Product>, RepositoryError> {
        let pattern = filter
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| format!("%{}%", escape_like(s)));

        let rows = sqlx::query_as::<_, ProductRow>(
            r"
            SELECT p.id, p.name, p.description, p.price, p.stock_quantity,
                   p.category_id, c.name AS category_name, p.image_url,
                   p.created_at, p.updated_at
            FROM store.product p
            JOIN store.category c ON c.id = p.category_id
            WHERE
                ($1::int IS NULL OR p.category_id = $1)
                AND ($2::text IS NULL OR p.name ILIKE $2 OR p.description ILIKE $2)
            ORDER BY p.id
            LIMIT $3 OFFSET $4
            ",
        )
        .bind(filter.category_id)
        .bind(pattern)
        .bind(filter.limit)
        .bind(filter.offset)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Get a product by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let row = sqlx::query_as::<_, ProductRow>(
            r"
            SELECT p.id, p.name, p.description, p.price, p.stock_quantity,
                   p.category_id, c.name AS category_name, p.image_url,
                   p.created_at, p.updated_at
            FROM store.product p
            JOIN store.category c ON c.id = p.category_id
            WHERE p.id = $1
            ",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    /// Create a product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::InvalidReference` if the category doesn't exist.
    pub async fn create(&self, input: &NewProduct) -> Result<Product, RepositoryError> {
        let row = sqlx::query_as::<_, ProductRow>(
            r"
            WITH inserted AS (
                INSERT INTO store.product
                    (name, description, price, stock_quantity, category_id, image_url)
                VALUES ($1, $2, $3, $4, $5, $6)
                RETURNING *
            )
            SELECT i.id, i.name, i.description, i.price, i.stock_quantity,
                   i.category_id, c.name AS category_name, i.image_url,
                   i.created_at, i.updated_at
            FROM inserted i
            JOIN store.category c ON c.id = i.category_id
            ",
        )
        .bind(&input.name)
        .bind(&input.description)
        .bind(input.price)
        .bind(input.stock_quantity)
        .bind(input.category_id)
        .bind(&input.image_url)
        .fetch_one(self.pool)
        .await
        .map_err(on_write_error)?;

        Ok(row.into())
    }

    /// Apply a partial update.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product doesn't exist.
    /// Returns `RepositoryError::InvalidReference` if the new category doesn't exist.
    pub async fn update(
        &self,
        id: ProductId,
        input: &ProductUpdate,
    ) -> Result<Product, RepositoryError> {
        let row = sqlx::query_as::<_, ProductRow>(
            r"
            WITH updated AS (
                UPDATE store.product
                SET
                    name = COALESCE($2, name),
                    description = COALESCE($3, description),
                    price = COALESCE($4, price),
                    stock_quantity = COALESCE($5, stock_quantity),
                    category_id = COALESCE($6, category_id),
                    image_url = COALESCE($7, image_url),
                    updated_at = NOW()
                WHERE id = $1
                RETURNING *
            )
            SELECT u.id, u.name, u.description, u.price, u.stock_quantity,
                   u.category_id, c.name AS category_name, u.image_url,
                   u.created_at, u.updated_at
            FROM updated u
            JOIN store.category c ON c.id = u.category_id
            ",
        )
        .bind(id)
        .bind(&input.name)
        .bind(&input.description)
        .bind(input.price)
        .bind(input.stock_quantity)
        .bind(input.category_id)
        .bind(&input.image_url)
        .fetch_optional(self.pool)
        .await
        .map_err(on_write_error)?
        .ok_or(RepositoryError::NotFound)?;

        Ok(row.into())
    }

    /// Delete a product.
    ///
    /// Cart lines for the product go with it; order history does not.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product doesn't exist.
    /// Returns `RepositoryError::Conflict` if any order references it.
    pub async fn delete(&self, id: ProductId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM store.product WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await
            .map_err(|e| {
                if is_foreign_key_violation(&e) {
                    return RepositoryError::Conflict(
                        "product is referenced by existing orders".to_owned(),
                    );
                }
                RepositoryError::Database(e)
            })?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}
