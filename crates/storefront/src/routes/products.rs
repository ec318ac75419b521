//! Product route handlers.
//!
//! Reads are public. Writes require a staff account.

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::get,
};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use tech_store_core::{CategoryId, ProductId};

use super::extract::{ApiJson, ApiPath, ApiQuery};
use crate::db::{ProductRepository, RepositoryError};
use crate::error::{AppError, Result};
use crate::middleware::RequireStaff;
use crate::models::{NewProduct, Product, ProductFilter, ProductUpdate};
use crate::state::AppState;

/// Page size when none is given.
pub const DEFAULT_LIMIT: i64 = 10;

/// Largest page size a caller may ask for.
pub const MAX_LIMIT: i64 = 100;

/// Build the product router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(index).post(create))
        .route("/{id}", get(show).put(update).delete(destroy))
}

/// Listing query parameters.
#[derive(Debug, Default, Deserialize)]
pub struct ProductQuery {
    pub category_id: Option<i32>,
    pub search: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl From<ProductQuery> for ProductFilter {
    fn from(query: ProductQuery) -> Self {
        Self {
            category_id: query.category_id.map(CategoryId::new),
            search: query.search,
            limit: query.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT),
            offset: query.offset.unwrap_or(0).max(0),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ProductResponse {
    pub message: &'static str,
    pub product: Product,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

fn validate_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(AppError::Validation("Product name is required".to_owned()));
    }
    Ok(())
}

fn validate_stock(stock_quantity: i32) -> Result<()> {
    if stock_quantity < 0 {
        return Err(AppError::Validation(
            "Stock quantity cannot be negative".to_owned(),
        ));
    }
    Ok(())
}

/// List products.
///
/// # Errors
///
/// Returns an error if the database query fails.
#[instrument(skip_all)]
pub async fn index(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<ProductQuery>,
) -> Result<Json<Vec<Product>>> {
    let filter = ProductFilter::from(query);
    let products = ProductRepository::new(state.pool()).list(&filter).await?;
    Ok(Json(products))
}

/// Show one product.
///
/// # Errors
///
/// Returns 404 if the product doesn't exist.
#[instrument(skip_all)]
pub async fn show(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<ProductId>,
) -> Result<Json<Product>> {
    ProductRepository::new(state.pool())
        .get(id)
        .await?
        .map(Json)
        .ok_or(AppError::ProductNotFound(id))
}

/// Create a product.
///
/// # Errors
///
/// Returns 400 for invalid input or an unknown category.
#[instrument(skip_all)]
pub async fn create(
    RequireStaff(staff): RequireStaff,
    State(state): State<AppState>,
    ApiJson(input): ApiJson<NewProduct>,
) -> Result<(StatusCode, Json<ProductResponse>)> {
    validate_name(&input.name)?;
    validate_stock(input.stock_quantity)?;

    let product = ProductRepository::new(state.pool()).create(&input).await?;
    tracing::info!(product_id = %product.id, admin_id = staff.account_id(), "Product created");

    Ok((
        StatusCode::CREATED,
        Json(ProductResponse {
            message: "Product created successfully",
            product,
        }),
    ))
}

/// Partially update a product.
///
/// # Errors
///
/// Returns 400 for an empty or invalid update, 404 if the product doesn't exist.
#[instrument(skip_all)]
pub async fn update(
    RequireStaff(staff): RequireStaff,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<ProductId>,
    ApiJson(input): ApiJson<ProductUpdate>,
) -> Result<Json<ProductResponse>> {
    if input.is_empty() {
        return Err(AppError::Validation("No fields to update".to_owned()));
    }
    if let Some(name) = &input.name {
        validate_name(name)?;
    }
    if let Some(stock) = input.stock_quantity {
        validate_stock(stock)?;
    }

    let product = ProductRepository::new(state.pool())
        .update(id, &input)
        .await
        .map_err(|e| match e {
            RepositoryError::NotFound => AppError::ProductNotFound(id),
            other => other.into(),
        })?;

    tracing::info!(product_id = %id, admin_id = staff.account_id(), "Product updated");
    Ok(Json(ProductResponse {
        message: "Product updated successfully",
        product,
    }))
}

/// Delete a product.
///
/// # Errors
///
/// Returns 404 if the product doesn't exist, 409 if an order references it.
#[instrument(skip_all)]
pub async fn destroy(
    RequireStaff(staff): RequireStaff,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<ProductId>,
) -> Result<Json<MessageResponse>> {
    ProductRepository::new(state.pool())
        .delete(id)
        .await
        .map_err(|e| match e {
            RepositoryError::NotFound => AppError::ProductNotFound(id),
            other => other.into(),
        })?;

    tracing::info!(product_id = %id, admin_id = staff.account_id(), "Product deleted");
    Ok(Json(MessageResponse {
        message: "Product deleted successfully",
    }))
}
