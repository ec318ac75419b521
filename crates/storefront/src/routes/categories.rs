//! Category route handlers.

use axum::{Json, Router, extract::State, http::StatusCode, routing::get};
use serde::Serialize;
use tracing::instrument;

use tech_store_core::CategoryId;

use super::extract::{ApiJson, ApiPath};
use super::products::MessageResponse;
use crate::db::{CategoryRepository, RepositoryError};
use crate::error::{AppError, Result};
use crate::middleware::RequireStaff;
use crate::models::{Category, CategoryInput};
use crate::state::AppState;

/// Build the category router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(index).post(create))
        .route("/{id}", get(show).put(update).delete(destroy))
}

#[derive(Debug, Serialize)]
pub struct CategoryResponse {
    pub message: &'static str,
    pub category: Category,
}

fn normalize(mut input: CategoryInput) -> Result<CategoryInput> {
    let name = input.name.trim();
    if name.is_empty() {
        return Err(AppError::Validation("Category name is required".to_owned()));
    }
    input.name = name.to_owned();
    Ok(input)
}

fn not_found(e: RepositoryError) -> AppError {
    match e {
        RepositoryError::NotFound => AppError::NotFound("Category not found".to_owned()),
        other => other.into(),
    }
}

/// List categories by name.
///
/// # Errors
///
/// Returns an error if the database query fails.
#[instrument(skip_all)]
pub async fn index(State(state): State<AppState>) -> Result<Json<Vec<Category>>> {
    Ok(Json(CategoryRepository::new(state.pool()).list().await?))
}

/// Show one category.
///
/// # Errors
///
/// Returns 404 if the category doesn't exist.
#[instrument(skip_all)]
pub async fn show(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<CategoryId>,
) -> Result<Json<Category>> {
    CategoryRepository::new(state.pool())
        .get(id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound("Category not found".to_owned()))
}

/// Create a category.
///
/// # Errors
///
/// Returns 400 without a name and 409 for a duplicate name.
#[instrument(skip_all)]
pub async fn create(
    RequireStaff(staff): RequireStaff,
    State(state): State<AppState>,
    ApiJson(input): ApiJson<CategoryInput>,
) -> Result<(StatusCode, Json<CategoryResponse>)> {
    let input = normalize(input)?;
    let category = CategoryRepository::new(state.pool()).create(&input).await?;
    tracing::info!(category_id = %category.id, admin_id = staff.account_id(), "Category created");

    Ok((
        StatusCode::CREATED,
        Json(CategoryResponse {
            message: "Category created successfully",
            category,
        }),
    ))
}

/// Rename or re-describe a category.
///
/// # Errors
///
/// Returns 404 if the category doesn't exist and 409 for a duplicate name.
#[instrument(skip_all)]
pub async fn update(
    RequireStaff(_staff): RequireStaff,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<CategoryId>,
    ApiJson(input): ApiJson<CategoryInput>,
) -> Result<Json<CategoryResponse>> {
    let input = normalize(input)?;
    let category = CategoryRepository::new(state.pool())
        .update(id, &input)
        .await
        .map_err(not_found)?;

    Ok(Json(CategoryResponse {
        message: "Category updated successfully",
        category,
    }))
}

/// Delete a category with no products.
///
/// # Errors
///
/// Returns 404 if the category doesn't exist and 409 while products use it.
#[instrument(skip_all)]
pub async fn destroy(
    RequireStaff(staff): RequireStaff,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<CategoryId>,
) -> Result<Json<MessageResponse>> {
    CategoryRepository::new(state.pool())
        .delete(id)
        .await
        .map_err(not_found)?;

    tracing::info!(category_id = %id, admin_id = staff.account_id(), "Category deleted");
    Ok(Json(MessageResponse {
        message: "Category deleted successfully",
    }))
}
