//! Cart route handlers.
//!
//! Carts are per customer and persisted. Adding checks stock at that moment
//! but reserves nothing; checkout runs the normal placement and can still
//! fail if stock moved in between.

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::{get, patch, post},
};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use tech_store_core::{Cart, CartLine, CartProduct, Money, ProductId, check_add};

use super::extract::{ApiJson, ApiPath};
use super::orders::PlacedOrderResponse;
use crate::db::{CartRepository, ProductRepository};
use crate::error::{AppError, Result};
use crate::middleware::RequireCustomer;
use crate::state::AppState;

/// Build the cart router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(show))
        .route("/add", post(add))
        .route("/items/{product_id}", patch(adjust).delete(remove))
        .route("/checkout", post(checkout))
}

#[derive(Debug, Deserialize)]
pub struct AddRequest {
    pub product_id: ProductId,
    pub quantity: i32,
}

#[derive(Debug, Deserialize)]
pub struct AdjustRequest {
    pub delta: i32,
}

/// A cart line with its subtotal.
#[derive(Debug, Serialize)]
pub struct CartLineView {
    #[serde(flatten)]
    pub line: CartLine,
    pub subtotal: Money,
}

/// A cart with its totals.
#[derive(Debug, Serialize)]
pub struct CartView {
    pub items: Vec<CartLineView>,
    pub total_items: usize,
    pub total_quantity: i64,
    pub total_amount: Money,
}

impl TryFrom<Cart> for CartView {
    type Error = AppError;

    fn try_from(cart: Cart) -> Result<Self> {
        let total_items = cart.total_items();
        let total_quantity = cart.total_quantity();
        let total_amount = cart.total_amount()?;

        let items = cart
            .into_lines()
            .into_iter()
            .map(|line| {
                let subtotal = line
                    .subtotal()
                    .ok_or_else(|| AppError::Validation("Cart total is too large".to_owned()))?;
                Ok(CartLineView { line, subtotal })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            items,
            total_items,
            total_quantity,
            total_amount,
        })
    }
}

/// View the caller's cart.
///
/// # Errors
///
/// Returns an error if the database query fails.
#[instrument(skip_all)]
pub async fn show(
    customer: RequireCustomer,
    State(state): State<AppState>,
) -> Result<Json<CartView>> {
    let cart = CartRepository::new(state.pool()).get(customer.user_id).await?;
    Ok(Json(cart.try_into()?))
}

/// Add a product to the cart.
///
/// # Errors
///
/// Returns 400 for a non-positive quantity or insufficient stock and 404 for
/// an unknown product.
#[instrument(skip_all)]
pub async fn add(
    customer: RequireCustomer,
    State(state): State<AppState>,
    ApiJson(request): ApiJson<AddRequest>,
) -> Result<Json<CartView>> {
    let product = ProductRepository::new(state.pool())
        .get(request.product_id)
        .await?
        .ok_or(AppError::ProductNotFound(request.product_id))?;

    let product = CartProduct {
        id: product.id,
        name: product.name,
        price: product.price,
        image_url: product.image_url,
        stock_quantity: product.stock_quantity,
    };
    check_add(&product, request.quantity)?;

    let cart = CartRepository::new(state.pool())
        .add(customer.user_id, &product, request.quantity)
        .await?;

    tracing::debug!(
        user_id = %customer.user_id,
        product_id = %product.id,
        quantity = request.quantity,
        "Added to cart"
    );
    Ok(Json(cart.try_into()?))
}

/// Change a line's quantity by `delta`. At zero or below the line goes.
///
/// # Errors
///
/// Returns an error if the database query fails.
#[instrument(skip_all)]
pub async fn adjust(
    customer: RequireCustomer,
    State(state): State<AppState>,
    ApiPath(product_id): ApiPath<ProductId>,
    ApiJson(request): ApiJson<AdjustRequest>,
) -> Result<Json<CartView>> {
    let cart = CartRepository::new(state.pool())
        .adjust(customer.user_id, product_id, request.delta)
        .await?;
    Ok(Json(cart.try_into()?))
}

/// Remove a product from the cart. Removing an absent product is fine.
///
/// # Errors
///
/// Returns an error if the database query fails.
#[instrument(skip_all)]
pub async fn remove(
    customer: RequireCustomer,
    State(state): State<AppState>,
    ApiPath(product_id): ApiPath<ProductId>,
) -> Result<Json<CartView>> {
    let cart = CartRepository::new(state.pool())
        .remove(customer.user_id, product_id)
        .await?;
    Ok(Json(cart.try_into()?))
}

/// Place an order from the cart and empty it.
///
/// # Errors
///
/// Same as order placement. The cart is untouched on error.
#[instrument(skip_all)]
pub async fn checkout(
    customer: RequireCustomer,
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<PlacedOrderResponse>)> {
    let placed = CartRepository::new(state.pool())
        .checkout(customer.user_id)
        .await?;

    tracing::info!(
        order_id = %placed.order.id,
        user_id = %customer.user_id,
        total = %placed.order.total_amount,
        "Cart checked out"
    );
    Ok((StatusCode::CREATED, Json(PlacedOrderResponse::new(placed))))
}
