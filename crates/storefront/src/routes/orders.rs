//! Order route handlers.
//!
//! Customers place and read their own orders. Staff read every order and
//! move orders through their status.

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::{get, put},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use tech_store_core::{Money, OrderId, OrderLine, OrderStatus};

use super::extract::{ApiJson, ApiPath};
use crate::db::OrderRepository;
use crate::error::{AppError, Result, add_breadcrumb};
use crate::middleware::{RequireCustomer, RequireStaff};
use crate::models::{AdminOrderView, Order, OrderItem, OrderWithItems, PlacedOrder};
use crate::state::AppState;

/// Build the order router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(index).post(create))
        .route("/admin", get(admin_index))
        .route("/{id}", get(show))
        .route("/{id}/status", put(update_status))
}

/// Body of a placement request.
#[derive(Debug, Deserialize)]
pub struct PlaceOrderRequest {
    pub items: Vec<OrderLine>,
}

/// Order header as returned from placement.
#[derive(Debug, Serialize)]
pub struct OrderSummary {
    pub id: OrderId,
    pub order_date: DateTime<Utc>,
    pub total_amount: Money,
    pub status: OrderStatus,
}

impl From<Order> for OrderSummary {
    fn from(order: Order) -> Self {
        Self {
            id: order.id,
            order_date: order.order_date,
            total_amount: order.total_amount,
            status: order.status,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PlacedOrderResponse {
    pub message: &'static str,
    pub order: OrderSummary,
    pub items: Vec<OrderItem>,
}

impl PlacedOrderResponse {
    #[must_use]
    pub fn new(placed: PlacedOrder) -> Self {
        Self {
            message: "Order placed successfully",
            order: placed.order.into(),
            items: placed.items,
        }
    }
}

/// Body of a status change. Kept as a string so a bad name is a 400 with
/// a useful message rather than a deserialization failure.
#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    pub status: String,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub message: &'static str,
    pub order: Order,
}

fn parse_status(raw: &str) -> Result<OrderStatus> {
    raw.parse().map_err(|_| {
        let allowed: Vec<&str> = OrderStatus::ALL.iter().map(|s| s.as_str()).collect();
        AppError::Validation(format!(
            "Invalid status. Must be one of: {}",
            allowed.join(", ")
        ))
    })
}

/// Place an order from explicit lines.
///
/// # Errors
///
/// Returns 400 for an empty order, a bad quantity or insufficient stock and
/// 404 for an unknown product. Nothing is written on error.
#[instrument(skip_all)]
pub async fn create(
    customer: RequireCustomer,
    State(state): State<AppState>,
    ApiJson(request): ApiJson<PlaceOrderRequest>,
) -> Result<(StatusCode, Json<PlacedOrderResponse>)> {
    let placed = OrderRepository::new(state.pool())
        .place(customer.user_id, &request.items)
        .await?;

    let order_id = placed.order.id.to_string();
    tracing::info!(
        order_id = %order_id,
        user_id = %customer.user_id,
        total = %placed.order.total_amount,
        lines = placed.items.len(),
        "Order placed"
    );
    add_breadcrumb("order", "Order placed", Some(&[("order_id", &order_id)]));

    Ok((StatusCode::CREATED, Json(PlacedOrderResponse::new(placed))))
}

/// The caller's orders, newest first.
///
/// # Errors
///
/// Returns an error if the database query fails.
#[instrument(skip_all)]
pub async fn index(
    customer: RequireCustomer,
    State(state): State<AppState>,
) -> Result<Json<Vec<OrderWithItems>>> {
    let orders = OrderRepository::new(state.pool())
        .list_for_user(customer.user_id)
        .await?;
    Ok(Json(orders))
}

/// One of the caller's orders.
///
/// # Errors
///
/// Returns 404 if the order doesn't exist or belongs to someone else.
#[instrument(skip_all)]
pub async fn show(
    customer: RequireCustomer,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<OrderId>,
) -> Result<Json<OrderWithItems>> {
    OrderRepository::new(state.pool())
        .get_for_user(id, customer.user_id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound("Order not found".to_owned()))
}

/// Every order, for staff.
///
/// # Errors
///
/// Returns an error if the database query fails.
#[instrument(skip_all)]
pub async fn admin_index(
    RequireStaff(_staff): RequireStaff,
    State(state): State<AppState>,
) -> Result<Json<Vec<AdminOrderView>>> {
    Ok(Json(OrderRepository::new(state.pool()).list_all().await?))
}

/// Set an order's status.
///
/// # Errors
///
/// Returns 400 for an unknown status, 404 for an unknown order and 409 when
/// lifecycle enforcement refuses the move.
#[instrument(skip_all)]
pub async fn update_status(
    RequireStaff(staff): RequireStaff,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<OrderId>,
    ApiJson(request): ApiJson<StatusRequest>,
) -> Result<Json<StatusResponse>> {
    let status = parse_status(&request.status)?;

    let order = OrderRepository::new(state.pool())
        .update_status(id, status, state.config().enforce_status_transitions)
        .await?;

    tracing::info!(
        order_id = %id,
        status = %status,
        admin_id = staff.account_id(),
        "Order status updated"
    );
    Ok(Json(StatusResponse {
        message: "Order status updated successfully",
        order,
    }))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use tech_store_core::{ProductId, UserId};

    #[test]
    fn test_parse_status() {
        assert_eq!(parse_status("Shipped").unwrap(), OrderStatus::Shipped);

        let err = parse_status("Lost").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Validation error: Invalid status. Must be one of: Pending, Processing, Shipped, Delivered, Cancelled"
        );
    }

    #[test]
    fn test_place_request_shape() {
        let request: PlaceOrderRequest = serde_json::from_str(
            r#"{"items":[{"product_id":1,"quantity":3},{"product_id":2,"quantity":1}]}"#,
        )
        .unwrap();
        assert_eq!(request.items.len(), 2);
        assert_eq!(request.items.first().unwrap().product_id, ProductId::new(1));
    }

    #[test]
    fn test_placed_response_shape() {
        let placed = PlacedOrder {
            order: Order {
                id: OrderId::new(10),
                user_id: UserId::new(2),
                total_amount: "59.97".parse().unwrap(),
                status: OrderStatus::Pending,
                order_date: Utc::now(),
            },
            items: vec![OrderItem {
                product_id: ProductId::new(1),
                quantity: 3,
                unit_price: "19.99".parse().unwrap(),
            }],
        };

        let json = serde_json::to_value(PlacedOrderResponse::new(placed)).unwrap();
        assert_eq!(json["message"], "Order placed successfully");
        assert_eq!(json["order"]["id"], 10);
        assert_eq!(json["order"]["total_amount"], "59.97");
        assert_eq!(json["order"]["status"], "Pending");
        assert!(json["order"].get("user_id").is_none());
        assert_eq!(json["items"][0]["unit_price"], "19.99");
    }
}
