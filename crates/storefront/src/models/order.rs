//! Order domain types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use tech_store_core::{Money, OrderId, OrderStatus, ProductId, UserId};

/// An order header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    pub total_amount: Money,
    pub status: OrderStatus,
    pub order_date: DateTime<Utc>,
}

/// A line exactly as it was written at placement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    pub product_id: ProductId,
    pub quantity: i32,
    pub unit_price: Money,
}

/// A line with current product details, for order history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItemDetail {
    pub product_id: ProductId,
    pub name: String,
    pub quantity: i32,
    pub unit_price: Money,
    pub image_url: Option<String>,
}

/// An order with its lines, as the owning customer sees it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderWithItems {
    #[serde(flatten)]
    pub order: Order,
    pub items: Vec<OrderItemDetail>,
}

/// An order with its lines and the customer who placed it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AdminOrderView {
    #[serde(flatten)]
    pub order: Order,
    pub customer_username: String,
    pub customer_email: String,
    pub items: Vec<OrderItemDetail>,
}

/// Result of a committed placement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlacedOrder {
    pub order: Order,
    pub items: Vec<OrderItem>,
}
