//! Order repository and the placement transaction.
//!
//! Placement runs in one transaction:
//!
//! 1. lock every referenced product row (`FOR UPDATE`, ascending id)
//! 2. plan the order against the locked rows ([`tech_store_core::plan_order`])
//! 3. insert the order and its items, decrement stock
//! 4. commit
//!
//! Any failure drops the transaction, which rolls it back. Concurrent
//! placements for the same product serialize on the row lock, so the second
//! one plans against the stock the first one left behind.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool};
use thiserror::Error;

use tech_store_core::{
    Money, OrderError, OrderId, OrderLine, OrderPlan, OrderStatus, ProductId, ProductSnapshot,
    UserId, lock_order, plan_order, validate_lines,
};

use super::RepositoryError;
use crate::models::{
    AdminOrderView, Order, OrderItem, OrderItemDetail, OrderWithItems, PlacedOrder,
};

/// Why placement failed. Either way nothing was written.
#[derive(Debug, Error)]
pub enum PlaceOrderError {
    /// The order was refused (empty, unknown product, not enough stock).
    #[error(transparent)]
    Rejected(#[from] OrderError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl From<sqlx::Error> for PlaceOrderError {
    fn from(e: sqlx::Error) -> Self {
        Self::Repository(RepositoryError::Database(e))
    }
}

/// Why a status change failed.
#[derive(Debug, Error)]
pub enum StatusChangeError {
    #[error("order not found")]
    NotFound,

    #[error("cannot move order from {from} to {to}")]
    NotAllowed { from: OrderStatus, to: OrderStatus },

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl From<sqlx::Error> for StatusChangeError {
    fn from(e: sqlx::Error) -> Self {
        Self::Repository(RepositoryError::Database(e))
    }
}

// =============================================================================
// Internal Row Types
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct ProductLockRow {
    id: i32,
    name: String,
    price: Money,
    stock_quantity: i32,
}

impl From<ProductLockRow> for ProductSnapshot {
    fn from(row: ProductLockRow) -> Self {
        Self {
            id: ProductId::new(row.id),
            name: row.name,
            price: row.price,
            stock_quantity: row.stock_quantity,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct OrderRow {
    id: i32,
    user_id: i32,
    total_amount: Money,
    status: OrderStatus,
    order_date: DateTime<Utc>,
}

impl From<OrderRow> for Order {
    fn from(row: OrderRow) -> Self {
        Self {
            id: OrderId::new(row.id),
            user_id: UserId::new(row.user_id),
            total_amount: row.total_amount,
            status: row.status,
            order_date: row.order_date,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct AdminOrderRow {
    id: i32,
    user_id: i32,
    total_amount: Money,
    status: OrderStatus,
    order_date: DateTime<Utc>,
    customer_username: String,
    customer_email: String,
}

#[derive(Debug, sqlx::FromRow)]
struct OrderItemDetailRow {
    order_id: i32,
    product_id: i32,
    name: String,
    quantity: i32,
    unit_price: Money,
    image_url: Option<String>,
}

// =============================================================================
// Placement
// =============================================================================

/// Place an order on an open connection or transaction.
///
/// The caller owns the transaction boundary; this function never commits.
///
/// # Errors
///
/// Returns `PlaceOrderError::Rejected` when the plan fails and
/// `PlaceOrderError::Repository` on database errors.
pub async fn place_in(
    conn: &mut PgConnection,
    user_id: UserId,
    lines: &[OrderLine],
) -> Result<PlacedOrder, PlaceOrderError> {
    validate_lines(lines)?;

    let ids: Vec<i32> = lock_order(lines).into_iter().map(i32::from).collect();
    let locked = sqlx::query_as::<_, ProductLockRow>(
        r"
        SELECT id, name, price, stock_quantity
        FROM store.product
        WHERE id = ANY($1)
        ORDER BY id
        FOR UPDATE
        ",
    )
    .bind(&ids)
    .fetch_all(&mut *conn)
    .await?;

    let products: Vec<ProductSnapshot> = locked.into_iter().map(Into::into).collect();
    let plan = plan_order(lines, &products)?;

    write_plan(conn, user_id, &plan).await
}

async fn write_plan(
    conn: &mut PgConnection,
    user_id: UserId,
    plan: &OrderPlan,
) -> Result<PlacedOrder, PlaceOrderError> {
    let order: Order = sqlx::query_as::<_, OrderRow>(
        r"
        INSERT INTO store.customer_order (user_id, total_amount, status)
        VALUES ($1, $2, $3)
        RETURNING id, user_id, total_amount, status, order_date
        ",
    )
    .bind(user_id)
    .bind(plan.total)
    .bind(OrderStatus::Pending)
    .fetch_one(&mut *conn)
    .await?
    .into();

    for item in &plan.items {
        sqlx::query(
            r"
            INSERT INTO store.order_item (order_id, product_id, quantity, unit_price)
            VALUES ($1, $2, $3, $4)
            ",
        )
        .bind(order.id)
        .bind(item.product_id)
        .bind(item.quantity)
        .bind(item.unit_price)
        .execute(&mut *conn)
        .await?;
    }

    for &(product_id, quantity) in &plan.stock_decrements {
        let result = sqlx::query(
            r"
            UPDATE store.product
            SET stock_quantity = stock_quantity - $2,
                updated_at = NOW()
            WHERE id = $1
            ",
        )
        .bind(product_id)
        .bind(quantity)
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() != 1 {
            return Err(RepositoryError::DataCorruption(format!(
                "locked product {product_id} vanished during placement"
            ))
            .into());
        }
    }

    let items = plan
        .items
        .iter()
        .map(|item| OrderItem {
            product_id: item.product_id,
            quantity: item.quantity,
            unit_price: item.unit_price,
        })
        .collect();

    Ok(PlacedOrder { order, items })
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for order database operations.
pub struct OrderRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OrderRepository<'a> {
    /// Create a new order repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Place an order for `user_id` atomically.
    ///
    /// # Errors
    ///
    /// See [`place_in`]. On error nothing is written.
    pub async fn place(
        &self,
        user_id: UserId,
        lines: &[OrderLine],
    ) -> Result<PlacedOrder, PlaceOrderError> {
        // Refuse obviously bad input before opening a transaction
        validate_lines(lines)?;

        let mut tx = self.pool.begin().await?;
        let placed = place_in(&mut *tx, user_id, lines).await?;
        tx.commit().await?;

        Ok(placed)
    }

    /// A customer's orders, newest first, with their items.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn list_for_user(
        &self,
        user_id: UserId,
    ) -> Result<Vec<OrderWithItems>, RepositoryError> {
        let rows = sqlx::query_as::<_, OrderRow>(
            r"
            SELECT id, user_id, total_amount, status, order_date
            FROM store.customer_order
            WHERE user_id = $1
            ORDER BY order_date DESC, id DESC
            ",
        )
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;

        let order_ids: Vec<i32> = rows.iter().map(|row| row.id).collect();
        let mut items = self.items_for(&order_ids).await?;

        Ok(rows
            .into_iter()
            .map(|row| {
                let items = items.remove(&row.id).unwrap_or_default();
                OrderWithItems {
                    order: row.into(),
                    items,
                }
            })
            .collect())
    }

    /// One of a customer's orders. Someone else's order reads as absent.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn get_for_user(
        &self,
        id: OrderId,
        user_id: UserId,
    ) -> Result<Option<OrderWithItems>, RepositoryError> {
        let Some(row) = sqlx::query_as::<_, OrderRow>(
            r"
            SELECT id, user_id, total_amount, status, order_date
            FROM store.customer_order
            WHERE id = $1 AND user_id = $2
            ",
        )
        .bind(id)
        .bind(user_id)
        .fetch_optional(self.pool)
        .await?
        else {
            return Ok(None);
        };

        let items = self
            .items_for(&[row.id])
            .await?
            .remove(&row.id)
            .unwrap_or_default();

        Ok(Some(OrderWithItems {
            order: row.into(),
            items,
        }))
    }

    /// Every order, newest first, with the customer who placed it.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn list_all(&self) -> Result<Vec<AdminOrderView>, RepositoryError> {
        let rows = sqlx::query_as::<_, AdminOrderRow>(
            r"
            SELECT o.id, o.user_id, o.total_amount, o.status, o.order_date,
                   u.username AS customer_username, u.email AS customer_email
            FROM store.customer_order o
            JOIN store.user_account u ON u.id = o.user_id
            ORDER BY o.order_date DESC, o.id DESC
            ",
        )
        .fetch_all(self.pool)
        .await?;

        let order_ids: Vec<i32> = rows.iter().map(|row| row.id).collect();
        let mut items = self.items_for(&order_ids).await?;

        Ok(rows
            .into_iter()
            .map(|row| AdminOrderView {
                items: items.remove(&row.id).unwrap_or_default(),
                order: Order {
                    id: OrderId::new(row.id),
                    user_id: UserId::new(row.user_id),
                    total_amount: row.total_amount,
                    status: row.status,
                    order_date: row.order_date,
                },
                customer_username: row.customer_username,
                customer_email: row.customer_email,
            })
            .collect())
    }

    /// Set an order's status.
    ///
    /// With `enforce_lifecycle` the move must satisfy
    /// [`OrderStatus::can_transition_to`]; otherwise any status may be set.
    ///
    /// # Errors
    ///
    /// Returns `StatusChangeError::NotFound` for an unknown order and
    /// `StatusChangeError::NotAllowed` for a refused lifecycle move.
    pub async fn update_status(
        &self,
        id: OrderId,
        status: OrderStatus,
        enforce_lifecycle: bool,
    ) -> Result<Order, StatusChangeError> {
        let mut tx = self.pool.begin().await?;

        let current = sqlx::query_scalar::<_, OrderStatus>(
            "SELECT status FROM store.customer_order WHERE id = $1 FOR UPDATE",
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(StatusChangeError::NotFound)?;

        if enforce_lifecycle && !current.can_transition_to(status) {
            return Err(StatusChangeError::NotAllowed {
                from: current,
                to: status,
            });
        }

        let row = sqlx::query_as::<_, OrderRow>(
            r"
            UPDATE store.customer_order
            SET status = $2
            WHERE id = $1
            RETURNING id, user_id, total_amount, status, order_date
            ",
        )
        .bind(id)
        .bind(status)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(row.into())
    }

    async fn items_for(
        &self,
        order_ids: &[i32],
    ) -> Result<HashMap<i32, Vec<OrderItemDetail>>, RepositoryError> {
        if order_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let rows = sqlx::query_as::<_, OrderItemDetailRow>(
            r"
            SELECT oi.order_id, oi.product_id, p.name, oi.quantity, oi.unit_price, p.image_url
            FROM store.order_item oi
            JOIN store.product p ON p.id = oi.product_id
            WHERE oi.order_id = ANY($1)
            ORDER BY oi.order_id, oi.id
            ",
        )
        .bind(order_ids)
        .fetch_all(self.pool)
        .await?;

        let mut grouped: HashMap<i32, Vec<OrderItemDetail>> = HashMap::new();
        for row in rows {
            grouped.entry(row.order_id).or_default().push(OrderItemDetail {
                product_id: ProductId::new(row.product_id),
                name: row.name,
                quantity: row.quantity,
                unit_price: row.unit_price,
                image_url: row.image_url,
            });
        }
        Ok(grouped)
    }
}
