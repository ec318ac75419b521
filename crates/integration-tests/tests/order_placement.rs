//! Integration tests for atomic order placement.
//!
//! These tests require a `PostgreSQL` database at `TEST_DATABASE_URL`.
//!
//! Run with: cargo test -p tech-store-integration-tests -- --ignored

#![allow(clippy::indexing_slicing)]

use std::sync::Arc;

use tech_store_core::{Money, OrderError, OrderLine, OrderStatus};
use tech_store_integration_tests::{
    create_customer, create_product, order_count, stock_of, test_pool,
};
use tech_store_storefront::db::{OrderRepository, PlaceOrderError, StatusChangeError};

fn line(product_id: tech_store_core::ProductId, quantity: i32) -> OrderLine {
    OrderLine {
        product_id,
        quantity,
    }
}

// =============================================================================
// Placement
// =============================================================================

#[tokio::test]
#[ignore = "Requires PostgreSQL database"]
async fn test_place_order_decrements_stock_and_snapshots_price() {
    let pool = test_pool().await;
    let customer = create_customer(&pool).await;
    let product = create_product(&pool, 1999, 5).await;

    let placed = OrderRepository::new(&pool)
        .place(customer.id, &[line(product, 3)])
        .await
        .expect("order should be placed");

    assert_eq!(placed.order.status, OrderStatus::Pending);
    assert_eq!(placed.order.user_id, customer.id);
    assert_eq!(placed.order.total_amount, Money::from_cents(5997));
    assert_eq!(placed.items.len(), 1);
    assert_eq!(placed.items[0].unit_price, Money::from_cents(1999));
    assert_eq!(stock_of(&pool, product).await, 2);
}

#[tokio::test]
#[ignore = "Requires PostgreSQL database"]
async fn test_insufficient_stock_writes_nothing() {
    let pool = test_pool().await;
    let customer = create_customer(&pool).await;
    let product = create_product(&pool, 1000, 2).await;

    let err = OrderRepository::new(&pool)
        .place(customer.id, &[line(product, 3)])
        .await
        .expect_err("order should be refused");

    assert!(matches!(
        err,
        PlaceOrderError::Rejected(OrderError::InsufficientStock {
            available: 2,
            requested: 3,
            ..
        })
    ));
    assert_eq!(stock_of(&pool, product).await, 2);
    assert_eq!(order_count(&pool, customer.id).await, 0);
}

#[tokio::test]
#[ignore = "Requires PostgreSQL database"]
async fn test_failed_line_rolls_back_earlier_lines() {
    let pool = test_pool().await;
    let customer = create_customer(&pool).await;
    let plenty = create_product(&pool, 500, 10).await;
    let scarce = create_product(&pool, 500, 1).await;

    let result = OrderRepository::new(&pool)
        .place(customer.id, &[line(plenty, 4), line(scarce, 2)])
        .await;

    assert!(result.is_err());
    assert_eq!(stock_of(&pool, plenty).await, 10);
    assert_eq!(stock_of(&pool, scarce).await, 1);
    assert_eq!(order_count(&pool, customer.id).await, 0);
}

#[tokio::test]
#[ignore = "Requires PostgreSQL database"]
async fn test_repeated_product_shares_stock() {
    let pool = test_pool().await;
    let customer = create_customer(&pool).await;
    let product = create_product(&pool, 100, 3).await;

    let err = OrderRepository::new(&pool)
        .place(customer.id, &[line(product, 2), line(product, 2)])
        .await
        .expect_err("combined quantity exceeds stock");

    assert!(matches!(
        err,
        PlaceOrderError::Rejected(OrderError::InsufficientStock { .. })
    ));
    assert_eq!(stock_of(&pool, product).await, 3);
}

#[tokio::test]
#[ignore = "Requires PostgreSQL database"]
async fn test_unknown_product_rejected() {
    let pool = test_pool().await;
    let customer = create_customer(&pool).await;
    let missing = tech_store_core::ProductId::new(i32::MAX);

    let err = OrderRepository::new(&pool)
        .place(customer.id, &[line(missing, 1)])
        .await
        .expect_err("unknown product");

    assert!(matches!(
        err,
        PlaceOrderError::Rejected(OrderError::ProductNotFound(id)) if id == missing
    ));
}

#[tokio::test]
#[ignore = "Requires PostgreSQL database"]
async fn test_total_too_large_for_column_rejected() {
    let pool = test_pool().await;
    let customer = create_customer(&pool).await;
    let product = create_product(&pool, 100_000, 200_000).await;

    let err = OrderRepository::new(&pool)
        .place(customer.id, &[line(product, 200_000)])
        .await
        .expect_err("total above NUMERIC(10,2)");

    assert!(matches!(err, PlaceOrderError::Rejected(OrderError::TotalOverflow)));
    assert_eq!(stock_of(&pool, product).await, 200_000);
    assert_eq!(order_count(&pool, customer.id).await, 0);
}

#[tokio::test]
#[ignore = "Requires PostgreSQL database"]
async fn test_empty_order_rejected() {
    let pool = test_pool().await;
    let customer = create_customer(&pool).await;

    let err = OrderRepository::new(&pool)
        .place(customer.id, &[])
        .await
        .expect_err("empty order");

    assert!(matches!(err, PlaceOrderError::Rejected(OrderError::Empty)));
}

#[tokio::test]
#[ignore = "Requires PostgreSQL database"]
async fn test_concurrent_orders_for_last_unit() {
    let pool = Arc::new(test_pool().await);
    let product = create_product(&pool, 2500, 1).await;
    let first = create_customer(&pool).await;
    let second = create_customer(&pool).await;

    let attempts = [first.id, second.id].map(|user_id| {
        let pool = Arc::clone(&pool);
        tokio::spawn(async move {
            OrderRepository::new(&pool)
                .place(user_id, &[line(product, 1)])
                .await
        })
    });

    let mut succeeded = 0;
    let mut refused = 0;
    for attempt in attempts {
        match attempt.await.expect("task should not panic") {
            Ok(_) => succeeded += 1,
            Err(PlaceOrderError::Rejected(OrderError::InsufficientStock { .. })) => refused += 1,
            Err(other) => panic!("unexpected error: {other}"),
        }
    }

    assert_eq!(succeeded, 1);
    assert_eq!(refused, 1);
    assert_eq!(stock_of(&pool, product).await, 0);
}

// =============================================================================
// History and Status
// =============================================================================

#[tokio::test]
#[ignore = "Requires PostgreSQL database"]
async fn test_history_is_scoped_to_owner() {
    let pool = test_pool().await;
    let owner = create_customer(&pool).await;
    let other = create_customer(&pool).await;
    let product = create_product(&pool, 750, 5).await;

    let repo = OrderRepository::new(&pool);
    let placed = repo
        .place(owner.id, &[line(product, 1)])
        .await
        .expect("order should be placed");

    let history = repo.list_for_user(owner.id).await.expect("history loads");
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].items.len(), 1);
    assert_eq!(history[0].items[0].quantity, 1);

    let hidden = repo
        .get_for_user(placed.order.id, other.id)
        .await
        .expect("query succeeds");
    assert!(hidden.is_none());
}

#[tokio::test]
#[ignore = "Requires PostgreSQL database"]
async fn test_status_update_and_lifecycle_enforcement() {
    let pool = test_pool().await;
    let customer = create_customer(&pool).await;
    let product = create_product(&pool, 300, 5).await;

    let repo = OrderRepository::new(&pool);
    let placed = repo
        .place(customer.id, &[line(product, 1)])
        .await
        .expect("order should be placed");
    let id = placed.order.id;

    let delivered = repo
        .update_status(id, OrderStatus::Delivered, false)
        .await
        .expect("unrestricted change succeeds");
    assert_eq!(delivered.status, OrderStatus::Delivered);
    assert_eq!(delivered.total_amount, placed.order.total_amount);

    let err = repo
        .update_status(id, OrderStatus::Pending, true)
        .await
        .expect_err("delivered orders are terminal");
    assert!(matches!(err, StatusChangeError::NotAllowed { .. }));

    let missing = repo
        .update_status(tech_store_core::OrderId::new(i32::MAX), OrderStatus::Shipped, false)
        .await
        .expect_err("unknown order");
    assert!(matches!(missing, StatusChangeError::NotFound));
}
