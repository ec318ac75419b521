//! Integration tests for the persisted cart.
//!
//! These tests require a `PostgreSQL` database at `TEST_DATABASE_URL`.

#![allow(clippy::indexing_slicing)]

use tech_store_core::{CartProduct, Money, OrderError, ProductId};
use tech_store_integration_tests::{
    create_customer, create_product, order_count, stock_of, test_pool,
};
use tech_store_storefront::db::{CartRepository, PlaceOrderError, ProductRepository};

async fn cart_product(pool: &sqlx::PgPool, id: ProductId) -> CartProduct {
    let product = ProductRepository::new(pool)
        .get(id)
        .await
        .expect("Failed to load product")
        .expect("Product should exist");

    CartProduct {
        id: product.id,
        name: product.name,
        price: product.price,
        image_url: product.image_url,
        stock_quantity: product.stock_quantity,
    }
}

#[tokio::test]
#[ignore = "Requires PostgreSQL database"]
async fn test_add_merges_lines_and_adjust_removes_at_zero() {
    let pool = test_pool().await;
    let customer = create_customer(&pool).await;
    let id = create_product(&pool, 1250, 10).await;
    let product = cart_product(&pool, id).await;

    let carts = CartRepository::new(&pool);
    carts.add(customer.id, &product, 1).await.expect("add");
    let cart = carts.add(customer.id, &product, 1).await.expect("add again");

    assert_eq!(cart.total_items(), 1);
    assert_eq!(cart.lines()[0].quantity, 2);
    assert_eq!(cart.total_amount().expect("total"), Money::from_cents(2500));

    let cart = carts.adjust(customer.id, id, -2).await.expect("adjust");
    assert!(cart.is_empty());
    assert!(carts.get(customer.id).await.expect("reload").is_empty());
}

#[tokio::test]
#[ignore = "Requires PostgreSQL database"]
async fn test_repeated_adds_capped_at_stock() {
    let pool = test_pool().await;
    let customer = create_customer(&pool).await;
    let id = create_product(&pool, 500, 4).await;
    let product = cart_product(&pool, id).await;

    let carts = CartRepository::new(&pool);
    carts.add(customer.id, &product, 3).await.expect("add");
    let cart = carts.add(customer.id, &product, 3).await.expect("add again");
    assert_eq!(cart.lines()[0].quantity, 4);

    // A line near the column limit must not overflow on merge
    sqlx::query("UPDATE store.cart_line SET quantity = $3 WHERE user_id = $1 AND product_id = $2")
        .bind(customer.id)
        .bind(id)
        .bind(i32::MAX)
        .execute(&pool)
        .await
        .expect("raise quantity");
    let cart = carts.add(customer.id, &product, 4).await.expect("merge near limit");
    assert_eq!(cart.lines()[0].quantity, 4);
}

#[tokio::test]
#[ignore = "Requires PostgreSQL database"]
async fn test_adjust_and_remove_absent_line_are_noops() {
    let pool = test_pool().await;
    let customer = create_customer(&pool).await;
    let id = create_product(&pool, 100, 1).await;

    let carts = CartRepository::new(&pool);
    assert!(carts.adjust(customer.id, id, 3).await.expect("adjust").is_empty());
    assert!(carts.remove(customer.id, id).await.expect("remove").is_empty());
}

#[tokio::test]
#[ignore = "Requires PostgreSQL database"]
async fn test_checkout_places_order_and_empties_cart() {
    let pool = test_pool().await;
    let customer = create_customer(&pool).await;
    let id = create_product(&pool, 4999, 4).await;
    let product = cart_product(&pool, id).await;

    let carts = CartRepository::new(&pool);
    carts.add(customer.id, &product, 3).await.expect("add");

    let placed = carts.checkout(customer.id).await.expect("checkout");
    assert_eq!(placed.order.total_amount, Money::from_cents(14997));
    assert_eq!(stock_of(&pool, id).await, 1);
    assert!(carts.get(customer.id).await.expect("reload").is_empty());
}

#[tokio::test]
#[ignore = "Requires PostgreSQL database"]
async fn test_checkout_failure_keeps_cart() {
    let pool = test_pool().await;
    let customer = create_customer(&pool).await;
    let id = create_product(&pool, 800, 5).await;
    let product = cart_product(&pool, id).await;

    let carts = CartRepository::new(&pool);
    carts.add(customer.id, &product, 5).await.expect("add");

    // Someone else buys most of the stock in the meantime
    sqlx::query("UPDATE store.product SET stock_quantity = 2 WHERE id = $1")
        .bind(id)
        .execute(&pool)
        .await
        .expect("stock update");

    let err = carts.checkout(customer.id).await.expect_err("not enough stock");
    assert!(matches!(
        err,
        PlaceOrderError::Rejected(OrderError::InsufficientStock {
            available: 2,
            requested: 5,
            ..
        })
    ));
    assert_eq!(carts.get(customer.id).await.expect("reload").lines()[0].quantity, 5);
    assert_eq!(order_count(&pool, customer.id).await, 0);
}

#[tokio::test]
#[ignore = "Requires PostgreSQL database"]
async fn test_checkout_of_empty_cart_rejected() {
    let pool = test_pool().await;
    let customer = create_customer(&pool).await;

    let err = CartRepository::new(&pool)
        .checkout(customer.id)
        .await
        .expect_err("empty cart");
    assert!(matches!(err, PlaceOrderError::Rejected(OrderError::Empty)));
}
