//! Integration tests for Tech Store.
//!
//! # Running Tests
//!
//! ```bash
//! # Database-backed tests (migrations are applied automatically)
//! TEST_DATABASE_URL=postgres://localhost/tech_store_test \
//!     cargo test -p tech-store-integration-tests -- --ignored
//!
//! # HTTP tests also need a running server
//! STORE_BASE_URL=http://localhost:5000 \
//!     cargo test -p tech-store-integration-tests --test http_api -- --ignored
//! ```
//!
//! # Test Categories
//!
//! - `order_placement` - Atomic placement against a real database
//! - `cart` - Persisted cart and checkout
//! - `order_status` - Status changes through the in-process router
//! - `http_api` - Black-box tests against a running server
//!
//! Every fixture gets a unique name, so tests can share one database and run
//! in parallel.

use secrecy::SecretString;
use sqlx::PgPool;
use uuid::Uuid;

use tech_store_core::{CategoryId, Email, Money, ProductId, UserId};
use tech_store_storefront::db::{self, AccountRepository, CategoryRepository, ProductRepository};
use tech_store_storefront::models::{CategoryInput, NewProduct, NewUserAccount, ProfileFields};
use tech_store_storefront::services::auth::hash_password;

/// Password given to every fixture account.
pub const TEST_PASSWORD: &str = "integration-test-password";

/// Base URL of a running server for HTTP tests.
#[must_use]
pub fn base_url() -> String {
    std::env::var("STORE_BASE_URL").unwrap_or_else(|_| "http://localhost:5000".to_owned())
}

/// A short random suffix for fixture names.
#[must_use]
pub fn unique(prefix: &str) -> String {
    format!("{prefix}{}", Uuid::new_v4().simple())
}

/// Connect to the test database and bring its schema up to date.
///
/// # Panics
///
/// Panics if `TEST_DATABASE_URL` is unset or the database is unreachable.
pub async fn test_pool() -> PgPool {
    let url = std::env::var("TEST_DATABASE_URL")
        .map(SecretString::from)
        .expect("TEST_DATABASE_URL must be set for database tests");

    let pool = db::create_pool(&url)
        .await
        .expect("Failed to connect to test database");

    sqlx::migrate!("../storefront/migrations")
        .run(&pool)
        .await
        .expect("Failed to run migrations");

    pool
}

/// Insert a category with a unique name.
///
/// # Panics
///
/// Panics if the insert fails.
pub async fn create_category(pool: &PgPool) -> CategoryId {
    CategoryRepository::new(pool)
        .create(&CategoryInput {
            name: unique("category-"),
            description: None,
        })
        .await
        .expect("Failed to create category")
        .id
}

/// Insert a product priced at `price_cents` with `stock` units.
///
/// # Panics
///
/// Panics if the insert fails.
pub async fn create_product(pool: &PgPool, price_cents: u32, stock: i32) -> ProductId {
    let category_id = create_category(pool).await;
    ProductRepository::new(pool)
        .create(&NewProduct {
            name: unique("product-"),
            description: Some("Integration test product".to_owned()),
            price: Money::from_cents(price_cents),
            stock_quantity: stock,
            category_id,
            image_url: None,
        })
        .await
        .expect("Failed to create product")
        .id
}

/// Current stock of a product.
///
/// # Panics
///
/// Panics if the product does not exist.
pub async fn stock_of(pool: &PgPool, product_id: ProductId) -> i32 {
    ProductRepository::new(pool)
        .get(product_id)
        .await
        .expect("Failed to load product")
        .expect("Product should exist")
        .stock_quantity
}

/// Number of orders a customer has.
///
/// # Panics
///
/// Panics if the query fails.
pub async fn order_count(pool: &PgPool, user_id: UserId) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM store.customer_order WHERE user_id = $1")
        .bind(user_id)
        .fetch_one(pool)
        .await
        .expect("Failed to count orders")
}

/// A customer account created for one test.
#[derive(Debug, Clone)]
pub struct TestCustomer {
    pub id: UserId,
    pub username: String,
    pub email: String,
}

/// Insert a customer whose password is [`TEST_PASSWORD`].
///
/// # Panics
///
/// Panics if the insert fails.
pub async fn create_customer(pool: &PgPool) -> TestCustomer {
    let username = unique("user");
    let email = format!("{username}@example.com");

    let account = AccountRepository::new(pool)
        .create_user(&NewUserAccount {
            username: username.clone(),
            email: Email::parse(&email).expect("fixture email is valid"),
            password_hash: hash_password(TEST_PASSWORD).expect("hashing succeeds"),
            profile: ProfileFields::default(),
        })
        .await
        .expect("Failed to create customer");

    TestCustomer {
        id: account.id,
        username,
        email,
    }
}
