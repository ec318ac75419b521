//! Database operations for the storefront `PostgreSQL` schema.
//!
//! # Schema: `store`
//!
//! ## Tables
//!
//! - `category` - Product categories (unique name)
//! - `product` - Catalog, with `stock_quantity >= 0` enforced by a CHECK
//! - `user_account` - Customer accounts
//! - `admin_user` - Staff accounts (`SuperAdmin` / `Editor`)
//! - `customer_order` - Order headers; only `status` ever changes
//! - `order_item` - Order lines with snapshotted unit prices
//! - `cart_line` - Persisted cart lines, one per (customer, product)
//!
//! # Migrations
//!
//! Migrations are stored in `crates/storefront/migrations/` and run via:
//! ```bash
//! cargo run -p tech-store-cli -- migrate
//! ```

pub mod accounts;
pub mod carts;
pub mod categories;
pub mod orders;
pub mod products;

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

pub use accounts::{AccountRepository, StoredCredentials};
pub use carts::CartRepository;
pub use categories::CategoryRepository;
pub use orders::{OrderRepository, PlaceOrderError, StatusChangeError};
pub use products::ProductRepository;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., unique email, row still referenced).
    #[error("constraint violation: {0}")]
    Conflict(String),

    /// A foreign key points at a row that does not exist.
    #[error("invalid reference: {0}")]
    InvalidReference(String),
}

/// Map a unique violation to [`RepositoryError::Conflict`] with `message`.
pub(crate) fn on_unique_violation(e: sqlx::Error, message: &str) -> RepositoryError {
    if let sqlx::Error::Database(ref db_err) = e
        && db_err.is_unique_violation()
    {
        return RepositoryError::Conflict(message.to_owned());
    }
    RepositoryError::Database(e)
}

/// Name of the violated constraint, if `e` is a unique violation.
pub(crate) fn unique_constraint(e: &sqlx::Error) -> Option<String> {
    if let sqlx::Error::Database(db_err) = e
        && db_err.is_unique_violation()
    {
        return Some(db_err.constraint().unwrap_or_default().to_owned());
    }
    None
}

/// Whether `e` is a foreign key violation.
pub(crate) fn is_foreign_key_violation(e: &sqlx::Error) -> bool {
    matches!(e, sqlx::Error::Database(db_err) if db_err.is_foreign_key_violation())
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}
