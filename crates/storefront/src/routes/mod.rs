//! HTTP route handlers for the storefront API.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                       - Liveness
//! GET  /health/ready                 - Readiness (database reachable)
//!
//! # Accounts
//! POST /accounts/register            - Register a customer (rate limited)
//! POST /accounts/login               - Get a bearer token (rate limited)
//! GET  /accounts/profile             - Caller's profile
//! PUT  /accounts/profile             - Update own profile (customer)
//!
//! # Catalog
//! GET  /products                     - List (category_id, search, limit, offset)
//! POST /products                     - Create (staff)
//! GET  /products/{id}                - Detail
//! PUT  /products/{id}                - Partial update (staff)
//! DELETE /products/{id}              - Delete (staff)
//! GET  /categories                   - List by name
//! POST /categories                   - Create (staff)
//! GET|PUT|DELETE /categories/{id}    - Detail / edit / delete (staff for writes)
//!
//! # Orders
//! POST /orders                       - Place an order (customer)
//! GET  /orders                       - Own order history (customer)
//! GET  /orders/admin                 - All orders (staff)
//! GET  /orders/{id}                  - One own order (customer)
//! PUT  /orders/{id}/status           - Change status (staff)
//!
//! # Cart (customer)
//! GET    /carts                      - View
//! POST   /carts/add                  - Add a product
//! PATCH  /carts/items/{product_id}   - Adjust quantity by delta
//! DELETE /carts/items/{product_id}   - Remove a line
//! POST   /carts/checkout             - Place an order from the cart
//! ```

pub mod accounts;
pub mod carts;
pub mod categories;
pub mod extract;
pub mod orders;
pub mod products;

use axum::{Router, extract::State, http::StatusCode, routing::get};

use crate::config::StoreConfig;
use crate::state::AppState;

/// Create all routes for the storefront.
pub fn routes(config: &StoreConfig) -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .nest("/accounts", accounts::router(config.trust_proxy))
        .nest("/products", products::router())
        .nest("/categories", categories::router())
        .nest("/orders", orders::router())
        .nest("/carts", carts::router())
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Returns 503 Service Unavailable if the database is not reachable.
async fn readiness(State(state): State<AppState>) -> StatusCode {
    match sqlx::query("SELECT 1").fetch_one(state.pool()).await {
        Ok(_) => StatusCode::OK,
        Err(e) => {
            tracing::warn!(error = %e, "Readiness check failed");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}
