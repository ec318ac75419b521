//! Order status changes driven through the in-process router.
//!
//! These tests require a `PostgreSQL` database at `TEST_DATABASE_URL` but no
//! running server.

use std::time::Duration;

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Method, Request, StatusCode, header},
};
use secrecy::SecretString;
use serde_json::{Value, json};
use sqlx::PgPool;
use tower::ServiceExt;

use tech_store_core::{AccountRef, AdminRole, Email, OrderId, OrderLine, OrderStatus, Role, UserId};
use tech_store_integration_tests::{create_customer, create_product, test_pool, unique};
use tech_store_storefront::app;
use tech_store_storefront::config::{AuthConfig, StoreConfig};
use tech_store_storefront::db::{AccountRepository, OrderRepository};
use tech_store_storefront::services::auth::hash_password;
use tech_store_storefront::state::AppState;

const TOKEN_SECRET: &str = "Zp4!rQ8#vL2@kW6$xN9&tB3*mH7^cJ5%";

fn test_state(pool: PgPool) -> AppState {
    let config = StoreConfig {
        database_url: SecretString::from("postgres://unused"),
        host: "127.0.0.1".parse().expect("valid address"),
        port: 0,
        auth: AuthConfig {
            token_secret: SecretString::from(TOKEN_SECRET),
            token_ttl: Duration::from_secs(600),
        },
        cors_origins: Vec::new(),
        enforce_status_transitions: false,
        log_json: false,
        trust_proxy: false,
        sentry_dsn: None,
        sentry_environment: None,
        sentry_sample_rate: 0.0,
        sentry_traces_sample_rate: 0.0,
    };
    AppState::new(config, pool)
}

/// Insert an editor and return a bearer token for them.
async fn staff_token(pool: &PgPool, state: &AppState) -> String {
    let username = unique("editor");
    let email = Email::parse(&format!("{username}@example.com")).expect("fixture email is valid");
    let admin = AccountRepository::new(pool)
        .create_admin(
            &username,
            &email,
            &hash_password("editor-test-password").expect("hashing succeeds"),
            AdminRole::Editor,
        )
        .await
        .expect("Failed to create admin");

    state
        .tokens()
        .issue(AccountRef::Admin(admin.id), Role::Editor)
        .expect("token issues")
        .token
}

async fn place_order(pool: &PgPool, user_id: UserId) -> OrderId {
    let product_id = create_product(pool, 4999, 3).await;
    OrderRepository::new(pool)
        .place(
            user_id,
            &[OrderLine {
                product_id,
                quantity: 1,
            }],
        )
        .await
        .expect("order should be placed")
        .order
        .id
}

async fn put_status(router: Router, token: &str, id: OrderId, status: &str) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(Method::PUT)
        .uri(format!("/orders/{id}/status"))
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(json!({ "status": status }).to_string()))
        .expect("valid request");

    let response = router.oneshot(request).await.expect("router responds");
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body reads");
    (status, serde_json::from_slice(&bytes).expect("JSON body"))
}

async fn status_of(pool: &PgPool, id: OrderId, user_id: UserId) -> OrderStatus {
    OrderRepository::new(pool)
        .get_for_user(id, user_id)
        .await
        .expect("Failed to load order")
        .expect("Order should exist")
        .order
        .status
}

#[tokio::test]
#[ignore = "Requires PostgreSQL database"]
async fn test_unknown_status_is_400_and_order_unchanged() {
    let pool = test_pool().await;
    let state = test_state(pool.clone());
    let token = staff_token(&pool, &state).await;
    let customer = create_customer(&pool).await;
    let id = place_order(&pool, customer.id).await;

    for bogus in ["Lost", "pending", ""] {
        let (status, body) = put_status(app(state.clone()), &token, id, bogus).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "status {bogus:?}");
        assert!(
            body["message"]
                .as_str()
                .is_some_and(|m| m.starts_with("Invalid status")),
            "unexpected body {body}"
        );
        assert_eq!(status_of(&pool, id, customer.id).await, OrderStatus::Pending);
    }
}

#[tokio::test]
#[ignore = "Requires PostgreSQL database"]
async fn test_known_status_is_applied() {
    let pool = test_pool().await;
    let state = test_state(pool.clone());
    let token = staff_token(&pool, &state).await;
    let customer = create_customer(&pool).await;
    let id = place_order(&pool, customer.id).await;

    let (status, body) = put_status(app(state), &token, id, "Shipped").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["order"]["status"], "Shipped");
    assert_eq!(status_of(&pool, id, customer.id).await, OrderStatus::Shipped);
}
