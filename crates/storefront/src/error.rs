//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures server errors to Sentry
//! before responding to the client. All route handlers return
//! `Result<T, AppError>`; every error body is JSON with at least a `message`.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use tech_store_core::{CartError, Forbidden, OrderError, ProductId};

use crate::db::{PlaceOrderError, RepositoryError, StatusChangeError};
use crate::services::auth::AuthError;
use crate::services::token::TokenError;

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    /// Client input failed validation.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Not enough stock to satisfy a request.
    #[error(
        "Insufficient stock for product {product_id}. Available: {available}, Requested: {requested}"
    )]
    InsufficientStock {
        product_id: ProductId,
        available: i32,
        requested: i32,
    },

    /// Wrong email or password.
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// A referenced product does not exist.
    #[error("Product {0} not found")]
    ProductNotFound(ProductId),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Request conflicts with existing state.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// No bearer token was presented.
    #[error("Authentication required")]
    Unauthenticated,

    /// Bearer token failed verification.
    #[error("Invalid or expired token")]
    InvalidToken,

    /// Token was valid but its account is gone.
    #[error("Account not found")]
    IdentityNotFound,

    /// Authenticated but not permitted.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Rate limited.
    #[error("Rate limited")]
    RateLimited,

    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(RepositoryError),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    const fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) | Self::InsufficientStock { .. } | Self::InvalidCredentials => {
                StatusCode::BAD_REQUEST
            }
            Self::Unauthenticated => StatusCode::UNAUTHORIZED,
            Self::InvalidToken | Self::IdentityNotFound | Self::Forbidden(_) => {
                StatusCode::FORBIDDEN
            }
            Self::ProductNotFound(_) | Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            Self::Database(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn body(&self) -> serde_json::Value {
        match self {
            Self::InsufficientStock {
                product_id,
                available,
                requested,
            } => json!({
                "message": self.client_message(),
                "product_id": product_id,
                "available": available,
                "requested": requested,
            }),
            Self::ProductNotFound(product_id) => json!({
                "message": self.client_message(),
                "product_id": product_id,
            }),
            _ => json!({ "message": self.client_message() }),
        }
    }

    fn client_message(&self) -> String {
        match self {
            // Don't expose internal error details to clients
            Self::Database(_) | Self::Internal(_) => "Internal server error".to_owned(),
            Self::Validation(msg)
            | Self::NotFound(msg)
            | Self::Conflict(msg)
            | Self::Forbidden(msg) => msg.clone(),
            Self::RateLimited => "Too many requests, please try again later".to_owned(),
            _ => self.to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Capture server errors to Sentry
        if matches!(self, Self::Database(_) | Self::Internal(_)) {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        (self.status(), Json(self.body())).into_response()
    }
}

impl From<RepositoryError> for AppError {
    fn from(e: RepositoryError) -> Self {
        match e {
            RepositoryError::NotFound => Self::NotFound("Resource not found".to_owned()),
            RepositoryError::Conflict(msg) => Self::Conflict(msg),
            RepositoryError::InvalidReference(msg) => Self::Validation(msg),
            other @ (RepositoryError::Database(_) | RepositoryError::DataCorruption(_)) => {
                Self::Database(other)
            }
        }
    }
}

impl From<OrderError> for AppError {
    fn from(e: OrderError) -> Self {
        match e {
            OrderError::ProductNotFound(id) => Self::ProductNotFound(id),
            OrderError::InsufficientStock {
                product_id,
                available,
                requested,
            } => Self::InsufficientStock {
                product_id,
                available,
                requested,
            },
            OrderError::Empty | OrderError::InvalidQuantity { .. } | OrderError::TotalOverflow => {
                Self::Validation(e.to_string())
            }
        }
    }
}

impl From<CartError> for AppError {
    fn from(e: CartError) -> Self {
        match e {
            CartError::InsufficientStock {
                product_id,
                available,
                requested,
            } => Self::InsufficientStock {
                product_id,
                available,
                requested,
            },
            CartError::InvalidQuantity(_) | CartError::TotalOverflow => {
                Self::Validation(e.to_string())
            }
        }
    }
}

impl From<PlaceOrderError> for AppError {
    fn from(e: PlaceOrderError) -> Self {
        match e {
            PlaceOrderError::Rejected(e) => e.into(),
            PlaceOrderError::Repository(e) => e.into(),
        }
    }
}

impl From<StatusChangeError> for AppError {
    fn from(e: StatusChangeError) -> Self {
        match e {
            StatusChangeError::NotFound => Self::NotFound("Order not found".to_owned()),
            StatusChangeError::NotAllowed { .. } => Self::Conflict(e.to_string()),
            StatusChangeError::Repository(e) => e.into(),
        }
    }
}

impl From<AuthError> for AppError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::InvalidCredentials => Self::InvalidCredentials,
            AuthError::InvalidEmail(_) => Self::Validation("Invalid email address".to_owned()),
            AuthError::InvalidUsername(msg) | AuthError::WeakPassword(msg) => Self::Validation(msg),
            AuthError::EmptyUpdate => Self::Validation("No fields to update".to_owned()),
            AuthError::AccountExists(msg) => Self::Conflict(msg),
            AuthError::IdentityNotFound => Self::IdentityNotFound,
            AuthError::Token(e) => e.into(),
            AuthError::Repository(e) => e.into(),
            AuthError::PasswordHash => Self::Internal(e.to_string()),
        }
    }
}

impl From<TokenError> for AppError {
    fn from(e: TokenError) -> Self {
        match e {
            TokenError::Key(_) | TokenError::Lifetime => Self::Internal(e.to_string()),
            TokenError::Malformed
            | TokenError::UnsupportedAlgorithm(_)
            | TokenError::BadSignature
            | TokenError::Expired => Self::InvalidToken,
        }
    }
}

impl From<Forbidden> for AppError {
    fn from(e: Forbidden) -> Self {
        Self::Forbidden(format!("Access denied: {e}"))
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context for the authenticated caller.
///
/// Call this after successful authentication to associate errors with users.
pub fn set_sentry_user(account_id: &impl ToString, username: &str) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(account_id.to_string()),
            username: Some(username.to_owned()),
            ..Default::default()
        }));
    });
}

/// Add a breadcrumb for user actions.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of user actions
/// leading up to an error.
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_owned()),
        message: Some(message.to_owned()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_owned(),
                serde_json::Value::String((*value).to_owned()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    fn get_status(err: AppError) -> StatusCode {
        err.into_response().status()
    }

    async fn get_body(err: AppError) -> serde_json::Value {
        let bytes = to_bytes(err.into_response().into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn test_app_error_display() {
        let err = AppError::NotFound("product-123".to_owned());
        assert_eq!(err.to_string(), "Not found: product-123");

        let err = AppError::Validation("invalid input".to_owned());
        assert_eq!(err.to_string(), "Validation error: invalid input");
    }

    #[test]
    fn test_app_error_status_codes() {
        assert_eq!(
            get_status(AppError::Validation("test".to_owned())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(AppError::InvalidCredentials),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(AppError::Unauthenticated),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(get_status(AppError::InvalidToken), StatusCode::FORBIDDEN);
        assert_eq!(
            get_status(AppError::IdentityNotFound),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            get_status(AppError::Forbidden("test".to_owned())),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            get_status(AppError::NotFound("test".to_owned())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            get_status(AppError::Conflict("test".to_owned())),
            StatusCode::CONFLICT
        );
        assert_eq!(
            get_status(AppError::RateLimited),
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(
            get_status(AppError::Internal("test".to_owned())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[tokio::test]
    async fn test_insufficient_stock_body() {
        let err: AppError = OrderError::InsufficientStock {
            product_id: ProductId::new(7),
            available: 2,
            requested: 3,
        }
        .into();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);

        let body = get_body(err).await;
        assert_eq!(body["product_id"], 7);
        assert_eq!(body["available"], 2);
        assert_eq!(body["requested"], 3);
        assert_eq!(
            body["message"],
            "Insufficient stock for product 7. Available: 2, Requested: 3"
        );
    }

    #[tokio::test]
    async fn test_internal_details_hidden() {
        let body = get_body(AppError::Internal("pool exhausted at 10.0.0.3".to_owned())).await;
        assert_eq!(body["message"], "Internal server error");
    }

    #[test]
    fn test_order_error_mapping() {
        assert!(matches!(
            AppError::from(OrderError::Empty),
            AppError::Validation(_)
        ));
        assert!(matches!(
            AppError::from(OrderError::ProductNotFound(ProductId::new(3))),
            AppError::ProductNotFound(id) if id == ProductId::new(3)
        ));
        assert!(matches!(
            AppError::from(PlaceOrderError::Repository(RepositoryError::NotFound)),
            AppError::NotFound(_)
        ));
    }

    #[test]
    fn test_status_change_mapping() {
        use tech_store_core::OrderStatus;

        assert_eq!(
            get_status(StatusChangeError::NotFound.into()),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            get_status(
                StatusChangeError::NotAllowed {
                    from: OrderStatus::Delivered,
                    to: OrderStatus::Pending,
                }
                .into()
            ),
            StatusCode::CONFLICT
        );
    }

    #[test]
    fn test_token_errors_are_forbidden() {
        assert_eq!(get_status(TokenError::Expired.into()), StatusCode::FORBIDDEN);
        assert_eq!(
            get_status(TokenError::BadSignature.into()),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            get_status(TokenError::Lifetime.into()),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_auth_error_mapping() {
        assert_eq!(
            get_status(AuthError::InvalidCredentials.into()),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(AuthError::AccountExists("email already registered".to_owned()).into()),
            StatusCode::CONFLICT
        );
        assert_eq!(
            get_status(AuthError::EmptyUpdate.into()),
            StatusCode::BAD_REQUEST
        );
    }
}
