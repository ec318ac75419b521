//! Bearer token authentication extractors.
//!
//! Every protected handler takes one of these:
//!
//! - [`RequireAuth`] - any authenticated account
//! - [`RequireCustomer`] - role `user`, with the customer's id
//! - [`RequireStaff`] - role `SuperAdmin` or `Editor`
//!
//! A missing `Authorization: Bearer` header is 401. A token that fails
//! verification, or names an account that no longer exists, is 403. So is a
//! valid identity with the wrong role.

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};

use tech_store_core::{Identity, Role, UserId, authorize};

use crate::error::{AppError, set_sentry_user};
use crate::services::auth::AuthService;
use crate::state::AppState;

/// Extractor that requires any authenticated account.
///
/// # Example
///
/// ```rust,ignore
/// async fn profile(RequireAuth(identity): RequireAuth) -> impl IntoResponse {
///     format!("Hello, {}!", identity.username)
/// }
/// ```
pub struct RequireAuth(pub Identity);

/// Extractor that requires a customer account.
pub struct RequireCustomer {
    pub identity: Identity,
    pub user_id: UserId,
}

/// Extractor that requires a staff account.
pub struct RequireStaff(pub Identity);

/// Pull the token out of an `Authorization: Bearer <token>` header.
fn bearer_token(parts: &Parts) -> Option<&str> {
    let value = parts.headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

impl FromRequestParts<AppState> for RequireAuth {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts).ok_or(AppError::Unauthenticated)?;

        let claims = state.tokens().verify(token).map_err(|e| {
            tracing::debug!(error = %e, "Rejected bearer token");
            AppError::from(e)
        })?;

        let identity = AuthService::new(state.pool(), state.tokens())
            .resolve(&claims)
            .await?;

        set_sentry_user(&identity.account_id(), &identity.username);
        tracing::Span::current().record("account_id", identity.account_id());

        Ok(Self(identity))
    }
}

impl FromRequestParts<AppState> for RequireCustomer {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let RequireAuth(identity) = RequireAuth::from_request_parts(parts, state).await?;
        authorize(&identity, &[Role::User])?;

        let user_id = identity
            .customer_id()
            .ok_or_else(|| AppError::Forbidden("Customer account required".to_owned()))?;

        Ok(Self { identity, user_id })
    }
}

impl FromRequestParts<AppState> for RequireStaff {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let RequireAuth(identity) = RequireAuth::from_request_parts(parts, state).await?;
        authorize(&identity, &Role::ELEVATED)?;
        Ok(Self(identity))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn parts_with(header: Option<&str>) -> Parts {
        let mut builder = Request::builder().uri("/orders");
        if let Some(value) = header {
            builder = builder.header(AUTHORIZATION, value);
        }
        let (parts, ()) = builder.body(()).unwrap().into_parts();
        parts
    }

    #[test]
    fn test_bearer_token_parsing() {
        assert_eq!(bearer_token(&parts_with(Some("Bearer abc.def.ghi"))), Some("abc.def.ghi"));
        assert_eq!(bearer_token(&parts_with(Some("bearer abc"))), Some("abc"));
        assert_eq!(bearer_token(&parts_with(Some("Bearer "))), None);
        assert_eq!(bearer_token(&parts_with(Some("Basic dXNlcjpwdw=="))), None);
        assert_eq!(bearer_token(&parts_with(Some("abc.def.ghi"))), None);
        assert_eq!(bearer_token(&parts_with(None)), None);
    }
}
