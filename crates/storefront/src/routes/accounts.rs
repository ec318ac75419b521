//! Account route handlers: registration, login and profile.

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    middleware::map_response,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use tech_store_core::{AccountRef, Email, Identity, Role};

use super::extract::ApiJson;
use crate::error::Result;
use crate::middleware::{RequireAuth, RequireCustomer, auth_rate_limiter, rate_limit_response};
use crate::models::UserAccount;
use crate::services::auth::{AuthService, ProfileChanges, Registration};
use crate::state::AppState;

/// Build the account router.
///
/// Registration and login are rate limited per client IP. With
/// `trust_proxy` the IP is read from proxy headers first.
pub fn router(trust_proxy: bool) -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .layer(auth_rate_limiter(trust_proxy))
        .layer(map_response(rate_limit_response))
        .route("/profile", get(profile).put(update_profile))
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Account summary returned by registration.
#[derive(Debug, Serialize)]
pub struct AccountSummary {
    pub id: i32,
    pub username: String,
    pub email: Email,
}

/// Identity summary returned by login and the staff profile.
#[derive(Debug, Serialize)]
pub struct IdentitySummary {
    pub id: i32,
    pub username: String,
    pub email: Email,
    pub role: Role,
}

impl From<Identity> for IdentitySummary {
    fn from(identity: Identity) -> Self {
        Self {
            id: identity.account_id(),
            username: identity.username,
            email: identity.email,
            role: identity.role,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub message: &'static str,
    pub user: AccountSummary,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub message: &'static str,
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub user: IdentitySummary,
}

#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub message: &'static str,
    pub user: UserAccount,
}

/// Register a customer account.
///
/// # Errors
///
/// Returns 400 for invalid input and 409 if the email or username is taken.
#[instrument(skip_all)]
pub async fn register(
    State(state): State<AppState>,
    ApiJson(input): ApiJson<Registration>,
) -> Result<(StatusCode, Json<RegisterResponse>)> {
    let account = AuthService::new(state.pool(), state.tokens())
        .register(input)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            message: "User registered successfully",
            user: AccountSummary {
                id: account.id.as_i32(),
                username: account.username,
                email: account.email,
            },
        }),
    ))
}

/// Exchange email and password for a bearer token.
///
/// # Errors
///
/// Returns 400 "Invalid credentials" for any credential failure.
#[instrument(skip_all)]
pub async fn login(
    State(state): State<AppState>,
    ApiJson(input): ApiJson<LoginRequest>,
) -> Result<Json<LoginResponse>> {
    let session = AuthService::new(state.pool(), state.tokens())
        .login(&input.email, &input.password)
        .await?;

    Ok(Json(LoginResponse {
        message: "Login successful",
        token: session.token.token,
        expires_at: session.token.expires_at,
        user: session.identity.into(),
    }))
}

/// The caller's profile.
///
/// Customers get their full account; staff get their identity summary.
///
/// # Errors
///
/// Returns 403 if the account vanished since the token was issued.
#[instrument(skip_all)]
pub async fn profile(
    RequireAuth(identity): RequireAuth,
    State(state): State<AppState>,
) -> Result<Response> {
    match identity.account {
        AccountRef::Customer(user_id) => {
            let account = AuthService::new(state.pool(), state.tokens())
                .get_profile(user_id)
                .await?;
            Ok(Json(account).into_response())
        }
        AccountRef::Admin(_) => Ok(Json(IdentitySummary::from(identity)).into_response()),
    }
}

/// Update the caller's own customer profile.
///
/// # Errors
///
/// Returns 400 for an empty or invalid update, 403 for staff accounts and
/// 409 if a new email or username is taken.
#[instrument(skip_all)]
pub async fn update_profile(
    customer: RequireCustomer,
    State(state): State<AppState>,
    ApiJson(changes): ApiJson<ProfileChanges>,
) -> Result<Json<ProfileResponse>> {
    let user = AuthService::new(state.pool(), state.tokens())
        .update_profile(customer.user_id, changes)
        .await?;

    tracing::info!(user_id = %customer.user_id, "Profile updated");
    Ok(Json(ProfileResponse {
        message: "Profile updated successfully",
        user,
    }))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use tech_store_core::{AdminRole, AdminUserId, UserId};

    #[test]
    fn test_identity_summary_for_customer() {
        let identity = Identity::customer(
            UserId::new(5),
            "jane".to_owned(),
            Email::parse("jane@example.com").unwrap(),
        );
        let json = serde_json::to_value(IdentitySummary::from(identity)).unwrap();
        assert_eq!(json["id"], 5);
        assert_eq!(json["role"], "user");
        assert_eq!(json["email"], "jane@example.com");
    }

    #[test]
    fn test_identity_summary_for_staff() {
        let identity = Identity::admin(
            AdminUserId::new(2),
            "root".to_owned(),
            Email::parse("root@example.com").unwrap(),
            AdminRole::SuperAdmin,
        );
        let json = serde_json::to_value(IdentitySummary::from(identity)).unwrap();
        assert_eq!(json["role"], "SuperAdmin");
    }
}
