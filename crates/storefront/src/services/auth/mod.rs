//! Authentication service.
//!
//! Password login for customers and staff, bearer token issue, and
//! resolution of a verified token back to a live [`Identity`].

mod error;

pub use error::AuthError;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use serde::Deserialize;
use sqlx::PgPool;
use tracing::instrument;

use tech_store_core::{AccountRef, Email, Identity, UserId};

use crate::db::{AccountRepository, RepositoryError, StoredCredentials};
use crate::models::{NewUserAccount, ProfileFields, ProfileUpdate, UserAccount};
use crate::services::token::{Claims, IssuedToken, TokenIssuer};

/// Minimum password length.
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Maximum username length.
const MAX_USERNAME_LENGTH: usize = 50;

/// Input for customer self-registration.
#[derive(Debug, Clone, Deserialize)]
pub struct Registration {
    pub username: String,
    pub email: String,
    pub password: String,
    #[serde(flatten)]
    pub profile: ProfileFields,
}

/// Requested changes to a customer's own account.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileChanges {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    #[serde(flatten)]
    pub profile: ProfileFields,
}

/// A successful login.
#[derive(Debug)]
pub struct Session {
    pub token: IssuedToken,
    pub identity: Identity,
}

/// Authentication service.
///
/// Handles registration, password login and token resolution.
pub struct AuthService<'a> {
    accounts: AccountRepository<'a>,
    tokens: &'a TokenIssuer,
}

impl<'a> AuthService<'a> {
    /// Create a new authentication service.
    #[must_use]
    pub const fn new(pool: &'a PgPool, tokens: &'a TokenIssuer) -> Self {
        Self {
            accounts: AccountRepository::new(pool),
            tokens,
        }
    }

    /// Register a new customer account.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidEmail` if the email format is invalid.
    /// Returns `AuthError::WeakPassword` if the password doesn't meet requirements.
    /// Returns `AuthError::AccountExists` if the email or username is taken.
    #[instrument(skip(self, input), fields(username = %input.username))]
    pub async fn register(&self, input: Registration) -> Result<UserAccount, AuthError> {
        let username = validate_username(&input.username)?;
        let email = Email::parse(&input.email)?;
        validate_password(&input.password)?;
        let password_hash = hash_password(&input.password)?;

        let account = self
            .accounts
            .create_user(&NewUserAccount {
                username,
                email,
                password_hash,
                profile: input.profile,
            })
            .await
            .map_err(on_conflict)?;

        tracing::info!(user_id = %account.id, "Customer registered");
        Ok(account)
    }

    /// Login with email and password.
    ///
    /// Customers are matched before staff. Every failure reads the same to
    /// the caller.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` if the email/password is wrong.
    #[instrument(skip_all)]
    pub async fn login(&self, email: &str, password: &str) -> Result<Session, AuthError> {
        let email = Email::parse(email).map_err(|_| AuthError::InvalidCredentials)?;

        let credentials = self
            .accounts
            .find_credentials(&email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        let account = match &credentials {
            StoredCredentials::Customer { id, password_hash } => {
                verify_password(password, password_hash)?;
                AccountRef::Customer(*id)
            }
            StoredCredentials::Admin { id, password_hash } => {
                verify_password(password, password_hash)?;
                AccountRef::Admin(*id)
            }
        };

        let identity = self.load_identity(account).await?;
        let token = self.tokens.issue(identity.account, identity.role)?;

        tracing::info!(account_id = identity.account_id(), role = %identity.role, "Login succeeded");
        Ok(Session { token, identity })
    }

    /// Resolve verified claims to the account they name.
    ///
    /// Customers always get the `user` role; staff get their stored role, so a
    /// role change takes effect on the next request.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::IdentityNotFound` if the account no longer exists.
    pub async fn resolve(&self, claims: &Claims) -> Result<Identity, AuthError> {
        self.load_identity(claims.account()).await
    }

    /// Get a customer's full account.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::IdentityNotFound` if the account doesn't exist.
    pub async fn get_profile(&self, user_id: UserId) -> Result<UserAccount, AuthError> {
        self.accounts
            .get_user(user_id)
            .await?
            .ok_or(AuthError::IdentityNotFound)
    }

    /// Apply a customer's own profile changes.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::EmptyUpdate` if nothing would change, the
    /// validation errors of [`AuthService::register`], and
    /// `AuthError::AccountExists` if the new email or username is taken.
    #[instrument(skip(self, changes))]
    pub async fn update_profile(
        &self,
        user_id: UserId,
        changes: ProfileChanges,
    ) -> Result<UserAccount, AuthError> {
        let username = changes.username.as_deref().map(validate_username).transpose()?;
        let email = changes.email.as_deref().map(Email::parse).transpose()?;
        let password_hash = match changes.password.as_deref() {
            Some(password) => {
                validate_password(password)?;
                Some(hash_password(password)?)
            }
            None => None,
        };

        let update = ProfileUpdate {
            username,
            email,
            password_hash,
            profile: changes.profile,
        };
        if update.is_empty() {
            return Err(AuthError::EmptyUpdate);
        }

        self.accounts
            .update_user(user_id, &update)
            .await
            .map_err(|e| match e {
                RepositoryError::NotFound => AuthError::IdentityNotFound,
                other => on_conflict(other),
            })
    }

    async fn load_identity(&self, account: AccountRef) -> Result<Identity, AuthError> {
        match account {
            AccountRef::Customer(id) => {
                let user = self
                    .accounts
                    .get_user(id)
                    .await?
                    .ok_or(AuthError::IdentityNotFound)?;
                Ok(Identity::customer(user.id, user.username, user.email))
            }
            AccountRef::Admin(id) => {
                let admin = self
                    .accounts
                    .get_admin(id)
                    .await?
                    .ok_or(AuthError::IdentityNotFound)?;
                Ok(Identity::admin(admin.id, admin.username, admin.email, admin.role))
            }
        }
    }
}

fn on_conflict(e: RepositoryError) -> AuthError {
    match e {
        RepositoryError::Conflict(msg) => AuthError::AccountExists(msg),
        other => AuthError::Repository(other),
    }
}

/// Trim and check a username.
///
/// # Errors
///
/// Returns `AuthError::InvalidUsername` describing the first problem found.
pub fn validate_username(username: &str) -> Result<String, AuthError> {
    let username = username.trim();
    if username.is_empty() {
        return Err(AuthError::InvalidUsername("username is required".to_owned()));
    }
    if username.chars().count() > MAX_USERNAME_LENGTH {
        return Err(AuthError::InvalidUsername(format!(
            "username must be at most {MAX_USERNAME_LENGTH} characters"
        )));
    }
    if username.chars().any(char::is_whitespace) {
        return Err(AuthError::InvalidUsername(
            "username cannot contain whitespace".to_owned(),
        ));
    }
    Ok(username.to_owned())
}

/// Validate password meets requirements.
fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!(
            "password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }
    Ok(())
}

/// Hash a password using Argon2id.
///
/// # Errors
///
/// Returns `AuthError::PasswordHash` if hashing fails.
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::PasswordHash)
}

/// Verify a password against a hash.
fn verify_password(password: &str, hash: &str) -> Result<(), AuthError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| AuthError::InvalidCredentials)?;
    let argon2 = Argon2::default();

    argon2
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| AuthError::InvalidCredentials)
}

/// Check a password the way [`AuthService::register`] does.
///
/// # Errors
///
/// Returns `AuthError::WeakPassword` if it is too short.
pub fn check_password_strength(password: &str) -> Result<(), AuthError> {
    validate_password(password)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_then_verify() {
        let hash = hash_password("correct horse").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password("correct horse", &hash).is_ok());
        assert!(matches!(
            verify_password("wrong horse", &hash),
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[test]
    fn test_verify_garbage_hash_is_invalid_credentials() {
        assert!(matches!(
            verify_password("anything", "not-a-hash"),
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[test]
    fn test_password_length() {
        assert!(validate_password("1234567").is_err());
        assert!(validate_password("12345678").is_ok());
    }

    #[test]
    fn test_username_rules() {
        assert_eq!(validate_username("  jane ").unwrap(), "jane");
        assert!(validate_username("   ").is_err());
        assert!(validate_username("jane doe").is_err());
        assert!(validate_username(&"x".repeat(51)).is_err());
        assert!(validate_username(&"x".repeat(50)).is_ok());
    }

    #[test]
    fn test_registration_accepts_flat_profile_fields() {
        let input: Registration = serde_json::from_str(
            r#"{"username":"jane","email":"jane@example.com","password":"secret123","city":"Austin"}"#,
        )
        .unwrap();
        assert_eq!(input.profile.city.as_deref(), Some("Austin"));
        assert!(input.profile.first_name.is_none());
    }

    #[test]
    fn test_profile_changes_default_is_empty() {
        let changes: ProfileChanges = serde_json::from_str("{}").unwrap();
        assert!(changes.username.is_none());
        assert!(changes.password.is_none());
        assert!(changes.profile.is_empty());
    }
}
