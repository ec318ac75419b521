//! Staff account management.
//!
//! There is no HTTP route for creating staff, so the first `SuperAdmin`
//! has to come from here.
//!
//! # Usage
//!
//! ```bash
//! ts-cli admin create -u alice -e alice@example.com -p 'a long password' -r SuperAdmin
//! ```

use thiserror::Error;

use tech_store_core::{AdminRole, Email, EmailError};
use tech_store_storefront::db::{self, AccountRepository, RepositoryError};
use tech_store_storefront::services::auth::{
    AuthError, check_password_strength, hash_password, validate_username,
};

/// Errors that can occur during admin operations.
#[derive(Debug, Error)]
pub enum AdminError {
    /// Required environment variable is missing.
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    /// Database connection error.
    #[error("Database connection error: {0}")]
    Database(#[from] sqlx::Error),

    /// Invalid role.
    #[error("Invalid role: {0}. Valid roles: SuperAdmin, Editor")]
    InvalidRole(String),

    /// Invalid email.
    #[error("Invalid email: {0}")]
    InvalidEmail(#[from] EmailError),

    /// Username or password rejected.
    #[error("{0}")]
    Rejected(#[from] AuthError),

    /// An account with this email or username already exists.
    #[error("Account already exists: {0}")]
    UserExists(String),

    #[error("Repository error: {0}")]
    Repository(RepositoryError),
}

impl From<RepositoryError> for AdminError {
    fn from(e: RepositoryError) -> Self {
        match e {
            RepositoryError::Conflict(msg) => Self::UserExists(msg),
            other => Self::Repository(other),
        }
    }
}

/// Create a new staff account.
///
/// # Returns
///
/// The ID of the created account.
///
/// # Errors
///
/// Returns an error if any argument is invalid, the account already exists,
/// or the database is unreachable.
pub async fn create_user(
    username: &str,
    email: &str,
    password: &str,
    role: &str,
) -> Result<i32, AdminError> {
    let role: AdminRole = role
        .parse()
        .map_err(|_| AdminError::InvalidRole(role.to_owned()))?;
    let username = validate_username(username)?;
    let email = Email::parse(email)?;
    check_password_strength(password)?;

    let database_url =
        super::database_url().ok_or(AdminError::MissingEnvVar("STORE_DATABASE_URL"))?;

    tracing::info!("Connecting to database...");
    let pool = db::create_pool(&database_url).await?;

    tracing::info!("Creating staff account: {} <{}> ({})", username, email, role);

    let password_hash = hash_password(password)?;
    let admin = AccountRepository::new(&pool)
        .create_admin(&username, &email, &password_hash, role)
        .await?;

    tracing::info!(
        "Staff account created! ID: {}, Username: {}, Role: {}",
        admin.id,
        admin.username,
        admin.role
    );

    Ok(admin.id.as_i32())
}
