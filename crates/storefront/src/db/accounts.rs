//! Account repository for customers and staff.
//!
//! Password hashes never leave this module except through
//! [`StoredCredentials`], which only the auth service consumes.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use tech_store_core::{AdminRole, AdminUserId, Email, UserId};

use super::{RepositoryError, unique_constraint};
use crate::models::{AdminUser, NewUserAccount, ProfileFields, ProfileUpdate, UserAccount};

// =============================================================================
// Internal Row Types
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct UserAccountRow {
    id: i32,
    username: String,
    email: String,
    first_name: Option<String>,
    last_name: Option<String>,
    address: Option<String>,
    city: Option<String>,
    state: Option<String>,
    zip_code: Option<String>,
    phone_number: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<UserAccountRow> for UserAccount {
    type Error = RepositoryError;

    fn try_from(row: UserAccountRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: UserId::new(row.id),
            username: row.username,
            email: parse_stored_email(&row.email)?,
            profile: ProfileFields {
                first_name: row.first_name,
                last_name: row.last_name,
                address: row.address,
                city: row.city,
                state: row.state,
                zip_code: row.zip_code,
                phone_number: row.phone_number,
            },
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct AdminUserRow {
    id: i32,
    username: String,
    email: String,
    role: AdminRole,
    created_at: DateTime<Utc>,
}

impl TryFrom<AdminUserRow> for AdminUser {
    type Error = RepositoryError;

    fn try_from(row: AdminUserRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: AdminUserId::new(row.id),
            username: row.username,
            email: parse_stored_email(&row.email)?,
            role: row.role,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct PasswordRow {
    id: i32,
    password_hash: String,
}

fn parse_stored_email(raw: &str) -> Result<Email, RepositoryError> {
    Email::parse(raw)
        .map_err(|e| RepositoryError::DataCorruption(format!("invalid email in database: {e}")))
}

/// Map a unique violation on an account table to a readable conflict.
fn on_account_conflict(e: sqlx::Error) -> RepositoryError {
    match unique_constraint(&e) {
        Some(constraint) if constraint.contains("email") => {
            RepositoryError::Conflict("email already registered".to_owned())
        }
        Some(constraint) if constraint.contains("username") => {
            RepositoryError::Conflict("username already taken".to_owned())
        }
        Some(_) => RepositoryError::Conflict("account already exists".to_owned()),
        None => RepositoryError::Database(e),
    }
}

/// Credentials found for a login email.
#[derive(Debug)]
pub enum StoredCredentials {
    Customer {
        id: UserId,
        password_hash: String,
    },
    Admin {
        id: AdminUserId,
        password_hash: String,
    },
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for customer and admin account operations.
pub struct AccountRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> AccountRepository<'a> {
    /// Create a new account repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Insert a customer account.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the email or username is taken.
    pub async fn create_user(&self, input: &NewUserAccount) -> Result<UserAccount, RepositoryError> {
        let row = sqlx::query_as::<_, UserAccountRow>(
            r"
            INSERT INTO store.user_account
                (username, email, password_hash, first_name, last_name,
                 address, city, state, zip_code, phone_number)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING id, username, email, first_name, last_name, address, city,
                      state, zip_code, phone_number, created_at, updated_at
            ",
        )
        .bind(&input.username)
        .bind(&input.email)
        .bind(&input.password_hash)
        .bind(&input.profile.first_name)
        .bind(&input.profile.last_name)
        .bind(&input.profile.address)
        .bind(&input.profile.city)
        .bind(&input.profile.state)
        .bind(&input.profile.zip_code)
        .bind(&input.profile.phone_number)
        .fetch_one(self.pool)
        .await
        .map_err(on_account_conflict)?;

        row.try_into()
    }

    /// Get a customer account by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_user(&self, id: UserId) -> Result<Option<UserAccount>, RepositoryError> {
        let row = sqlx::query_as::<_, UserAccountRow>(
            r"
            SELECT id, username, email, first_name, last_name, address, city,
                   state, zip_code, phone_number, created_at, updated_at
            FROM store.user_account
            WHERE id = $1
            ",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    /// Get an admin account by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_admin(&self, id: AdminUserId) -> Result<Option<AdminUser>, RepositoryError> {
        let row = sqlx::query_as::<_, AdminUserRow>(
            r"
            SELECT id, username, email, role, created_at
            FROM store.admin_user
            WHERE id = $1
            ",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    /// Look up login credentials by email, customers first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn find_credentials(
        &self,
        email: &Email,
    ) -> Result<Option<StoredCredentials>, RepositoryError> {
        let customer = sqlx::query_as::<_, PasswordRow>(
            "SELECT id, password_hash FROM store.user_account WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(self.pool)
        .await?;

        if let Some(row) = customer {
            return Ok(Some(StoredCredentials::Customer {
                id: UserId::new(row.id),
                password_hash: row.password_hash,
            }));
        }

        let admin = sqlx::query_as::<_, PasswordRow>(
            "SELECT id, password_hash FROM store.admin_user WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(self.pool)
        .await?;

        Ok(admin.map(|row| StoredCredentials::Admin {
            id: AdminUserId::new(row.id),
            password_hash: row.password_hash,
        }))
    }

    /// Apply a partial update to a customer account.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the account doesn't exist.
    /// Returns `RepositoryError::Conflict` if the new email or username is taken.
    pub async fn update_user(
        &self,
        id: UserId,
        update: &ProfileUpdate,
    ) -> Result<UserAccount, RepositoryError> {
        let row = sqlx::query_as::<_, UserAccountRow>(
            r"
            UPDATE store.user_account
            SET
                username = COALESCE($2, username),
                email = COALESCE($3, email),
                password_hash = COALESCE($4, password_hash),
                first_name = COALESCE($5, first_name),
                last_name = COALESCE($6, last_name),
                address = COALESCE($7, address),
                city = COALESCE($8, city),
                state = COALESCE($9, state),
                zip_code = COALESCE($10, zip_code),
                phone_number = COALESCE($11, phone_number),
                updated_at = NOW()
            WHERE id = $1
            RETURNING id, username, email, first_name, last_name, address, city,
                      state, zip_code, phone_number, created_at, updated_at
            ",
        )
        .bind(id)
        .bind(&update.username)
        .bind(&update.email)
        .bind(&update.password_hash)
        .bind(&update.profile.first_name)
        .bind(&update.profile.last_name)
        .bind(&update.profile.address)
        .bind(&update.profile.city)
        .bind(&update.profile.state)
        .bind(&update.profile.zip_code)
        .bind(&update.profile.phone_number)
        .fetch_optional(self.pool)
        .await
        .map_err(on_account_conflict)?
        .ok_or(RepositoryError::NotFound)?;

        row.try_into()
    }

    /// Insert a staff account.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the email or username is taken.
    pub async fn create_admin(
        &self,
        username: &str,
        email: &Email,
        password_hash: &str,
        role: AdminRole,
    ) -> Result<AdminUser, RepositoryError> {
        let row = sqlx::query_as::<_, AdminUserRow>(
            r"
            INSERT INTO store.admin_user (username, email, password_hash, role)
            VALUES ($1, $2, $3, $4)
            RETURNING id, username, email, role, created_at
            ",
        )
        .bind(username)
        .bind(email)
        .bind(password_hash)
        .bind(role)
        .fetch_one(self.pool)
        .await
        .map_err(on_account_conflict)?;

        row.try_into()
    }
}
