//! Account domain types.
//!
//! Customers (`UserAccount`) and staff (`AdminUser`) live in separate tables
//! and authenticate through the same login endpoint.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use tech_store_core::{AdminRole, AdminUserId, Email, UserId};

/// Optional contact and shipping details on a customer account.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileFields {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip_code: Option<String>,
    pub phone_number: Option<String>,
}

impl ProfileFields {
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.first_name.is_none()
            && self.last_name.is_none()
            && self.address.is_none()
            && self.city.is_none()
            && self.state.is_none()
            && self.zip_code.is_none()
            && self.phone_number.is_none()
    }
}

/// A customer account (domain type). Never carries the password hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserAccount {
    pub id: UserId,
    pub username: String,
    pub email: Email,
    #[serde(flatten)]
    pub profile: ProfileFields,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A staff account (domain type).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AdminUser {
    pub id: AdminUserId,
    pub username: String,
    pub email: Email,
    pub role: AdminRole,
    pub created_at: DateTime<Utc>,
}

/// Input for inserting a customer account.
#[derive(Debug, Clone)]
pub struct NewUserAccount {
    pub username: String,
    pub email: Email,
    pub password_hash: String,
    pub profile: ProfileFields,
}

/// Partial customer update. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub username: Option<String>,
    pub email: Option<Email>,
    pub password_hash: Option<String>,
    pub profile: ProfileFields,
}

impl ProfileUpdate {
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.username.is_none()
            && self.email.is_none()
            && self.password_hash.is_none()
            && self.profile.is_empty()
    }
}
