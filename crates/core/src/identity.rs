//! Authenticated caller identity and role checks.

use serde::{Deserialize, Serialize};

use crate::types::{AdminRole, AdminUserId, Email, Role, UserId};

/// The account a token resolved to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum AccountRef {
    Customer(UserId),
    Admin(AdminUserId),
}

/// A resolved, authenticated caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub account: AccountRef,
    pub username: String,
    pub email: Email,
    pub role: Role,
}

impl Identity {
    #[must_use]
    pub const fn customer(id: UserId, username: String, email: Email) -> Self {
        Self {
            account: AccountRef::Customer(id),
            username,
            email,
            role: Role::User,
        }
    }

    #[must_use]
    pub fn admin(id: AdminUserId, username: String, email: Email, role: AdminRole) -> Self {
        Self {
            account: AccountRef::Admin(id),
            username,
            email,
            role: role.into(),
        }
    }

    /// The customer id, if this caller is a customer.
    #[must_use]
    pub const fn customer_id(&self) -> Option<UserId> {
        match self.account {
            AccountRef::Customer(id) => Some(id),
            AccountRef::Admin(_) => None,
        }
    }

    /// Numeric id of the underlying account, whichever kind it is.
    #[must_use]
    pub const fn account_id(&self) -> i32 {
        match self.account {
            AccountRef::Customer(id) => id.as_i32(),
            AccountRef::Admin(id) => id.as_i32(),
        }
    }
}

/// The caller's role is not in the required set.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("role {actual} is not permitted here")]
pub struct Forbidden {
    pub actual: Role,
}

/// Check that `identity` holds one of `required`.
///
/// An empty `required` set admits any authenticated caller.
///
/// # Errors
///
/// Returns [`Forbidden`] when the caller's role is not listed.
pub fn authorize(identity: &Identity, required: &[Role]) -> Result<(), Forbidden> {
    if required.is_empty() || required.contains(&identity.role) {
        Ok(())
    } else {
        Err(Forbidden {
            actual: identity.role,
        })
    }
}
