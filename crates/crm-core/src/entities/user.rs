use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{merge, require_non_empty, Table, TenantRecord};
use crate::error::{CrmError, Result};
use crate::{AccountId, Principal, Role, UserId};

/// A login-capable user.
///
/// Tenant users always have an `account_id`; platform super admins have none.
/// The password hash is stored but never exposed; use [`UserProfile`] for output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// User id.
    pub id: UserId,
    /// Owning account, fixed at creation.
    pub account_id: Option<AccountId>,
    /// Email address (unique platform-wide).
    pub email: String,
    /// Login name (unique platform-wide).
    pub username: String,
    /// Opaque password hash.
    pub password_hash: String,
    /// Role.
    pub role: Role,
    /// Disabled users cannot log in.
    pub is_active: bool,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last update time.
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Create a platform super admin (not bound to any tenant).
    #[must_use]
    pub fn super_admin(
        id: UserId,
        email: impl Into<String>,
        username: impl Into<String>,
        password_hash: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            account_id: None,
            email: email.into(),
            username: username.into(),
            password_hash: password_hash.into(),
            role: Role::SuperAdmin,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    /// The identity this user authenticates as.
    #[must_use]
    pub fn principal(&self) -> Principal {
        Principal {
            id: self.id,
            email: self.email.clone(),
            username: self.username.clone(),
            role: self.role,
            account_id: self.account_id,
        }
    }

    /// Public view without the password hash.
    #[must_use]
    pub fn profile(&self) -> UserProfile {
        UserProfile {
            id: self.id,
            account_id: self.account_id,
            email: self.email.clone(),
            username: self.username.clone(),
            role: self.role,
            is_active: self.is_active,
            created_at: self.created_at,
        }
    }

    /// Whether `login` matches the email (case-insensitively) or the username.
    #[must_use]
    pub fn matches_login(&self, login: &str) -> bool {
        self.email.eq_ignore_ascii_case(login) || self.username == login
    }
}

/// User data safe to return to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    /// User id.
    pub id: UserId,
    /// Owning account.
    pub account_id: Option<AccountId>,
    /// Email address.
    pub email: String,
    /// Login name.
    pub username: String,
    /// Role.
    pub role: Role,
    /// Whether the user may log in.
    pub is_active: bool,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

/// Create payload for a tenant user, with the password already hashed.
#[derive(Debug, Clone)]
pub struct NewUser {
    /// Email address.
    pub email: String,
    /// Login name.
    pub username: String,
    /// Opaque password hash.
    pub password_hash: String,
    /// Role (`CompanyAdmin` or `User`).
    pub role: Role,
}

/// Partial update for a tenant user.
#[derive(Debug, Clone, Default)]
pub struct UserUpdate {
    /// New email.
    pub email: Option<String>,
    /// New login name.
    pub username: Option<String>,
    /// New password hash.
    pub password_hash: Option<String>,
    /// New role.
    pub role: Option<Role>,
    /// Enable or disable login.
    pub is_active: Option<bool>,
}

impl TenantRecord for User {
    type Id = UserId;
    type Create = NewUser;
    type Patch = UserUpdate;

    const TABLE: Table = Table::Users;
    const ENTITY: &'static str = "user";

    fn id(&self) -> UserId {
        self.id
    }

    fn build(id: UserId, account_id: AccountId, input: NewUser, now: DateTime<Utc>) -> Self {
        Self {
            id,
            account_id: Some(account_id),
            email: input.email,
            username: input.username,
            password_hash: input.password_hash,
            role: input.role,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    fn apply(&mut self, patch: UserUpdate, now: DateTime<Utc>) {
        merge(&mut self.email, patch.email);
        merge(&mut self.username, patch.username);
        merge(&mut self.password_hash, patch.password_hash);
        merge(&mut self.role, patch.role);
        merge(&mut self.is_active, patch.is_active);
        self.updated_at = now;
    }

    fn validate(&self) -> Result<()> {
        require_non_empty("username", &self.username)?;
        require_non_empty("password", &self.password_hash)?;
        if !self.email.contains('@') {
            return Err(CrmError::Validation("email is not valid".into()));
        }
        if self.username.contains('@') {
            return Err(CrmError::Validation("username must not contain '@'".into()));
        }
        match (self.role, self.account_id) {
            (Role::SuperAdmin, Some(_)) => Err(CrmError::Validation(
                "tenant users cannot be super admins".into(),
            )),
            (Role::CompanyAdmin | Role::User, None) => Err(CrmError::Validation(
                "tenant users must belong to an account".into(),
            )),
            _ => Ok(()),
        }
    }
}
