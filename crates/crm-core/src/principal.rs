//! Principals and tenant resolution.
//!
//! A principal is the verified identity behind a request. Resolution decides
//! which account a request operates on:
//!
//! - `SuperAdmin`: the account named by the per-request override, or none at
//!   all (the cross-tenant overview).
//! - Everyone else: their own account. Any override is ignored.

use serde::{Deserialize, Serialize};

use crate::error::{CrmError, Result};
use crate::{AccountId, UserId};

/// Role of a principal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    /// Platform operator; not bound to any tenant.
    SuperAdmin,

    /// Administrator of one tenant.
    CompanyAdmin,

    /// Regular member of one tenant.
    User,
}

impl Role {
    /// Wire name of the role.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SuperAdmin => "SUPER_ADMIN",
            Self::CompanyAdmin => "COMPANY_ADMIN",
            Self::User => "USER",
        }
    }

    /// Whether the role administers a tenant (its users and billing).
    #[must_use]
    pub const fn is_tenant_admin(self) -> bool {
        matches!(self, Self::SuperAdmin | Self::CompanyAdmin)
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An authenticated identity, as carried by a verified token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    /// User id.
    pub id: UserId,
    /// Email address.
    pub email: String,
    /// Login name.
    pub username: String,
    /// Role.
    pub role: Role,
    /// Owning account; `None` only for `SuperAdmin`.
    pub account_id: Option<AccountId>,
}

impl Principal {
    /// Obtain the proof needed for unscoped access, if this is a super admin.
    #[must_use]
    pub fn super_admin_grant(&self) -> Option<SuperAdminGrant> {
        (self.role == Role::SuperAdmin).then_some(SuperAdminGrant { _private: () })
    }

    /// Fail with `Forbidden` unless the principal has one of `roles`.
    ///
    /// # Errors
    ///
    /// Returns `CrmError::Forbidden` carrying the caller's role.
    pub fn require_role(&self, roles: &[Role]) -> Result<()> {
        if roles.contains(&self.role) {
            Ok(())
        } else {
            Err(CrmError::Forbidden { role: self.role })
        }
    }
}

/// Proof that the caller is a super admin.
///
/// It can only be obtained through [`Principal::super_admin_grant`], which
/// makes [`TenantScope::AllTenants`] unreachable for any other role.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SuperAdminGrant {
    _private: (),
}

/// Which rows a repository call may see.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TenantScope {
    /// Exactly one tenant.
    Account(AccountId),

    /// Every tenant (super-admin overview only).
    AllTenants(SuperAdminGrant),
}

impl TenantScope {
    /// The scoped account, or `None` for the unscoped view.
    #[must_use]
    pub const fn account_id(&self) -> Option<AccountId> {
        match self {
            Self::Account(id) => Some(*id),
            Self::AllTenants(_) => None,
        }
    }
}

impl From<AccountId> for TenantScope {
    fn from(id: AccountId) -> Self {
        Self::Account(id)
    }
}

/// Resolve the effective account of a request.
///
/// `account_override` is the raw tenant-override value (the `x-account-id`
/// header). It is honoured only for super admins, and only when it parses as
/// an integer; otherwise a super admin resolves to `None`, which is a valid
/// "no tenant selected" state.
///
/// # Errors
///
/// Returns `CrmError::Unauthorized` when there is no principal, or when a
/// tenant-bound principal carries no account.
pub fn resolve_tenant(
    principal: Option<&Principal>,
    account_override: Option<&str>,
) -> Result<Option<AccountId>> {
    let principal = principal.ok_or(CrmError::Unauthorized)?;

    match principal.role {
        Role::SuperAdmin => Ok(account_override.and_then(|raw| raw.parse::<AccountId>().ok())),
        Role::CompanyAdmin | Role::User => principal
            .account_id
            .map(Some)
            .ok_or(CrmError::Unauthorized),
    }
}
