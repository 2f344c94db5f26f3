//! Tenant context loading.
//!
//! Every tenant-scoped route takes a [`TenantContext`]. Extracting it resolves
//! the effective tenant from the principal and the `x-account-id` header,
//! then loads and checks the account before any repository access happens.

use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use chrono::{DateTime, Utc};

use crm_core::{resolve_tenant, AccountContext, AccountId, CrmError, Principal, Result};
use crm_store::Store;

use crate::auth::AuthPrincipal;
use crate::error::ApiError;
use crate::state::AppState;

/// Header a super admin uses to select the tenant to act in.
pub const ACCOUNT_OVERRIDE_HEADER: &str = "x-account-id";

/// Loads the account in force for a request.
pub struct AccountContextLoader<'a> {
    store: &'a dyn Store,
}

impl<'a> AccountContextLoader<'a> {
    /// Wrap a store.
    #[must_use]
    pub fn new(store: &'a dyn Store) -> Self {
        Self { store }
    }

    /// Load and validate the account `account_id` for `principal`.
    ///
    /// # Errors
    ///
    /// - `AccountRequired` if no tenant is selected
    /// - `AccountNotFound` if the account does not exist
    /// - `AccountInactive` if the account is disabled
    pub fn load(
        &self,
        principal: Principal,
        account_id: Option<AccountId>,
        now: DateTime<Utc>,
    ) -> Result<AccountContext> {
        let account_id = account_id.ok_or(CrmError::AccountRequired)?;
        let account = self
            .store
            .get_account(account_id)?
            .ok_or(CrmError::AccountNotFound)?;
        if !account.is_active {
            return Err(CrmError::AccountInactive);
        }
        Ok(AccountContext::new(principal, account, now))
    }
}

/// The loaded account context of a tenant-scoped request.
#[derive(Debug, Clone)]
pub struct TenantContext(pub AccountContext);

#[async_trait]
impl FromRequestParts<Arc<AppState>> for TenantContext {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> std::result::Result<Self, Self::Rejection> {
        let AuthPrincipal(principal) = AuthPrincipal::from_request_parts(parts, state).await?;

        let override_value = parts
            .headers
            .get(ACCOUNT_OVERRIDE_HEADER)
            .and_then(|v| v.to_str().ok());
        let account_id = resolve_tenant(Some(&principal), override_value)?;

        let ctx = AccountContextLoader::new(state.store.as_ref()).load(
            principal,
            account_id,
            Utc::now(),
        )?;

        tracing::debug!(
            user_id = %ctx.principal.id,
            role = %ctx.principal.role,
            account_id = %ctx.account_id(),
            status = ?ctx.status,
            "Tenant context loaded"
        );

        Ok(Self(ctx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crm_core::{Account, AccountStatus, Role, UserId};
    use crm_store::MemoryStore;

    fn admin_of(account: AccountId) -> Principal {
        Principal {
            id: UserId::new(1),
            email: "admin@acme.test".into(),
            username: "admin".into(),
            role: Role::CompanyAdmin,
            account_id: Some(account),
        }
    }

    #[test]
    fn loads_usable_account_with_status() {
        let store = MemoryStore::new();
        let now = Utc::now();
        let account = Account::new_trial(AccountId::new(7), "Acme", now);
        store.put_account(&account).unwrap();

        let ctx = AccountContextLoader::new(&store)
            .load(admin_of(account.id), Some(account.id), now)
            .unwrap();
        assert_eq!(ctx.account_id(), account.id);
        assert_eq!(ctx.status, AccountStatus::Trial);
    }

    #[test]
    fn missing_selection_account_or_activity_fail() {
        let store = MemoryStore::new();
        let now = Utc::now();
        let loader = AccountContextLoader::new(&store);
        let id = AccountId::new(7);

        assert!(matches!(
            loader.load(admin_of(id), None, now),
            Err(CrmError::AccountRequired)
        ));
        assert!(matches!(
            loader.load(admin_of(id), Some(id), now),
            Err(CrmError::AccountNotFound)
        ));

        let mut account = Account::new_trial(id, "Acme", now);
        account.is_active = false;
        store.put_account(&account).unwrap();
        assert!(matches!(
            loader.load(admin_of(id), Some(id), now),
            Err(CrmError::AccountInactive)
        ));
    }
}
