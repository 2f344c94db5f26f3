//! Tenant provisioning and super-admin bootstrap.

use chrono::Utc;

use crm_core::{Account, AccountId, BillingPlan, NewUser, Role, TenantRecord, User, UserId};
use crm_store::{Sequence, Store, TenantRepository, UserDirectory};

use crate::error::ApiError;
use crate::password;

/// First administrator of a new tenant.
#[derive(Debug, Clone)]
pub struct FirstAdmin {
    /// Email address.
    pub email: String,
    /// Login name.
    pub username: String,
    /// Plain-text password, hashed before storage.
    pub password: String,
}

/// Create an account and its first `CompanyAdmin`.
///
/// New accounts start on a 14-day trial followed by a 7-day grace period.
/// A paid `plan` upgrades the account immediately.
///
/// # Errors
///
/// - 400 if the name, email, username or password is invalid
/// - 409 if the email or username is already registered
pub async fn provision_tenant(
    store: &dyn Store,
    name: &str,
    admin: FirstAdmin,
    plan: BillingPlan,
) -> Result<(Account, User), ApiError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ApiError::validation("company name must not be empty"));
    }
    password::check_strength(&admin.password)?;
    UserDirectory::new(store).ensure_unique(&admin.email, &admin.username, None)?;

    let password_hash = password::hash_async(admin.password).await?;

    let now = Utc::now();
    let account_id = AccountId::new(store.next_id(Sequence::Accounts)?);
    let mut account = Account::new_trial(account_id, name, now);
    if plan != BillingPlan::Trial {
        account.upgrade(plan, now)?;
    }

    let new_admin = NewUser {
        email: admin.email,
        username: admin.username,
        password_hash,
        role: Role::CompanyAdmin,
    };
    // Validate before the account row exists so a bad email leaves nothing behind.
    User::build(UserId::new(0), account_id, new_admin.clone(), now).validate()?;

    store.put_account(&account)?;
    let user = TenantRepository::<User>::new(store).create_at(new_admin, account_id, now)?;

    tracing::info!(
        account_id = %account.id,
        plan = %account.billing_plan,
        admin_id = %user.id,
        "Tenant provisioned"
    );

    Ok((account, user))
}

/// Create the platform super admin if no user with this email exists yet.
///
/// Returns the created user, or `None` if it already existed.
///
/// # Errors
///
/// Returns 400 for a weak password, 409 if the derived username is taken.
pub async fn bootstrap_super_admin(
    store: &dyn Store,
    email: &str,
    password: &str,
) -> Result<Option<User>, ApiError> {
    let directory = UserDirectory::new(store);
    if directory.find_by_login(email)?.is_some() {
        tracing::debug!(email, "Bootstrap super admin already exists");
        return Ok(None);
    }

    password::check_strength(password)?;
    let username = email.split('@').next().unwrap_or(email);
    let password_hash = password::hash_async(password.to_string()).await?;
    let user = directory.create_super_admin(email, username, &password_hash)?;

    Ok(Some(user))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crm_core::{AccountStatus, TenantScope};
    use crm_store::MemoryStore;

    fn admin(email: &str, username: &str) -> FirstAdmin {
        FirstAdmin {
            email: email.into(),
            username: username.into(),
            password: "long enough".into(),
        }
    }

    #[tokio::test]
    async fn provisions_trial_account_with_admin() {
        let store = MemoryStore::new();
        let (account, user) =
            provision_tenant(&store, "Acme", admin("jane@acme.test", "jane"), BillingPlan::Trial)
                .await
                .unwrap();

        assert_eq!(account.billing_plan, BillingPlan::Trial);
        assert_eq!(
            crm_core::resolve_status(&account, Utc::now()),
            AccountStatus::Trial
        );
        assert_eq!(user.role, Role::CompanyAdmin);
        assert_eq!(user.account_id, Some(account.id));
        assert_ne!(user.password_hash, "long enough");

        let users = TenantRepository::<User>::new(&store)
            .list(TenantScope::Account(account.id))
            .unwrap();
        assert_eq!(users.len(), 1);
    }

    #[tokio::test]
    async fn duplicate_admin_email_creates_nothing() {
        let store = MemoryStore::new();
        provision_tenant(&store, "Acme", admin("jane@acme.test", "jane"), BillingPlan::Trial)
            .await
            .unwrap();

        let result =
            provision_tenant(&store, "Other", admin("JANE@acme.test", "jane2"), BillingPlan::Trial)
                .await;
        assert!(matches!(result, Err(ApiError::Conflict(_))));
        assert_eq!(store.list_accounts().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn bad_email_creates_nothing() {
        let store = MemoryStore::new();
        let result =
            provision_tenant(&store, "Acme", admin("not-an-email", "jane"), BillingPlan::Pro).await;
        assert!(matches!(result, Err(ApiError::BadRequest { .. })));
        assert!(store.list_accounts().unwrap().is_empty());
    }

    #[tokio::test]
    async fn bootstrap_is_idempotent() {
        let store = MemoryStore::new();
        let created = bootstrap_super_admin(&store, "root@crm.test", "long enough")
            .await
            .unwrap();
        assert_eq!(created.map(|user| user.role), Some(Role::SuperAdmin));

        let again = bootstrap_super_admin(&store, "root@crm.test", "long enough")
            .await
            .unwrap();
        assert!(again.is_none());
    }
}
