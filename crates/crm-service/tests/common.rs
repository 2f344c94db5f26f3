//! Common test utilities for CRM integration tests.

#![allow(dead_code)] // Some utilities are used by different test files

use std::sync::Arc;

use axum::http::{header, HeaderName, HeaderValue};
use axum::Router;
use axum_test::{TestRequest, TestServer};
use chrono::{Duration, Utc};

use crm_core::{
    Account, AccountId, BillingPlan, Company, Contact, NewCompany, NewContact, NewUser,
    PlanCatalog, Role, User,
};
use crm_service::context::ACCOUNT_OVERRIDE_HEADER;
use crm_service::{create_router, AppState, ServiceConfig};
use crm_store::{MemoryStore, Sequence, Store, TenantRepository, UserDirectory};

/// Placeholder stored for seeded users; it never verifies.
const SEEDED_HASH: &str = "$argon2id$seeded";

/// Test harness containing everything needed for integration tests.
pub struct TestHarness {
    /// The test server for making HTTP requests.
    pub server: TestServer,
    /// The store behind the server, for seeding and inspection.
    pub store: Arc<MemoryStore>,
    /// A copy of the server's state, used to mint tokens.
    pub state: AppState,
}

impl TestHarness {
    /// Create a new test harness with an empty store and the standard catalog.
    pub fn new() -> Self {
        let store = Arc::new(MemoryStore::new());
        let config = ServiceConfig {
            listen_addr: "127.0.0.1:0".into(),
            jwt_secret: "test-secret".into(),
            jwt_issuer: "crm-test".into(),
            ..ServiceConfig::default()
        };

        let state = AppState::new(
            Arc::clone(&store) as Arc<dyn Store>,
            config,
            PlanCatalog::standard(),
        );
        let router: Router = create_router(state.clone());
        let server = TestServer::new(router).expect("Failed to create test server");

        Self {
            server,
            store,
            state,
        }
    }

    /// Insert an account on `plan`, in its trial window if `plan` is TRIAL.
    pub fn seed_account(&self, name: &str, plan: BillingPlan) -> Account {
        let now = Utc::now();
        let id = AccountId::new(self.store.next_id(Sequence::Accounts).unwrap());
        let mut account = Account::new_trial(id, name, now);
        if plan != BillingPlan::Trial {
            account.upgrade(plan, now).unwrap();
        }
        self.store.put_account(&account).unwrap();
        account
    }

    /// Insert a TRIAL account whose trial ended `days_ago` days ago.
    pub fn seed_expired_trial(&self, name: &str, days_ago: i64) -> Account {
        let mut account = self.seed_account(name, BillingPlan::Trial);
        let now = Utc::now();
        account.trial_ends_at = Some(now - Duration::days(days_ago));
        account.grace_ends_at = Some(now - Duration::days(days_ago) + Duration::days(7));
        self.store.put_account(&account).unwrap();
        account
    }

    /// Overwrite an account.
    pub fn save_account(&self, account: &Account) {
        self.store.put_account(account).unwrap();
    }

    /// Reload an account.
    pub fn account(&self, id: AccountId) -> Account {
        self.store.get_account(id).unwrap().unwrap()
    }

    /// Insert a tenant user. Seeded users cannot log in with a password.
    pub fn seed_user(&self, account: AccountId, username: &str, role: Role) -> User {
        TenantRepository::<User>::new(self.store.as_ref())
            .create(
                NewUser {
                    email: format!("{username}@example.test"),
                    username: username.into(),
                    password_hash: SEEDED_HASH.into(),
                    role,
                },
                account,
            )
            .unwrap()
    }

    /// Insert a platform super admin.
    pub fn seed_super_admin(&self) -> User {
        UserDirectory::new(self.store.as_ref())
            .create_super_admin("root@platform.test", "root", SEEDED_HASH)
            .unwrap()
    }

    /// Insert a company directly.
    pub fn seed_company(&self, account: AccountId, name: &str) -> Company {
        TenantRepository::<Company>::new(self.store.as_ref())
            .create(
                NewCompany {
                    name: name.into(),
                    ..NewCompany::default()
                },
                account,
            )
            .unwrap()
    }

    /// Insert a contact directly.
    pub fn seed_contact(&self, account: AccountId, first_name: &str, last_name: &str) -> Contact {
        TenantRepository::<Contact>::new(self.store.as_ref())
            .create(
                NewContact {
                    first_name: first_name.into(),
                    last_name: last_name.into(),
                    email: Some(format!("{}@customer.test", first_name.to_lowercase())),
                    ..NewContact::default()
                },
                account,
            )
            .unwrap()
    }

    /// `Authorization` header for `user`, signed like a real login.
    pub fn auth(&self, user: &User) -> (HeaderName, HeaderValue) {
        let token = self.state.tokens.issue(user).unwrap().token;
        bearer(&token)
    }

    /// A tenant admin on a fresh account, with their auth header.
    pub fn tenant_admin(
        &self,
        name: &str,
        plan: BillingPlan,
    ) -> (Account, User, (HeaderName, HeaderValue)) {
        let account = self.seed_account(name, plan);
        let username = format!("{}-admin", name.to_lowercase());
        let admin = self.seed_user(account.id, &username, Role::CompanyAdmin);
        let auth = self.auth(&admin);
        (account, admin, auth)
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

/// `Authorization: Bearer <token>`.
pub fn bearer(token: &str) -> (HeaderName, HeaderValue) {
    (
        header::AUTHORIZATION,
        HeaderValue::from_str(&format!("Bearer {token}")).unwrap(),
    )
}

/// `x-account-id: <account>`.
pub fn account_override(account: AccountId) -> (HeaderName, HeaderValue) {
    (
        HeaderName::from_static(ACCOUNT_OVERRIDE_HEADER),
        HeaderValue::from_str(&account.to_string()).unwrap(),
    )
}

/// Attach a prepared header to a request.
pub trait Attach {
    /// Add `header` to the request.
    fn attach(self, header: &(HeaderName, HeaderValue)) -> Self;
}

impl Attach for TestRequest {
    fn attach(self, (name, value): &(HeaderName, HeaderValue)) -> Self {
        self.add_header(name.clone(), value.clone())
    }
}
