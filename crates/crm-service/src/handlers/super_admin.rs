//! Platform administration. Every handler requires a [`SuperAdmin`].

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crm_core::{
    resolve_status, Account, AccountId, AccountStatus, BillingPlan, Company, Contact, CrmError,
    Deal, Table, Task, TenantRecord, TenantScope, User, UserProfile,
};
use crm_store::{Store, TenantRepository};

use crate::auth::SuperAdmin;
use crate::error::{ApiError, ApiJson};
use crate::lifecycle::LifecycleReport;
use crate::state::AppState;
use crate::tenancy::{provision_tenant, FirstAdmin};

/// A tenant with its status and row counts.
#[derive(Debug, Serialize)]
pub struct CompanySummary {
    /// The account.
    #[serde(flatten)]
    pub account: Account,
    /// Derived status.
    pub status: AccountStatus,
    /// Users.
    pub user_count: u64,
    /// Companies.
    pub company_count: u64,
    /// Contacts.
    pub contact_count: u64,
    /// Deals.
    pub deal_count: u64,
    /// Tasks.
    pub task_count: u64,
}

struct Counts {
    users: HashMap<AccountId, u64>,
    companies: HashMap<AccountId, u64>,
    contacts: HashMap<AccountId, u64>,
    deals: HashMap<AccountId, u64>,
    tasks: HashMap<AccountId, u64>,
}

impl Counts {
    fn load(store: &dyn Store) -> Result<Self, ApiError> {
        Ok(Self {
            users: TenantRepository::<User>::new(store).count_by_account()?,
            companies: TenantRepository::<Company>::new(store).count_by_account()?,
            contacts: TenantRepository::<Contact>::new(store).count_by_account()?,
            deals: TenantRepository::<Deal>::new(store).count_by_account()?,
            tasks: TenantRepository::<Task>::new(store).count_by_account()?,
        })
    }

    fn summarize(&self, account: Account) -> CompanySummary {
        let id = account.id;
        let of = |counts: &HashMap<AccountId, u64>| counts.get(&id).copied().unwrap_or(0);
        CompanySummary {
            status: resolve_status(&account, Utc::now()),
            user_count: of(&self.users),
            company_count: of(&self.companies),
            contact_count: of(&self.contacts),
            deal_count: of(&self.deals),
            task_count: of(&self.tasks),
            account,
        }
    }
}

fn load_account(store: &dyn Store, id: i64) -> Result<Account, ApiError> {
    Ok(store
        .get_account(AccountId::new(id))?
        .ok_or(CrmError::AccountNotFound)?)
}

/// `GET /super-admin/companies`: every tenant.
pub async fn list_companies(
    State(state): State<Arc<AppState>>,
    _admin: SuperAdmin,
) -> Result<Json<Vec<CompanySummary>>, ApiError> {
    let store = state.store.as_ref();
    let counts = Counts::load(store)?;
    let summaries = store
        .list_accounts()?
        .into_iter()
        .map(|account| counts.summarize(account))
        .collect();
    Ok(Json(summaries))
}

/// `GET /super-admin/companies/:id`.
pub async fn get_company(
    State(state): State<Arc<AppState>>,
    _admin: SuperAdmin,
    Path(id): Path<i64>,
) -> Result<Json<CompanySummary>, ApiError> {
    let store = state.store.as_ref();
    let account = load_account(store, id)?;
    Ok(Json(Counts::load(store)?.summarize(account)))
}

/// Create tenant request.
#[derive(Debug, Deserialize)]
pub struct CreateCompanyRequest {
    /// Tenant name.
    pub name: String,
    /// Email of the first administrator.
    pub admin_email: String,
    /// Username of the first administrator.
    pub admin_username: String,
    /// Password of the first administrator.
    pub admin_password: String,
    /// Initial plan; `TRIAL` if omitted.
    #[serde(default = "default_plan")]
    pub billing_plan: BillingPlan,
}

fn default_plan() -> BillingPlan {
    BillingPlan::Trial
}

/// Create tenant response.
#[derive(Debug, Serialize)]
pub struct CreateCompanyResponse {
    /// The new account.
    pub account: Account,
    /// Its first administrator.
    pub admin: UserProfile,
}

/// `POST /super-admin/companies`: provision a tenant and its first admin.
pub async fn create_company(
    State(state): State<Arc<AppState>>,
    admin: SuperAdmin,
    ApiJson(body): ApiJson<CreateCompanyRequest>,
) -> Result<(StatusCode, Json<CreateCompanyResponse>), ApiError> {
    let first_admin = FirstAdmin {
        email: body.admin_email.trim().to_string(),
        username: body.admin_username.trim().to_string(),
        password: body.admin_password,
    };
    let (account, user) = provision_tenant(
        state.store.as_ref(),
        &body.name,
        first_admin,
        body.billing_plan,
    )
    .await?;

    tracing::info!(
        account_id = %account.id,
        super_admin_id = %admin.principal.id,
        "Tenant created by super admin"
    );

    Ok((
        StatusCode::CREATED,
        Json(CreateCompanyResponse {
            account,
            admin: user.profile(),
        }),
    ))
}

/// Update tenant request.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateCompanyRequest {
    /// New name.
    pub name: Option<String>,
    /// Enable or disable the tenant.
    pub is_active: Option<bool>,
}

/// `PATCH /super-admin/companies/:id`.
pub async fn update_company(
    State(state): State<Arc<AppState>>,
    admin: SuperAdmin,
    Path(id): Path<i64>,
    ApiJson(body): ApiJson<UpdateCompanyRequest>,
) -> Result<Json<CompanySummary>, ApiError> {
    let store = state.store.as_ref();
    let mut account = load_account(store, id)?;

    if let Some(name) = body.name {
        let name = name.trim();
        if name.is_empty() {
            return Err(ApiError::validation("company name must not be empty"));
        }
        account.name = name.to_string();
    }
    if let Some(is_active) = body.is_active {
        account.is_active = is_active;
    }
    account.updated_at = Utc::now();
    store.put_account(&account)?;

    tracing::info!(
        account_id = %account.id,
        is_active = account.is_active,
        super_admin_id = %admin.principal.id,
        "Tenant updated"
    );

    Ok(Json(Counts::load(store)?.summarize(account)))
}

/// Unlock request.
#[derive(Debug, Default, Deserialize)]
pub struct UnlockRequest {
    /// Grant a new trial of this many days (TRIAL accounts only, at most ten years).
    pub extend_trial_days: Option<i64>,
}

/// `POST /super-admin/companies/:id/unlock`.
///
/// Without an extension an expired trial is locked again by the next
/// lifecycle run.
pub async fn unlock_company(
    State(state): State<Arc<AppState>>,
    admin: SuperAdmin,
    Path(id): Path<i64>,
    body: Option<ApiJson<UnlockRequest>>,
) -> Result<Json<CompanySummary>, ApiError> {
    let UnlockRequest { extend_trial_days } = body.map(|ApiJson(body)| body).unwrap_or_default();

    let store = state.store.as_ref();
    let mut account = load_account(store, id)?;
    account.unlock(extend_trial_days, Utc::now())?;
    store.put_account(&account)?;

    tracing::info!(
        account_id = %account.id,
        extend_trial_days,
        super_admin_id = %admin.principal.id,
        "Tenant unlocked"
    );

    Ok(Json(Counts::load(store)?.summarize(account)))
}

/// Delete confirmation.
#[derive(Debug, Default, Deserialize)]
pub struct DeleteQuery {
    /// Must be `true`.
    #[serde(default)]
    pub confirm: bool,
}

/// `DELETE /super-admin/companies/:id?confirm=true`: purge a tenant and every
/// row it owns. Irreversible.
pub async fn delete_company(
    State(state): State<Arc<AppState>>,
    admin: SuperAdmin,
    Path(id): Path<i64>,
    Query(query): Query<DeleteQuery>,
) -> Result<StatusCode, ApiError> {
    if !query.confirm {
        return Err(ApiError::BadRequest {
            code: "confirmation_required",
            message: "pass confirm=true to delete a tenant and all of its data".into(),
            details: None,
        });
    }

    let account_id = AccountId::new(id);
    if !state.store.purge_account(account_id)? {
        return Err(CrmError::AccountNotFound.into());
    }

    tracing::warn!(
        account_id = %account_id,
        super_admin_id = %admin.principal.id,
        "Tenant purged"
    );
    Ok(StatusCode::NO_CONTENT)
}

fn rows<T: TenantRecord>(store: &dyn Store, scope: TenantScope) -> Result<Value, ApiError> {
    let records = TenantRepository::<T>::new(store).list(scope)?;
    serde_json::to_value(records).map_err(|e| ApiError::Internal(e.to_string()))
}

/// `GET /super-admin/overview/:entity`: one table across all tenants.
pub async fn overview(
    State(state): State<Arc<AppState>>,
    admin: SuperAdmin,
    Path(entity): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let table = Table::parse(&entity).ok_or_else(|| ApiError::not_found("entity"))?;
    let store = state.store.as_ref();
    let scope = TenantScope::AllTenants(admin.grant);

    let body = match table {
        Table::Users => {
            let users = TenantRepository::<User>::new(store).list(scope)?;
            let profiles: Vec<UserProfile> = users.iter().map(User::profile).collect();
            serde_json::to_value(profiles).map_err(|e| ApiError::Internal(e.to_string()))?
        }
        Table::Companies => rows::<Company>(store, scope)?,
        Table::Contacts => rows::<Contact>(store, scope)?,
        Table::Deals => rows::<Deal>(store, scope)?,
        Table::Tasks => rows::<Task>(store, scope)?,
    };
    Ok(Json(body))
}

/// `POST /super-admin/billing/lifecycle`: run the lifecycle job now.
pub async fn run_lifecycle(
    State(state): State<Arc<AppState>>,
    admin: SuperAdmin,
) -> Result<Json<LifecycleReport>, ApiError> {
    tracing::info!(super_admin_id = %admin.principal.id, "Manual lifecycle run");
    let report = state.lifecycle.run(Utc::now()).await?;
    Ok(Json(report))
}
