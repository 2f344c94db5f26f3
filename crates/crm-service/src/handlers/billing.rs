//! Billing handlers: current subscription, plan catalog, upgrade.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crm_core::{
    AccountContext, AccountId, AccountStatus, BillingPlan, Company, Deal, Feature, PlanCatalog,
    ResourceKind, Role, User,
};
use crm_store::TenantRepository;

use crate::context::TenantContext;
use crate::error::{ApiError, ApiJson};
use crate::state::AppState;

/// Per-resource values (limits or current usage).
#[derive(Debug, Serialize)]
pub struct ResourceCounts<T> {
    /// Users.
    pub users: T,
    /// Companies.
    pub companies: T,
    /// Deals.
    pub deals: T,
}

/// Subscription state of the current account.
#[derive(Debug, Serialize)]
pub struct BillingCurrentResponse {
    /// Account id.
    pub account_id: AccountId,
    /// Current plan.
    pub plan: BillingPlan,
    /// Display name of the plan.
    pub plan_name: String,
    /// Derived status.
    pub status: AccountStatus,
    /// Explicit lock flag.
    pub plan_locked: bool,
    /// End of the trial.
    pub trial_ends_at: Option<DateTime<Utc>>,
    /// End of the grace period.
    pub grace_ends_at: Option<DateTime<Utc>>,
    /// Whole days until the current trial or grace window closes.
    pub days_remaining: Option<i64>,
    /// Plan limits; `null` means unlimited.
    pub limits: ResourceCounts<Option<u64>>,
    /// Rows currently owned.
    pub usage: ResourceCounts<u64>,
    /// Enabled features.
    pub features: Vec<Feature>,
}

fn days_remaining(ctx: &AccountContext, now: DateTime<Utc>) -> Option<i64> {
    let until = match ctx.status {
        AccountStatus::Trial => ctx.account.trial_ends_at?,
        AccountStatus::Grace => ctx.account.grace_ends_at?,
        AccountStatus::Active | AccountStatus::Locked => return None,
    };
    let seconds = (until - now).num_seconds().max(0);
    Some((seconds + 86_399) / 86_400)
}

fn current(state: &AppState, ctx: &AccountContext) -> Result<BillingCurrentResponse, ApiError> {
    let account_id = ctx.account_id();
    let store = state.store.as_ref();
    let config = state.gate.plan_config(ctx);

    Ok(BillingCurrentResponse {
        account_id,
        plan: ctx.plan(),
        plan_name: config.display_name.clone(),
        status: ctx.status,
        plan_locked: ctx.account.plan_locked,
        trial_ends_at: ctx.account.trial_ends_at,
        grace_ends_at: ctx.account.grace_ends_at,
        days_remaining: days_remaining(ctx, Utc::now()),
        limits: ResourceCounts {
            users: config.limit(ResourceKind::Users),
            companies: config.limit(ResourceKind::Companies),
            deals: config.limit(ResourceKind::Deals),
        },
        usage: ResourceCounts {
            users: TenantRepository::<User>::new(store).count(account_id)?,
            companies: TenantRepository::<Company>::new(store).count(account_id)?,
            deals: TenantRepository::<Deal>::new(store).count(account_id)?,
        },
        features: config.features.iter().copied().collect(),
    })
}

/// Current plan, status, limits, usage and features.
pub async fn get_current(
    State(state): State<Arc<AppState>>,
    TenantContext(ctx): TenantContext,
) -> Result<Json<BillingCurrentResponse>, ApiError> {
    Ok(Json(current(&state, &ctx)?))
}

/// The plan catalog.
pub async fn list_plans(
    State(state): State<Arc<AppState>>,
    TenantContext(_ctx): TenantContext,
) -> Json<PlanCatalog> {
    Json(state.catalog.as_ref().clone())
}

/// Upgrade request.
#[derive(Debug, Deserialize)]
pub struct UpgradeRequest {
    /// Target plan.
    pub plan: BillingPlan,
}

/// Move the account to a paid plan, clearing trial dates and any lock.
///
/// Allowed for locked and grace accounts.
pub async fn upgrade(
    State(state): State<Arc<AppState>>,
    TenantContext(ctx): TenantContext,
    ApiJson(body): ApiJson<UpgradeRequest>,
) -> Result<Json<BillingCurrentResponse>, ApiError> {
    ctx.principal
        .require_role(&[Role::CompanyAdmin, Role::SuperAdmin])?;

    let now = Utc::now();
    let mut account = ctx.account.clone();
    let previous = account.billing_plan;
    account.upgrade(body.plan, now)?;
    state.store.put_account(&account)?;

    tracing::info!(
        account_id = %account.id,
        from = %previous,
        to = %account.billing_plan,
        user_id = %ctx.principal.id,
        "Account plan upgraded"
    );

    let ctx = AccountContext::new(ctx.principal, account, now);
    Ok(Json(current(&state, &ctx)?))
}
