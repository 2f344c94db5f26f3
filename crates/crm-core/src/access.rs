//! Plan, feature, limit and status gating.
//!
//! Each check is independent and is applied selectively per operation. Reads
//! usually need nothing beyond a loaded [`AccountContext`]; creations run the
//! full chain (see [`AccessGate::authorize_create`]).

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::error::{CrmError, Result};
use crate::status::resolve_status;
use crate::{
    Account, AccountId, AccountStatus, BillingPlan, Feature, PlanCatalog, PlanConfig, Principal,
    ResourceKind,
};

/// Per-request tenant context, immutable once loaded.
#[derive(Debug, Clone)]
pub struct AccountContext {
    /// The caller.
    pub principal: Principal,
    /// The account in force for this request.
    pub account: Account,
    /// Status of the account at load time.
    pub status: AccountStatus,
}

impl AccountContext {
    /// Build a context, resolving the account status at `now`.
    #[must_use]
    pub fn new(principal: Principal, account: Account, now: DateTime<Utc>) -> Self {
        let status = resolve_status(&account, now);
        Self {
            principal,
            account,
            status,
        }
    }

    /// The account in force.
    #[must_use]
    pub const fn account_id(&self) -> AccountId {
        self.account.id
    }

    /// The account's billing plan.
    #[must_use]
    pub const fn plan(&self) -> BillingPlan {
        self.account.billing_plan
    }
}

/// Authorization checks backed by the plan catalog.
#[derive(Debug, Clone)]
pub struct AccessGate {
    catalog: Arc<PlanCatalog>,
}

impl AccessGate {
    /// Create a gate over a shared catalog.
    #[must_use]
    pub fn new(catalog: Arc<PlanCatalog>) -> Self {
        Self { catalog }
    }

    /// The catalog in use.
    #[must_use]
    pub fn catalog(&self) -> &PlanCatalog {
        &self.catalog
    }

    /// Configuration of the context's plan.
    #[must_use]
    pub fn plan_config(&self, ctx: &AccountContext) -> &PlanConfig {
        self.catalog.get(ctx.plan())
    }

    /// Fail with `PlanLocked` when the lock flag is set.
    ///
    /// # Errors
    ///
    /// Returns `CrmError::PlanLocked`.
    pub fn require_not_locked(&self, ctx: &AccountContext) -> Result<()> {
        if ctx.account.plan_locked {
            return Err(CrmError::PlanLocked);
        }
        Ok(())
    }

    /// Require the account's plan to rank at least `tier`.
    ///
    /// # Errors
    ///
    /// Returns `CrmError::PlanLocked` for locked accounts, whatever the tier,
    /// then `CrmError::InsufficientPlan` if the plan ranks below `tier`.
    pub fn require_min_plan(&self, ctx: &AccountContext, tier: BillingPlan) -> Result<()> {
        self.require_not_locked(ctx)?;

        if ctx.plan().rank() < tier.rank() {
            return Err(CrmError::InsufficientPlan {
                current: ctx.plan(),
                required: tier,
            });
        }
        Ok(())
    }

    /// Require the account's plan to include `feature`.
    ///
    /// # Errors
    ///
    /// Returns `CrmError::PlanLocked` for locked accounts, then
    /// `CrmError::FeatureNotAvailable` naming the lowest plan with the feature.
    pub fn require_feature(&self, ctx: &AccountContext, feature: Feature) -> Result<()> {
        self.require_not_locked(ctx)?;

        if !self.plan_config(ctx).has_feature(feature) {
            return Err(CrmError::FeatureNotAvailable {
                feature,
                current_plan: ctx.plan(),
                minimum_plan: self.catalog.minimum_plan_for(feature),
            });
        }
        Ok(())
    }

    /// Require the tenant to be below its limit for `kind`.
    ///
    /// `count` is only invoked for finite limits, and must read the current
    /// row count from the store at call time. The check is not atomic with the
    /// insert that follows it.
    ///
    /// # Errors
    ///
    /// Returns `CrmError::LimitReached` when `current >= limit`, or whatever
    /// `count` fails with.
    pub fn check_limit<F>(&self, ctx: &AccountContext, kind: ResourceKind, count: F) -> Result<()>
    where
        F: FnOnce() -> Result<u64>,
    {
        let Some(limit) = self.plan_config(ctx).limit(kind) else {
            return Ok(());
        };

        let current = count()?;
        if current >= limit {
            return Err(CrmError::LimitReached {
                entity: kind,
                limit,
                current,
            });
        }
        Ok(())
    }

    /// Require the account to be `Active` or `Trial`.
    ///
    /// # Errors
    ///
    /// Returns `CrmError::AccountInGrace` or `CrmError::AccountLocked` with the
    /// relevant dates.
    pub fn require_active_account(&self, ctx: &AccountContext) -> Result<()> {
        match ctx.status {
            AccountStatus::Active | AccountStatus::Trial => Ok(()),
            AccountStatus::Grace => Err(CrmError::AccountInGrace {
                trial_ends_at: ctx.account.trial_ends_at,
                grace_ends_at: ctx.account.grace_ends_at,
            }),
            AccountStatus::Locked => Err(CrmError::AccountLocked {
                grace_ends_at: ctx.account.grace_ends_at,
            }),
        }
    }

    /// Guard for updates and deletes: not locked, then active.
    ///
    /// # Errors
    ///
    /// See [`Self::require_not_locked`] and [`Self::require_active_account`].
    pub fn require_writable(&self, ctx: &AccountContext) -> Result<()> {
        self.require_not_locked(ctx)?;
        self.require_active_account(ctx)
    }

    /// Guard for resource creation.
    ///
    /// Order: PlanLocked -> ActiveAccount -> Feature -> Limit.
    ///
    /// # Errors
    ///
    /// The first failing check's error.
    pub fn authorize_create<F>(
        &self,
        ctx: &AccountContext,
        feature: Option<Feature>,
        limit: Option<ResourceKind>,
        count: F,
    ) -> Result<()>
    where
        F: FnOnce() -> Result<u64>,
    {
        self.require_writable(ctx)?;
        if let Some(feature) = feature {
            self.require_feature(ctx, feature)?;
        }
        if let Some(kind) = limit {
            self.check_limit(ctx, kind, count)?;
        }
        Ok(())
    }
}
