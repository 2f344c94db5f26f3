//! Plan catalog: resource limits and feature flags per billing plan.
//!
//! The catalog is built once at process start and shared immutably. Plans
//! form a monotonic ladder: a higher plan never has a lower limit or a missing
//! feature compared to a plan below it. [`PlanCatalog::new`] refuses any
//! catalog that breaks this rule.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::error::{CrmError, Result};
use crate::BillingPlan;

// ============================================================================
// Constants
// ============================================================================

/// Starter plan monthly price in cents ($19).
pub const STARTER_PLAN_PRICE_CENTS: i64 = 1900;

/// Pro plan monthly price in cents ($49).
pub const PRO_PLAN_PRICE_CENTS: i64 = 4900;

/// Named boolean capabilities a plan may include.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Feature {
    /// Analytics dashboard.
    AnalyticsDashboard,

    /// Deal pipeline (kanban) view.
    PipelineView,

    /// User administration module.
    AdminModule,

    /// Search across all entity kinds.
    GlobalSearch,
}

impl Feature {
    /// Wire name of the feature.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::AnalyticsDashboard => "analytics_dashboard",
            Self::PipelineView => "pipeline_view",
            Self::AdminModule => "admin_module",
            Self::GlobalSearch => "global_search",
        }
    }
}

impl std::fmt::Display for Feature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resource kinds that carry a per-plan count limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    /// Tenant users.
    Users,

    /// Company records.
    Companies,

    /// Deal records.
    Deals,
}

impl ResourceKind {
    /// All limited kinds.
    pub const ALL: [ResourceKind; 3] = [Self::Users, Self::Companies, Self::Deals];

    /// Wire name of the resource kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Users => "users",
            Self::Companies => "companies",
            Self::Deals => "deals",
        }
    }
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Limits and features of one plan.
///
/// A `None` limit means unlimited.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanConfig {
    /// The plan this configuration describes.
    pub plan: BillingPlan,

    /// Human-readable plan name.
    pub display_name: String,

    /// Monthly price in cents; `None` for custom pricing.
    pub monthly_price_cents: Option<i64>,

    /// Maximum number of users.
    pub max_users: Option<u64>,

    /// Maximum number of companies.
    pub max_companies: Option<u64>,

    /// Maximum number of deals.
    pub max_deals: Option<u64>,

    /// Enabled features.
    #[serde(default)]
    pub features: BTreeSet<Feature>,
}

impl PlanConfig {
    /// Limit for a resource kind (`None` = unlimited).
    #[must_use]
    pub const fn limit(&self, kind: ResourceKind) -> Option<u64> {
        match kind {
            ResourceKind::Users => self.max_users,
            ResourceKind::Companies => self.max_companies,
            ResourceKind::Deals => self.max_deals,
        }
    }

    /// Whether the plan includes a feature.
    #[must_use]
    pub fn has_feature(&self, feature: Feature) -> bool {
        self.features.contains(&feature)
    }
}

/// Immutable registry of all plan configurations, indexed by ladder rank.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct PlanCatalog {
    plans: Vec<PlanConfig>,
}

impl PlanCatalog {
    /// Build a catalog from one configuration per plan.
    ///
    /// # Errors
    ///
    /// Returns `CrmError::InvalidCatalog` if a plan is missing or duplicated,
    /// or if any limit or feature decreases going up the ladder.
    pub fn new(configs: Vec<PlanConfig>) -> Result<Self> {
        let mut slots: Vec<Option<PlanConfig>> = vec![None; BillingPlan::LADDER.len()];
        for config in configs {
            let slot = &mut slots[config.plan.rank()];
            if slot.is_some() {
                return Err(CrmError::InvalidCatalog(format!(
                    "plan {} configured twice",
                    config.plan
                )));
            }
            *slot = Some(config);
        }

        let plans = slots
            .into_iter()
            .zip(BillingPlan::LADDER)
            .map(|(slot, plan)| {
                slot.ok_or_else(|| CrmError::InvalidCatalog(format!("plan {plan} is missing")))
            })
            .collect::<Result<Vec<_>>>()?;

        for pair in plans.windows(2) {
            check_monotonic(&pair[0], &pair[1])?;
        }

        Ok(Self { plans })
    }

    /// Parse and validate a catalog from a JSON array of plan configurations.
    ///
    /// # Errors
    ///
    /// Returns `CrmError::InvalidCatalog` on malformed JSON or an invalid ladder.
    pub fn from_json(json: &str) -> Result<Self> {
        let configs: Vec<PlanConfig> =
            serde_json::from_str(json).map_err(|e| CrmError::InvalidCatalog(e.to_string()))?;
        Self::new(configs)
    }

    /// The built-in catalog.
    ///
    /// | Plan | Users | Companies | Deals | Features |
    /// |------|-------|-----------|-------|----------|
    /// | Trial | 2 | 25 | 50 | pipeline |
    /// | Starter | 5 | 50 | 250 | pipeline, search |
    /// | Pro | 25 | 500 | unlimited | + analytics, admin |
    /// | Enterprise | unlimited | unlimited | unlimited | all |
    #[must_use]
    pub fn standard() -> Self {
        use Feature::{AdminModule, AnalyticsDashboard, GlobalSearch, PipelineView};

        let plans = vec![
            PlanConfig {
                plan: BillingPlan::Trial,
                display_name: "Trial".into(),
                monthly_price_cents: Some(0),
                max_users: Some(2),
                max_companies: Some(25),
                max_deals: Some(50),
                features: BTreeSet::from([PipelineView]),
            },
            PlanConfig {
                plan: BillingPlan::Starter,
                display_name: "Starter".into(),
                monthly_price_cents: Some(STARTER_PLAN_PRICE_CENTS),
                max_users: Some(5),
                max_companies: Some(50),
                max_deals: Some(250),
                features: BTreeSet::from([PipelineView, GlobalSearch]),
            },
            PlanConfig {
                plan: BillingPlan::Pro,
                display_name: "Pro".into(),
                monthly_price_cents: Some(PRO_PLAN_PRICE_CENTS),
                max_users: Some(25),
                max_companies: Some(500),
                max_deals: None,
                features: BTreeSet::from([
                    PipelineView,
                    GlobalSearch,
                    AnalyticsDashboard,
                    AdminModule,
                ]),
            },
            PlanConfig {
                plan: BillingPlan::Enterprise,
                display_name: "Enterprise".into(),
                monthly_price_cents: None,
                max_users: None,
                max_companies: None,
                max_deals: None,
                features: BTreeSet::from([
                    PipelineView,
                    GlobalSearch,
                    AnalyticsDashboard,
                    AdminModule,
                ]),
            },
        ];

        Self { plans }
    }

    /// Configuration of a plan.
    #[must_use]
    pub fn get(&self, plan: BillingPlan) -> &PlanConfig {
        &self.plans[plan.rank()]
    }

    /// All configurations, lowest plan first.
    pub fn iter(&self) -> impl Iterator<Item = &PlanConfig> {
        self.plans.iter()
    }

    /// The lowest plan that includes `feature`, if any does.
    #[must_use]
    pub fn minimum_plan_for(&self, feature: Feature) -> Option<BillingPlan> {
        self.plans
            .iter()
            .find(|config| config.has_feature(feature))
            .map(|config| config.plan)
    }
}

impl Default for PlanCatalog {
    fn default() -> Self {
        Self::standard()
    }
}

/// `a <= b` where `None` is unlimited.
fn limit_le(a: Option<u64>, b: Option<u64>) -> bool {
    match (a, b) {
        (_, None) => true,
        (None, Some(_)) => false,
        (Some(a), Some(b)) => a <= b,
    }
}

fn check_monotonic(lower: &PlanConfig, higher: &PlanConfig) -> Result<()> {
    for kind in ResourceKind::ALL {
        if !limit_le(lower.limit(kind), higher.limit(kind)) {
            return Err(CrmError::InvalidCatalog(format!(
                "{} limit of {} exceeds {}",
                kind, lower.plan, higher.plan
            )));
        }
    }

    if let Some(missing) = lower.features.difference(&higher.features).next() {
        return Err(CrmError::InvalidCatalog(format!(
            "{} has {} but {} does not",
            lower.plan, missing, higher.plan
        )));
    }

    Ok(())
}
