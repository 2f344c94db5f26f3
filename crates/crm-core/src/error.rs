//! Error types for the CRM core.

use chrono::{DateTime, Utc};

use crate::ids::IdError;
use crate::{BillingPlan, Feature, ResourceKind, Role};

/// Result type for CRM operations.
pub type Result<T> = std::result::Result<T, CrmError>;

/// Errors produced by tenant resolution, access checks and repositories.
#[derive(Debug, thiserror::Error)]
pub enum CrmError {
    /// No valid identity was presented.
    #[error("unauthorized")]
    Unauthorized,

    /// The principal's role does not allow the operation.
    #[error("role {role} is not allowed to perform this operation")]
    Forbidden {
        /// The caller's role.
        role: Role,
    },

    /// The route needs a tenant but none was selected.
    #[error("an account must be selected for this operation")]
    AccountRequired,

    /// The selected account does not exist.
    #[error("account not found")]
    AccountNotFound,

    /// The selected account has been deactivated.
    #[error("account is inactive")]
    AccountInactive,

    /// The account carries the explicit lock flag.
    #[error("account plan is locked")]
    PlanLocked,

    /// The trial expired and the grace period is running.
    #[error("trial expired, account is in its grace period")]
    AccountInGrace {
        /// When the trial ended.
        trial_ends_at: Option<DateTime<Utc>>,
        /// When the grace period ends.
        grace_ends_at: Option<DateTime<Utc>>,
    },

    /// The account is locked.
    #[error("account is locked")]
    AccountLocked {
        /// When the grace period ended, if there was one.
        grace_ends_at: Option<DateTime<Utc>>,
    },

    /// The account's plan ranks below the required plan.
    #[error("plan {current} is below required plan {required}")]
    InsufficientPlan {
        /// Current plan.
        current: BillingPlan,
        /// Required plan.
        required: BillingPlan,
    },

    /// The account's plan does not include a feature.
    #[error("feature {feature} is not available on plan {current_plan}")]
    FeatureNotAvailable {
        /// The requested feature.
        feature: Feature,
        /// Current plan.
        current_plan: BillingPlan,
        /// Lowest plan that includes the feature, if any.
        minimum_plan: Option<BillingPlan>,
    },

    /// The plan's resource limit has been reached.
    #[error("{entity} limit reached: {current}/{limit}")]
    LimitReached {
        /// The limited resource kind.
        entity: ResourceKind,
        /// Configured limit.
        limit: u64,
        /// Rows that already exist.
        current: u64,
    },

    /// Record not found (also returned for records of other tenants).
    #[error("{entity} not found")]
    NotFound {
        /// Entity kind.
        entity: &'static str,
    },

    /// A referenced record does not exist in the caller's tenant.
    #[error("referenced {entity} {id} does not exist")]
    InvalidReference {
        /// Referenced entity kind.
        entity: &'static str,
        /// Referenced id.
        id: i64,
    },

    /// Invalid plan change.
    #[error("invalid plan transition from {from} to {to}")]
    InvalidPlanTransition {
        /// Current plan.
        from: BillingPlan,
        /// Requested plan.
        to: BillingPlan,
    },

    /// Input failed validation.
    #[error("validation error: {0}")]
    Validation(String),

    /// A unique value is already taken.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Invalid identifier.
    #[error("invalid identifier: {0}")]
    InvalidId(#[from] IdError),

    /// The plan catalog is malformed or not monotonic.
    #[error("invalid plan catalog: {0}")]
    InvalidCatalog(String),

    /// Storage failure.
    #[error("storage error: {0}")]
    Storage(String),
}
