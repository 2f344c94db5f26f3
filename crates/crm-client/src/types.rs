//! Request and response types for the CRM client.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crm_core::{Account, AccountId, AccountStatus, BillingPlan, Feature, Role, UserProfile};

/// Login request.
#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest {
    /// Email or username.
    pub login: String,
    /// Password.
    pub password: String,
}

/// Issued access token with its user.
#[derive(Debug, Clone, Deserialize)]
pub struct Session {
    /// Bearer token.
    pub token: String,
    /// Always `Bearer`.
    pub token_type: String,
    /// Expiry.
    pub expires_at: DateTime<Utc>,
    /// The authenticated user.
    pub user: UserProfile,
}

/// Signup request.
#[derive(Debug, Clone, Serialize)]
pub struct RegisterRequest {
    /// Company (tenant) name.
    pub company_name: String,
    /// Administrator email.
    pub email: String,
    /// Administrator username.
    pub username: String,
    /// Administrator password.
    pub password: String,
}

/// Signup response.
#[derive(Debug, Clone, Deserialize)]
pub struct Registration {
    /// Session of the new administrator.
    #[serde(flatten)]
    pub session: Session,
    /// The new account.
    pub account: Account,
}

/// Current user and account.
#[derive(Debug, Clone, Deserialize)]
pub struct Me {
    /// The user.
    pub user: UserProfile,
    /// Their account (absent for super admins).
    pub account: Option<Account>,
    /// Account status.
    pub status: Option<AccountStatus>,
}

/// Per-resource values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct ResourceCounts<T> {
    /// Users.
    pub users: T,
    /// Companies.
    pub companies: T,
    /// Deals.
    pub deals: T,
}

/// Subscription state of the current account.
#[derive(Debug, Clone, Deserialize)]
pub struct BillingCurrent {
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
    /// Days left in the current trial or grace window.
    pub days_remaining: Option<i64>,
    /// Limits; `None` is unlimited.
    pub limits: ResourceCounts<Option<u64>>,
    /// Current usage.
    pub usage: ResourceCounts<u64>,
    /// Enabled features.
    pub features: Vec<Feature>,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct UpgradeRequest {
    pub plan: BillingPlan,
}

/// New tenant user.
#[derive(Debug, Clone, Serialize)]
pub struct CreateUserRequest {
    /// Email.
    pub email: String,
    /// Login name.
    pub username: String,
    /// Initial password.
    pub password: String,
    /// `CompanyAdmin` or `User`.
    pub role: Role,
}

/// API error response.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorResponse {
    /// Error details.
    pub error: ApiErrorBody,
}

/// API error body.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorBody {
    /// Error code.
    pub code: String,
    /// Error message.
    pub message: String,
    /// Additional details.
    pub details: Option<serde_json::Value>,
}
