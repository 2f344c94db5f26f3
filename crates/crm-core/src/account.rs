//! Account (tenant) types.
//!
//! An account is an isolated customer organization. All business data is
//! partitioned by its id, and its billing plan and trial dates decide what the
//! tenant may do (see [`crate::status`] and [`crate::access`]).

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{CrmError, Result};
use crate::AccountId;

// ============================================================================
// Constants
// ============================================================================

/// Length of the trial granted to a new account, in days.
pub const TRIAL_PERIOD_DAYS: i64 = 14;

/// Length of the grace period that follows the trial, in days.
pub const GRACE_PERIOD_DAYS: i64 = 7;

/// Longest trial a manual unlock may grant, in days.
pub const MAX_TRIAL_EXTENSION_DAYS: i64 = 3650;

/// A tenant account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// The account id.
    pub id: AccountId,

    /// Organization name.
    pub name: String,

    /// Deactivated accounts cannot be used at all.
    pub is_active: bool,

    /// Current billing plan.
    pub billing_plan: BillingPlan,

    /// Explicit kill-switch, set by the lifecycle job or an administrator.
    pub plan_locked: bool,

    /// End of the trial. Only meaningful while the plan is `Trial`.
    pub trial_ends_at: Option<DateTime<Utc>>,

    /// End of the grace period. Only meaningful while the plan is `Trial`.
    pub grace_ends_at: Option<DateTime<Utc>>,

    /// When the account was created.
    pub created_at: DateTime<Utc>,

    /// When the account was last updated.
    pub updated_at: DateTime<Utc>,
}

impl Account {
    /// Create a freshly signed-up account on the trial plan.
    ///
    /// The trial ends [`TRIAL_PERIOD_DAYS`] after `now` and the grace period
    /// [`GRACE_PERIOD_DAYS`] after that.
    #[must_use]
    pub fn new_trial(id: AccountId, name: impl Into<String>, now: DateTime<Utc>) -> Self {
        let trial_ends_at = now + Duration::days(TRIAL_PERIOD_DAYS);
        Self {
            id,
            name: name.into(),
            is_active: true,
            billing_plan: BillingPlan::Trial,
            plan_locked: false,
            trial_ends_at: Some(trial_ends_at),
            grace_ends_at: Some(trial_ends_at + Duration::days(GRACE_PERIOD_DAYS)),
            created_at: now,
            updated_at: now,
        }
    }

    /// Move the account to a paid plan.
    ///
    /// Clears the trial and grace dates and lifts any lock.
    ///
    /// # Errors
    ///
    /// Returns `CrmError::InvalidPlanTransition` when `plan` is `Trial`; an
    /// account can never re-enter the trial.
    pub fn upgrade(&mut self, plan: BillingPlan, now: DateTime<Utc>) -> Result<()> {
        if plan == BillingPlan::Trial {
            return Err(CrmError::InvalidPlanTransition {
                from: self.billing_plan,
                to: plan,
            });
        }

        self.billing_plan = plan;
        self.trial_ends_at = None;
        self.grace_ends_at = None;
        self.plan_locked = false;
        self.updated_at = now;
        Ok(())
    }

    /// Lift the explicit lock.
    ///
    /// When `extend_trial_days` is given, a new trial window starting at `now`
    /// is granted together with a fresh grace period; otherwise the next
    /// lifecycle run re-locks an expired trial. Nothing changes on error.
    ///
    /// # Errors
    ///
    /// Returns `CrmError::Validation` if an extension is requested for a paid
    /// plan, or if it is not between 1 and [`MAX_TRIAL_EXTENSION_DAYS`].
    pub fn unlock(&mut self, extend_trial_days: Option<i64>, now: DateTime<Utc>) -> Result<()> {
        let window = match extend_trial_days {
            Some(_) if self.billing_plan != BillingPlan::Trial => {
                return Err(CrmError::Validation(
                    "extend_trial_days only applies to TRIAL accounts".into(),
                ));
            }
            Some(days) => Some(trial_window(now, days)?),
            None => None,
        };

        self.plan_locked = false;
        if let Some((trial_ends_at, grace_ends_at)) = window {
            self.trial_ends_at = Some(trial_ends_at);
            self.grace_ends_at = Some(grace_ends_at);
        }
        self.updated_at = now;
        Ok(())
    }
}

/// Trial and grace end dates for a trial of `days` starting at `now`.
fn trial_window(now: DateTime<Utc>, days: i64) -> Result<(DateTime<Utc>, DateTime<Utc>)> {
    if !(1..=MAX_TRIAL_EXTENSION_DAYS).contains(&days) {
        return Err(CrmError::Validation(format!(
            "extend_trial_days must be between 1 and {MAX_TRIAL_EXTENSION_DAYS}"
        )));
    }
    let out_of_range = || CrmError::Validation("extend_trial_days is out of range".into());
    let trial_ends_at = Duration::try_days(days)
        .and_then(|trial| now.checked_add_signed(trial))
        .ok_or_else(out_of_range)?;
    let grace_ends_at = Duration::try_days(GRACE_PERIOD_DAYS)
        .and_then(|grace| trial_ends_at.checked_add_signed(grace))
        .ok_or_else(out_of_range)?;
    Ok((trial_ends_at, grace_ends_at))
}

/// Billing plans, declared in ladder order.
///
/// The derived `Ord` follows declaration order, so `Trial < Starter < Pro < Enterprise`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BillingPlan {
    /// Free trial with a hard expiry.
    Trial,

    /// Entry-level paid plan.
    Starter,

    /// Professional plan.
    Pro,

    /// Enterprise plan.
    Enterprise,
}

impl BillingPlan {
    /// The plan ladder, lowest first.
    pub const LADDER: [BillingPlan; 4] = [Self::Trial, Self::Starter, Self::Pro, Self::Enterprise];

    /// Position on the ladder (0 for `Trial`).
    #[must_use]
    pub const fn rank(self) -> usize {
        match self {
            Self::Trial => 0,
            Self::Starter => 1,
            Self::Pro => 2,
            Self::Enterprise => 3,
        }
    }

    /// Wire name of the plan.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Trial => "TRIAL",
            Self::Starter => "STARTER",
            Self::Pro => "PRO",
            Self::Enterprise => "ENTERPRISE",
        }
    }
}

impl std::fmt::Display for BillingPlan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
