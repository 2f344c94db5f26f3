//! Account status resolution.
//!
//! Status is never persisted. It is re-derived on demand from the stored
//! plan, lock flag and trial dates, so it can be recomputed at any time.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Account, BillingPlan};

/// Effective subscription state of an account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccountStatus {
    /// Inside the trial window.
    Trial,

    /// Trial expired, grace period still running.
    Grace,

    /// On a paid plan.
    Active,

    /// Locked, either explicitly or because the grace period ran out.
    Locked,
}

impl AccountStatus {
    /// Whether the status allows normal (mutating) use.
    #[must_use]
    pub const fn is_usable(self) -> bool {
        matches!(self, Self::Active | Self::Trial)
    }
}

/// Compute the status of `account` at instant `now`.
///
/// First match wins:
/// 1. `plan_locked` -> `Locked`
/// 2. paid plan -> `Active`
/// 3. before `trial_ends_at` -> `Trial`
/// 4. before `grace_ends_at` -> `Grace`
/// 5. otherwise `Locked` (including a trial with no dates at all)
#[must_use]
pub fn resolve_status(account: &Account, now: DateTime<Utc>) -> AccountStatus {
    if account.plan_locked {
        return AccountStatus::Locked;
    }

    if account.billing_plan != BillingPlan::Trial {
        return AccountStatus::Active;
    }

    if account.trial_ends_at.is_some_and(|ends| now < ends) {
        return AccountStatus::Trial;
    }

    if account.grace_ends_at.is_some_and(|ends| now < ends) {
        return AccountStatus::Grace;
    }

    AccountStatus::Locked
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::AccountId;
    use chrono::Duration;

    fn trial_account(now: DateTime<Utc>) -> Account {
        Account::new_trial(AccountId::new(1), "Acme", now)
    }

    #[test]
    fn fresh_trial_is_trial() {
        let now = Utc::now();
        assert_eq!(resolve_status(&trial_account(now), now), AccountStatus::Trial);
    }

    #[test]
    fn expired_trial_within_grace_is_grace() {
        let now = Utc::now();
        let mut account = trial_account(now);
        account.trial_ends_at = Some(now - Duration::days(1));
        account.grace_ends_at = Some(now + Duration::days(6));

        assert_eq!(resolve_status(&account, now), AccountStatus::Grace);
    }

    #[test]
    fn expired_grace_is_locked() {
        let now = Utc::now();
        let mut account = trial_account(now);
        account.trial_ends_at = Some(now - Duration::days(8));
        account.grace_ends_at = Some(now - Duration::days(1));

        assert_eq!(resolve_status(&account, now), AccountStatus::Locked);
    }

    #[test]
    fn paid_plan_ignores_stale_dates() {
        let now = Utc::now();
        let mut account = trial_account(now);
        account.billing_plan = BillingPlan::Pro;
        account.trial_ends_at = Some(now - Duration::days(100));
        account.grace_ends_at = Some(now - Duration::days(90));

        assert_eq!(resolve_status(&account, now), AccountStatus::Active);
    }

    #[test]
    fn lock_flag_wins_over_dates() {
        let now = Utc::now();
        let mut account = trial_account(now);
        account.plan_locked = true;

        assert_eq!(resolve_status(&account, now), AccountStatus::Locked);

        account.billing_plan = BillingPlan::Enterprise;
        assert_eq!(resolve_status(&account, now), AccountStatus::Locked);
    }

    #[test]
    fn trial_without_dates_is_locked() {
        let now = Utc::now();
        let mut account = trial_account(now);
        account.trial_ends_at = None;
        account.grace_ends_at = None;

        assert_eq!(resolve_status(&account, now), AccountStatus::Locked);
    }

    #[test]
    fn boundaries_are_exclusive() {
        let now = Utc::now();
        let mut account = trial_account(now);
        account.trial_ends_at = Some(now);
        account.grace_ends_at = Some(now + Duration::days(7));
        assert_eq!(resolve_status(&account, now), AccountStatus::Grace);

        account.grace_ends_at = Some(now);
        assert_eq!(resolve_status(&account, now), AccountStatus::Locked);
    }

    #[test]
    fn resolution_is_deterministic() {
        let now = Utc::now();
        let account = trial_account(now - Duration::days(15));
        let first = resolve_status(&account, now);
        let second = resolve_status(&account, now);
        assert_eq!(first, second);
        assert_eq!(first, AccountStatus::Grace);
    }
}
