//! Billing lifecycle job.
//!
//! A periodic pass over all accounts:
//!
//! 1. **Lock**: TRIAL accounts whose trial has ended get `plan_locked = true`.
//! 2. **Pending deletion**: locked TRIAL accounts whose grace period has ended
//!    are reported. Nothing is deleted; purging an account is a separate,
//!    explicitly confirmed super-admin operation.
//! 3. **Grace warnings**: locked TRIAL accounts still inside their grace
//!    period are reported with the whole days remaining, rounded up.
//!
//! Re-running is a no-op for already-locked accounts, and runs are serialized
//! so the scheduler and the manual trigger never overlap.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crm_core::{Account, AccountId, BillingPlan, Result};
use crm_store::Store;

const SECONDS_PER_DAY: i64 = 24 * 60 * 60;

/// An account whose grace period has ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PendingDeletion {
    /// Account id.
    pub account_id: AccountId,
    /// Account name.
    pub name: String,
    /// When the grace period ended.
    pub grace_ended_at: DateTime<Utc>,
}

/// A locked account still inside its grace period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GraceWarning {
    /// Account id.
    pub account_id: AccountId,
    /// Account name.
    pub name: String,
    /// When the grace period ends.
    pub grace_ends_at: DateTime<Utc>,
    /// Whole days left, rounded up.
    pub days_remaining: i64,
}

/// Outcome of one lifecycle run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LifecycleReport {
    /// Evaluation time.
    pub ran_at: DateTime<Utc>,
    /// Number of accounts locked by this run.
    pub locked_count: usize,
    /// Accounts locked by this run.
    pub locked_account_ids: Vec<AccountId>,
    /// Accounts past their grace period.
    pub pending_deletion: Vec<PendingDeletion>,
    /// Accounts inside their grace period.
    pub grace_warnings: Vec<GraceWarning>,
}

/// Whole days from `now` until `until`, rounded up.
fn days_until(now: DateTime<Utc>, until: DateTime<Utc>) -> i64 {
    let seconds = (until - now).num_seconds().max(0);
    (seconds + SECONDS_PER_DAY - 1) / SECONDS_PER_DAY
}

fn is_locked_trial(account: &Account) -> bool {
    account.billing_plan == BillingPlan::Trial && account.plan_locked
}

/// Run all three passes against `store` as of `now`.
///
/// # Errors
///
/// Returns `CrmError::Storage` if the store fails. Accounts locked before the
/// failure stay locked; a re-run picks up the rest.
pub fn run_lifecycle(store: &dyn Store, now: DateTime<Utc>) -> Result<LifecycleReport> {
    let mut accounts = store.list_accounts()?;

    let mut locked_account_ids = Vec::new();
    for account in &mut accounts {
        let trial_expired = account.trial_ends_at.is_some_and(|ends| ends < now);
        if account.billing_plan == BillingPlan::Trial && !account.plan_locked && trial_expired {
            account.plan_locked = true;
            account.updated_at = now;
            store.put_account(account)?;
            tracing::info!(
                account_id = %account.id,
                name = %account.name,
                "Trial expired, account locked"
            );
            locked_account_ids.push(account.id);
        }
    }

    let mut pending_deletion = Vec::new();
    let mut grace_warnings = Vec::new();
    for account in accounts.iter().filter(|account| is_locked_trial(account)) {
        let Some(grace_ends_at) = account.grace_ends_at else {
            continue;
        };
        if grace_ends_at < now {
            pending_deletion.push(PendingDeletion {
                account_id: account.id,
                name: account.name.clone(),
                grace_ended_at: grace_ends_at,
            });
        } else {
            grace_warnings.push(GraceWarning {
                account_id: account.id,
                name: account.name.clone(),
                grace_ends_at,
                days_remaining: days_until(now, grace_ends_at),
            });
        }
    }

    Ok(LifecycleReport {
        ran_at: now,
        locked_count: locked_account_ids.len(),
        locked_account_ids,
        pending_deletion,
        grace_warnings,
    })
}

/// The lifecycle job with its run guard.
pub struct BillingLifecycleJob {
    store: Arc<dyn Store>,
    running: Mutex<()>,
}

impl BillingLifecycleJob {
    /// Create a job over `store`.
    #[must_use]
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self {
            store,
            running: Mutex::new(()),
        }
    }

    /// Run once. Waits for a run already in progress to finish first.
    ///
    /// # Errors
    ///
    /// Returns `CrmError::Storage` if the store fails.
    pub async fn run(&self, now: DateTime<Utc>) -> Result<LifecycleReport> {
        let _guard = self.running.lock().await;
        let report = run_lifecycle(self.store.as_ref(), now)?;

        tracing::info!(
            locked = report.locked_count,
            pending_deletion = report.pending_deletion.len(),
            grace_warnings = report.grace_warnings.len(),
            "Billing lifecycle run complete"
        );
        for pending in &report.pending_deletion {
            tracing::warn!(
                account_id = %pending.account_id,
                grace_ended_at = %pending.grace_ended_at,
                "Grace period over, account pending deletion"
            );
        }

        Ok(report)
    }

    /// Run now and then every `period` until the runtime shuts down.
    pub fn spawn(self: Arc<Self>, period: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if let Err(e) = self.run(Utc::now()).await {
                    tracing::error!(error = %e, "Billing lifecycle run failed");
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration as ChronoDuration;
    use crm_store::MemoryStore;

    fn trial(id: i64, trial_ends_in_days: i64, now: DateTime<Utc>) -> Account {
        let mut account = Account::new_trial(AccountId::new(id), format!("Tenant {id}"), now);
        account.trial_ends_at = Some(now + ChronoDuration::days(trial_ends_in_days));
        account.grace_ends_at = Some(now + ChronoDuration::days(trial_ends_in_days + 7));
        account
    }

    #[test]
    fn locks_only_expired_trials() {
        let store = MemoryStore::new();
        let now = Utc::now();
        store.put_account(&trial(1, -1, now)).unwrap();
        store.put_account(&trial(2, 3, now)).unwrap();
        let mut paid = trial(3, -30, now);
        paid.upgrade(BillingPlan::Starter, now).unwrap();
        store.put_account(&paid).unwrap();

        let report = run_lifecycle(&store, now).unwrap();
        assert_eq!(report.locked_account_ids, vec![AccountId::new(1)]);
        assert!(store.get_account(AccountId::new(1)).unwrap().unwrap().plan_locked);
        assert!(!store.get_account(AccountId::new(2)).unwrap().unwrap().plan_locked);
        assert!(!store.get_account(AccountId::new(3)).unwrap().unwrap().plan_locked);
    }

    #[test]
    fn second_run_locks_nothing() {
        let store = MemoryStore::new();
        let now = Utc::now();
        store.put_account(&trial(1, -1, now)).unwrap();

        assert_eq!(run_lifecycle(&store, now).unwrap().locked_count, 1);
        assert_eq!(run_lifecycle(&store, now).unwrap().locked_count, 0);
    }

    #[test]
    fn reports_pending_deletion_and_warnings_without_deleting() {
        let store = MemoryStore::new();
        let now = Utc::now();
        // Grace ended a day ago.
        store.put_account(&trial(1, -8, now)).unwrap();
        // Grace ends in 5 days and 1 hour.
        let mut warned = trial(2, -2, now);
        warned.grace_ends_at = Some(now + ChronoDuration::days(5) + ChronoDuration::hours(1));
        store.put_account(&warned).unwrap();

        let report = run_lifecycle(&store, now).unwrap();
        assert_eq!(report.locked_count, 2);
        assert_eq!(report.pending_deletion.len(), 1);
        assert_eq!(report.pending_deletion[0].account_id, AccountId::new(1));
        assert_eq!(report.grace_warnings.len(), 1);
        assert_eq!(report.grace_warnings[0].days_remaining, 6);

        assert_eq!(store.list_accounts().unwrap().len(), 2);
    }

    #[test]
    fn manually_unlocked_trial_is_locked_again() {
        let store = MemoryStore::new();
        let now = Utc::now();
        store.put_account(&trial(1, -1, now)).unwrap();
        assert_eq!(run_lifecycle(&store, now).unwrap().locked_count, 1);

        let mut account = store.get_account(AccountId::new(1)).unwrap().unwrap();
        account.unlock(None, now).unwrap();
        store.put_account(&account).unwrap();
        assert_eq!(run_lifecycle(&store, now).unwrap().locked_count, 1);

        let mut account = store.get_account(AccountId::new(1)).unwrap().unwrap();
        account.unlock(Some(14), now).unwrap();
        store.put_account(&account).unwrap();
        assert_eq!(run_lifecycle(&store, now).unwrap().locked_count, 0);
    }

    #[test]
    fn days_round_up() {
        let now = Utc::now();
        assert_eq!(days_until(now, now), 0);
        assert_eq!(days_until(now, now + ChronoDuration::seconds(1)), 1);
        assert_eq!(days_until(now, now + ChronoDuration::days(2)), 2);
    }

    #[tokio::test]
    async fn job_runs_serialize() {
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        let now = Utc::now();
        store.put_account(&trial(1, -1, now)).unwrap();
        let job = Arc::new(BillingLifecycleJob::new(store));

        let (a, b) = tokio::join!(job.run(now), job.run(now));
        let total = a.unwrap().locked_count + b.unwrap().locked_count;
        assert_eq!(total, 1);
    }
}
