use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{double_option, merge, require_non_empty, Reference, Table, TenantRecord};
use crate::error::Result;
use crate::{AccountId, ContactId, DealId, TaskId, UserId};

/// Task progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Not started.
    #[default]
    Open,
    /// Being worked on.
    InProgress,
    /// Finished.
    Done,
}

/// Task priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskPriority {
    /// Low.
    Low,
    /// Medium.
    #[default]
    Medium,
    /// High.
    High,
}

/// A follow-up item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    /// Task id.
    pub id: TaskId,
    /// Owning account.
    pub account_id: AccountId,
    /// Title.
    pub title: String,
    /// Longer description.
    pub description: Option<String>,
    /// Due time.
    pub due_date: Option<DateTime<Utc>>,
    /// Progress.
    pub status: TaskStatus,
    /// Priority.
    pub priority: TaskPriority,
    /// Related deal.
    pub deal_id: Option<DealId>,
    /// Related contact.
    pub contact_id: Option<ContactId>,
    /// Assignee.
    pub assigned_to_id: Option<UserId>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last update time.
    pub updated_at: DateTime<Utc>,
}

impl Task {
    /// Whether the task is past due and not done.
    #[must_use]
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        self.status != TaskStatus::Done && self.due_date.is_some_and(|due| due < now)
    }
}

/// Create payload for a task.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewTask {
    /// Title.
    pub title: String,
    /// Description.
    #[serde(default)]
    pub description: Option<String>,
    /// Due time.
    #[serde(default)]
    pub due_date: Option<DateTime<Utc>>,
    /// Progress.
    #[serde(default)]
    pub status: TaskStatus,
    /// Priority.
    #[serde(default)]
    pub priority: TaskPriority,
    /// Related deal.
    #[serde(default)]
    pub deal_id: Option<DealId>,
    /// Related contact.
    #[serde(default)]
    pub contact_id: Option<ContactId>,
    /// Assignee.
    #[serde(default)]
    pub assigned_to_id: Option<UserId>,
}

/// Partial update for a task.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaskUpdate {
    /// New title.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// New description (`null` clears).
    #[serde(default, deserialize_with = "double_option", skip_serializing_if = "Option::is_none")]
    pub description: Option<Option<String>>,
    /// New due time (`null` clears).
    #[serde(default, deserialize_with = "double_option", skip_serializing_if = "Option::is_none")]
    pub due_date: Option<Option<DateTime<Utc>>>,
    /// New status.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<TaskStatus>,
    /// New priority.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<TaskPriority>,
    /// New deal (`null` clears).
    #[serde(default, deserialize_with = "double_option", skip_serializing_if = "Option::is_none")]
    pub deal_id: Option<Option<DealId>>,
    /// New contact (`null` clears).
    #[serde(default, deserialize_with = "double_option", skip_serializing_if = "Option::is_none")]
    pub contact_id: Option<Option<ContactId>>,
    /// New assignee (`null` clears).
    #[serde(default, deserialize_with = "double_option", skip_serializing_if = "Option::is_none")]
    pub assigned_to_id: Option<Option<UserId>>,
}

impl TenantRecord for Task {
    type Id = TaskId;
    type Create = NewTask;
    type Patch = TaskUpdate;

    const TABLE: Table = Table::Tasks;
    const ENTITY: &'static str = "task";

    fn id(&self) -> TaskId {
        self.id
    }

    fn build(id: TaskId, account_id: AccountId, input: NewTask, now: DateTime<Utc>) -> Self {
        Self {
            id,
            account_id,
            title: input.title,
            description: input.description,
            due_date: input.due_date,
            status: input.status,
            priority: input.priority,
            deal_id: input.deal_id,
            contact_id: input.contact_id,
            assigned_to_id: input.assigned_to_id,
            created_at: now,
            updated_at: now,
        }
    }

    fn apply(&mut self, patch: TaskUpdate, now: DateTime<Utc>) {
        merge(&mut self.title, patch.title);
        merge(&mut self.description, patch.description);
        merge(&mut self.due_date, patch.due_date);
        merge(&mut self.status, patch.status);
        merge(&mut self.priority, patch.priority);
        merge(&mut self.deal_id, patch.deal_id);
        merge(&mut self.contact_id, patch.contact_id);
        merge(&mut self.assigned_to_id, patch.assigned_to_id);
        self.updated_at = now;
    }

    fn validate(&self) -> Result<()> {
        require_non_empty("title", &self.title)
    }

    fn references(&self) -> Vec<Reference> {
        let mut refs = Vec::new();
        refs.extend(self.deal_id.map(Reference::Deal));
        refs.extend(self.contact_id.map(Reference::Contact));
        refs.extend(self.assigned_to_id.map(Reference::User));
        refs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn overdue_only_when_open_and_past_due() {
        let now = Utc::now();
        let mut task = Task::build(
            TaskId::new(1),
            AccountId::new(1),
            NewTask {
                title: "Call back".into(),
                due_date: Some(now - Duration::hours(1)),
                ..NewTask::default()
            },
            now,
        );
        assert!(task.is_overdue(now));

        task.status = TaskStatus::Done;
        assert!(!task.is_overdue(now));
    }
}
