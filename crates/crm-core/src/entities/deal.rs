use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::{double_option, merge, require_non_empty, Reference, Table, TenantRecord};
use crate::error::{CrmError, Result};
use crate::{AccountId, CompanyId, ContactId, DealId, UserId};

/// Sales pipeline stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DealStage {
    /// New opportunity.
    #[default]
    Lead,
    /// Qualified opportunity.
    Qualified,
    /// Proposal sent.
    Proposal,
    /// Under negotiation.
    Negotiation,
    /// Closed, won.
    Won,
    /// Closed, lost.
    Lost,
}

impl DealStage {
    /// All stages in pipeline order.
    pub const ALL: [DealStage; 6] = [
        Self::Lead,
        Self::Qualified,
        Self::Proposal,
        Self::Negotiation,
        Self::Won,
        Self::Lost,
    ];

    /// Whether the deal is closed.
    #[must_use]
    pub const fn is_closed(self) -> bool {
        matches!(self, Self::Won | Self::Lost)
    }
}

/// A sales opportunity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deal {
    /// Deal id.
    pub id: DealId,
    /// Owning account.
    pub account_id: AccountId,
    /// Deal title.
    pub title: String,
    /// Expected value in cents.
    pub value_cents: i64,
    /// Pipeline stage.
    pub stage: DealStage,
    /// Customer company.
    pub company_id: Option<CompanyId>,
    /// Main contact.
    pub contact_id: Option<ContactId>,
    /// Responsible user.
    pub assigned_to_id: Option<UserId>,
    /// Expected close date.
    pub expected_close_date: Option<NaiveDate>,
    /// Free-form notes.
    pub notes: Option<String>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last update time.
    pub updated_at: DateTime<Utc>,
}

/// Create payload for a deal.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewDeal {
    /// Deal title.
    pub title: String,
    /// Expected value in cents.
    #[serde(default)]
    pub value_cents: i64,
    /// Pipeline stage.
    #[serde(default)]
    pub stage: DealStage,
    /// Customer company.
    #[serde(default)]
    pub company_id: Option<CompanyId>,
    /// Main contact.
    #[serde(default)]
    pub contact_id: Option<ContactId>,
    /// Responsible user.
    #[serde(default)]
    pub assigned_to_id: Option<UserId>,
    /// Expected close date.
    #[serde(default)]
    pub expected_close_date: Option<NaiveDate>,
    /// Free-form notes.
    #[serde(default)]
    pub notes: Option<String>,
}

/// Partial update for a deal.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DealUpdate {
    /// New title.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// New value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_cents: Option<i64>,
    /// New stage.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stage: Option<DealStage>,
    /// New company (`null` clears).
    #[serde(default, deserialize_with = "double_option", skip_serializing_if = "Option::is_none")]
    pub company_id: Option<Option<CompanyId>>,
    /// New contact (`null` clears).
    #[serde(default, deserialize_with = "double_option", skip_serializing_if = "Option::is_none")]
    pub contact_id: Option<Option<ContactId>>,
    /// New assignee (`null` clears).
    #[serde(default, deserialize_with = "double_option", skip_serializing_if = "Option::is_none")]
    pub assigned_to_id: Option<Option<UserId>>,
    /// New expected close date (`null` clears).
    #[serde(default, deserialize_with = "double_option", skip_serializing_if = "Option::is_none")]
    pub expected_close_date: Option<Option<NaiveDate>>,
    /// New notes (`null` clears).
    #[serde(default, deserialize_with = "double_option", skip_serializing_if = "Option::is_none")]
    pub notes: Option<Option<String>>,
}

impl TenantRecord for Deal {
    type Id = DealId;
    type Create = NewDeal;
    type Patch = DealUpdate;

    const TABLE: Table = Table::Deals;
    const ENTITY: &'static str = "deal";

    fn id(&self) -> DealId {
        self.id
    }

    fn build(id: DealId, account_id: AccountId, input: NewDeal, now: DateTime<Utc>) -> Self {
        Self {
            id,
            account_id,
            title: input.title,
            value_cents: input.value_cents,
            stage: input.stage,
            company_id: input.company_id,
            contact_id: input.contact_id,
            assigned_to_id: input.assigned_to_id,
            expected_close_date: input.expected_close_date,
            notes: input.notes,
            created_at: now,
            updated_at: now,
        }
    }

    fn apply(&mut self, patch: DealUpdate, now: DateTime<Utc>) {
        merge(&mut self.title, patch.title);
        merge(&mut self.value_cents, patch.value_cents);
        merge(&mut self.stage, patch.stage);
        merge(&mut self.company_id, patch.company_id);
        merge(&mut self.contact_id, patch.contact_id);
        merge(&mut self.assigned_to_id, patch.assigned_to_id);
        merge(&mut self.expected_close_date, patch.expected_close_date);
        merge(&mut self.notes, patch.notes);
        self.updated_at = now;
    }

    fn validate(&self) -> Result<()> {
        require_non_empty("title", &self.title)?;
        if self.value_cents < 0 {
            return Err(CrmError::Validation("value_cents must not be negative".into()));
        }
        Ok(())
    }

    fn references(&self) -> Vec<Reference> {
        let mut refs = Vec::new();
        refs.extend(self.company_id.map(Reference::Company));
        refs.extend(self.contact_id.map(Reference::Contact));
        refs.extend(self.assigned_to_id.map(Reference::User));
        refs
    }
}
