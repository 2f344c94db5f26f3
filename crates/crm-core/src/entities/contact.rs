use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{double_option, merge, require_non_empty, Reference, Table, TenantRecord};
use crate::error::Result;
use crate::{AccountId, CompanyId, ContactId};

/// A person at a customer company.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    /// Contact id.
    pub id: ContactId,
    /// Owning account.
    pub account_id: AccountId,
    /// First name.
    pub first_name: String,
    /// Last name.
    pub last_name: String,
    /// Email address.
    pub email: Option<String>,
    /// Phone number.
    pub phone: Option<String>,
    /// Job title.
    pub position: Option<String>,
    /// Employer, if tracked.
    pub company_id: Option<CompanyId>,
    /// Free-form notes.
    pub notes: Option<String>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last update time.
    pub updated_at: DateTime<Utc>,
}

impl Contact {
    /// "First Last".
    #[must_use]
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name).trim().to_string()
    }
}

/// Create payload for a contact.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewContact {
    /// First name.
    pub first_name: String,
    /// Last name.
    #[serde(default)]
    pub last_name: String,
    /// Email address.
    #[serde(default)]
    pub email: Option<String>,
    /// Phone number.
    #[serde(default)]
    pub phone: Option<String>,
    /// Job title.
    #[serde(default)]
    pub position: Option<String>,
    /// Employer.
    #[serde(default)]
    pub company_id: Option<CompanyId>,
    /// Free-form notes.
    #[serde(default)]
    pub notes: Option<String>,
}

/// Partial update for a contact.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContactUpdate {
    /// New first name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    /// New last name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    /// New email (`null` clears).
    #[serde(default, deserialize_with = "double_option", skip_serializing_if = "Option::is_none")]
    pub email: Option<Option<String>>,
    /// New phone (`null` clears).
    #[serde(default, deserialize_with = "double_option", skip_serializing_if = "Option::is_none")]
    pub phone: Option<Option<String>>,
    /// New job title (`null` clears).
    #[serde(default, deserialize_with = "double_option", skip_serializing_if = "Option::is_none")]
    pub position: Option<Option<String>>,
    /// New employer (`null` clears).
    #[serde(default, deserialize_with = "double_option", skip_serializing_if = "Option::is_none")]
    pub company_id: Option<Option<CompanyId>>,
    /// New notes (`null` clears).
    #[serde(default, deserialize_with = "double_option", skip_serializing_if = "Option::is_none")]
    pub notes: Option<Option<String>>,
}

impl TenantRecord for Contact {
    type Id = ContactId;
    type Create = NewContact;
    type Patch = ContactUpdate;

    const TABLE: Table = Table::Contacts;
    const ENTITY: &'static str = "contact";

    fn id(&self) -> ContactId {
        self.id
    }

    fn build(id: ContactId, account_id: AccountId, input: NewContact, now: DateTime<Utc>) -> Self {
        Self {
            id,
            account_id,
            first_name: input.first_name,
            last_name: input.last_name,
            email: input.email,
            phone: input.phone,
            position: input.position,
            company_id: input.company_id,
            notes: input.notes,
            created_at: now,
            updated_at: now,
        }
    }

    fn apply(&mut self, patch: ContactUpdate, now: DateTime<Utc>) {
        merge(&mut self.first_name, patch.first_name);
        merge(&mut self.last_name, patch.last_name);
        merge(&mut self.email, patch.email);
        merge(&mut self.phone, patch.phone);
        merge(&mut self.position, patch.position);
        merge(&mut self.company_id, patch.company_id);
        merge(&mut self.notes, patch.notes);
        self.updated_at = now;
    }

    fn validate(&self) -> Result<()> {
        require_non_empty("first_name", &self.first_name)
    }

    fn references(&self) -> Vec<Reference> {
        self.company_id.map(Reference::Company).into_iter().collect()
    }
}
