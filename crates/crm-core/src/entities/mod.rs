//! Tenant-owned CRM entities.
//!
//! Every entity is stored under its owning account. Create payloads carry no
//! `account_id` field: the repository stamps the resolved tenant, and an
//! `account_id` supplied by a client is dropped during deserialization.
//! Update payloads are partial; absent fields are preserved.

mod company;
mod contact;
mod deal;
mod task;
mod user;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{CrmError, Result};
use crate::ids::RecordId;
use crate::{AccountId, CompanyId, ContactId, DealId, UserId};

pub use company::{Company, CompanyUpdate, NewCompany};
pub use contact::{Contact, ContactUpdate, NewContact};
pub use deal::{Deal, DealStage, DealUpdate, NewDeal};
pub use task::{NewTask, Task, TaskPriority, TaskStatus, TaskUpdate};
pub use user::{NewUser, User, UserProfile, UserUpdate};

/// Storage tables for tenant-owned records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Table {
    /// Users (tenant users and platform super admins).
    Users,
    /// Companies.
    Companies,
    /// Contacts.
    Contacts,
    /// Deals.
    Deals,
    /// Tasks.
    Tasks,
}

impl Table {
    /// All tenant tables.
    pub const ALL: [Table; 5] = [
        Self::Users,
        Self::Companies,
        Self::Contacts,
        Self::Deals,
        Self::Tasks,
    ];

    /// Table name, also used in URLs of the super-admin overview.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Users => "users",
            Self::Companies => "companies",
            Self::Contacts => "contacts",
            Self::Deals => "deals",
            Self::Tasks => "tasks",
        }
    }

    /// Parse a table name.
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|table| table.as_str() == name)
    }
}

/// A reference from one tenant record to another.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reference {
    /// A company.
    Company(CompanyId),
    /// A contact.
    Contact(ContactId),
    /// A deal.
    Deal(DealId),
    /// A user.
    User(UserId),
}

impl Reference {
    /// Table holding the referenced record.
    #[must_use]
    pub const fn table(self) -> Table {
        match self {
            Self::Company(_) => Table::Companies,
            Self::Contact(_) => Table::Contacts,
            Self::Deal(_) => Table::Deals,
            Self::User(_) => Table::Users,
        }
    }

    /// Raw id of the referenced record.
    #[must_use]
    pub fn raw_id(self) -> i64 {
        match self {
            Self::Company(id) => id.raw(),
            Self::Contact(id) => id.raw(),
            Self::Deal(id) => id.raw(),
            Self::User(id) => id.raw(),
        }
    }

    /// Singular entity name.
    #[must_use]
    pub const fn entity(self) -> &'static str {
        match self {
            Self::Company(_) => "company",
            Self::Contact(_) => "contact",
            Self::Deal(_) => "deal",
            Self::User(_) => "user",
        }
    }
}

/// A record owned by a tenant, handled by the generic tenant repository.
pub trait TenantRecord: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// Identifier type.
    type Id: RecordId;
    /// Create payload.
    type Create: Send;
    /// Partial update payload.
    type Patch: Send;

    /// Table the records live in.
    const TABLE: Table;
    /// Singular entity name used in error messages.
    const ENTITY: &'static str;

    /// The record id.
    fn id(&self) -> Self::Id;

    /// Build a new record from its create payload.
    fn build(id: Self::Id, account_id: AccountId, input: Self::Create, now: DateTime<Utc>) -> Self;

    /// Merge a partial update over the record.
    fn apply(&mut self, patch: Self::Patch, now: DateTime<Utc>);

    /// Check the record is well-formed before it is written.
    ///
    /// # Errors
    ///
    /// Returns `CrmError::Validation` describing the first problem found.
    fn validate(&self) -> Result<()> {
        Ok(())
    }

    /// Other tenant records this record points at.
    fn references(&self) -> Vec<Reference> {
        Vec::new()
    }
}

/// Deserialize a field that distinguishes "absent" from "null".
///
/// Use with `#[serde(default, deserialize_with = "double_option")]`:
/// absent -> `None`, `null` -> `Some(None)`, value -> `Some(Some(v))`.
pub(crate) fn double_option<'de, T, D>(
    deserializer: D,
) -> std::result::Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Overwrite `target` if the patch carries a value.
pub(crate) fn merge<T>(target: &mut T, value: Option<T>) {
    if let Some(value) = value {
        *target = value;
    }
}

pub(crate) fn require_non_empty(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(CrmError::Validation(format!("{field} must not be empty")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_names_roundtrip() {
        for table in Table::ALL {
            assert_eq!(Table::parse(table.as_str()), Some(table));
        }
        assert_eq!(Table::parse("accounts"), None);
    }

    #[test]
    fn reference_points_at_table() {
        let reference = Reference::Company(CompanyId::new(4));
        assert_eq!(reference.table(), Table::Companies);
        assert_eq!(reference.raw_id(), 4);
        assert_eq!(reference.entity(), "company");
    }
}
