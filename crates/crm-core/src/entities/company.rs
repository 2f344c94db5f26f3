use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{double_option, merge, require_non_empty, Table, TenantRecord};
use crate::error::Result;
use crate::{AccountId, CompanyId};

/// A customer company tracked by a tenant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Company {
    /// Company id.
    pub id: CompanyId,
    /// Owning account.
    pub account_id: AccountId,
    /// Company name.
    pub name: String,
    /// Industry.
    pub industry: Option<String>,
    /// Website URL.
    pub website: Option<String>,
    /// Phone number.
    pub phone: Option<String>,
    /// Postal address.
    pub address: Option<String>,
    /// Free-form notes.
    pub notes: Option<String>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last update time.
    pub updated_at: DateTime<Utc>,
}

/// Create payload for a company.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewCompany {
    /// Company name.
    pub name: String,
    /// Industry.
    #[serde(default)]
    pub industry: Option<String>,
    /// Website URL.
    #[serde(default)]
    pub website: Option<String>,
    /// Phone number.
    #[serde(default)]
    pub phone: Option<String>,
    /// Postal address.
    #[serde(default)]
    pub address: Option<String>,
    /// Free-form notes.
    #[serde(default)]
    pub notes: Option<String>,
}

/// Partial update for a company.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CompanyUpdate {
    /// New name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// New industry (`null` clears).
    #[serde(default, deserialize_with = "double_option", skip_serializing_if = "Option::is_none")]
    pub industry: Option<Option<String>>,
    /// New website (`null` clears).
    #[serde(default, deserialize_with = "double_option", skip_serializing_if = "Option::is_none")]
    pub website: Option<Option<String>>,
    /// New phone (`null` clears).
    #[serde(default, deserialize_with = "double_option", skip_serializing_if = "Option::is_none")]
    pub phone: Option<Option<String>>,
    /// New address (`null` clears).
    #[serde(default, deserialize_with = "double_option", skip_serializing_if = "Option::is_none")]
    pub address: Option<Option<String>>,
    /// New notes (`null` clears).
    #[serde(default, deserialize_with = "double_option", skip_serializing_if = "Option::is_none")]
    pub notes: Option<Option<String>>,
}

impl TenantRecord for Company {
    type Id = CompanyId;
    type Create = NewCompany;
    type Patch = CompanyUpdate;

    const TABLE: Table = Table::Companies;
    const ENTITY: &'static str = "company";

    fn id(&self) -> CompanyId {
        self.id
    }

    fn build(id: CompanyId, account_id: AccountId, input: NewCompany, now: DateTime<Utc>) -> Self {
        Self {
            id,
            account_id,
            name: input.name,
            industry: input.industry,
            website: input.website,
            phone: input.phone,
            address: input.address,
            notes: input.notes,
            created_at: now,
            updated_at: now,
        }
    }

    fn apply(&mut self, patch: CompanyUpdate, now: DateTime<Utc>) {
        merge(&mut self.name, patch.name);
        merge(&mut self.industry, patch.industry);
        merge(&mut self.website, patch.website);
        merge(&mut self.phone, patch.phone);
        merge(&mut self.address, patch.address);
        merge(&mut self.notes, patch.notes);
        self.updated_at = now;
    }

    fn validate(&self) -> Result<()> {
        require_non_empty("name", &self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_supplied_account_id_is_dropped() {
        let input: NewCompany =
            serde_json::from_str(r#"{"name": "Globex", "account_id": 99}"#).unwrap();
        let company = Company::build(CompanyId::new(1), AccountId::new(7), input, Utc::now());
        assert_eq!(company.account_id, AccountId::new(7));
    }

    #[test]
    fn patch_preserves_absent_and_clears_null() {
        let now = Utc::now();
        let mut company = Company::build(
            CompanyId::new(1),
            AccountId::new(7),
            NewCompany {
                name: "Globex".into(),
                industry: Some("Energy".into()),
                website: Some("https://globex.test".into()),
                ..NewCompany::default()
            },
            now,
        );

        let patch: CompanyUpdate =
            serde_json::from_str(r#"{"name": "Globex Corp", "website": null}"#).unwrap();
        company.apply(patch, now);

        assert_eq!(company.name, "Globex Corp");
        assert_eq!(company.industry.as_deref(), Some("Energy"));
        assert!(company.website.is_none());
    }

    #[test]
    fn blank_name_is_invalid() {
        let company = Company::build(
            CompanyId::new(1),
            AccountId::new(7),
            NewCompany {
                name: "  ".into(),
                ..NewCompany::default()
            },
            Utc::now(),
        );
        assert!(company.validate().is_err());
    }
}
