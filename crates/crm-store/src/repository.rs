//! Typed, tenant-scoped access to stored records.
//!
//! Every operation except [`TenantRepository::list`] with
//! [`TenantScope::AllTenants`] takes the resolved account and touches only that
//! tenant's partition. A record belonging to another tenant is indistinguishable
//! from one that does not exist.

use std::collections::HashMap;
use std::marker::PhantomData;

use chrono::{DateTime, Utc};

use crm_core::{
    AccountId, CrmError, RecordId, Result, Table, TenantRecord, TenantScope, User, UserId,
};

use crate::codec;
use crate::keys::{RecordKey, Sequence};
use crate::Store;

/// Repository for one kind of tenant record.
pub struct TenantRepository<'a, T> {
    store: &'a dyn Store,
    _record: PhantomData<fn() -> T>,
}

impl<'a, T: TenantRecord> TenantRepository<'a, T> {
    /// Wrap a store.
    #[must_use]
    pub fn new(store: &'a dyn Store) -> Self {
        Self {
            store,
            _record: PhantomData,
        }
    }

    /// List records visible in `scope`, ordered by owning account then id.
    ///
    /// # Errors
    ///
    /// Returns `CrmError::Storage` if the store fails or a row cannot be decoded.
    pub fn list(&self, scope: TenantScope) -> Result<Vec<T>> {
        let partition = match scope {
            TenantScope::Account(account) => Some(account),
            TenantScope::AllTenants(_) => None,
        };
        self.store
            .scan_records(T::TABLE, partition)?
            .into_iter()
            .filter(|(key, _)| key.account().is_some())
            .map(|(_, value)| codec::decode(&value).map_err(CrmError::from))
            .collect()
    }

    /// Fetch one record of `account`.
    ///
    /// # Errors
    ///
    /// Returns `CrmError::Storage` if the store fails.
    pub fn get(&self, id: T::Id, account: AccountId) -> Result<Option<T>> {
        self.store
            .get_record(T::TABLE, RecordKey::tenant(account, id.raw()))?
            .map(|value| codec::decode(&value).map_err(CrmError::from))
            .transpose()
    }

    /// Create a record owned by `account`.
    ///
    /// # Errors
    ///
    /// - `CrmError::Validation` if the record is malformed.
    /// - `CrmError::InvalidReference` if it points at a record the tenant does not own.
    /// - `CrmError::Storage` if the store fails.
    pub fn create(&self, input: T::Create, account: AccountId) -> Result<T> {
        self.create_at(input, account, Utc::now())
    }

    /// Create a record with an explicit creation time.
    ///
    /// # Errors
    ///
    /// Same as [`create`](Self::create).
    pub fn create_at(&self, input: T::Create, account: AccountId, now: DateTime<Utc>) -> Result<T> {
        let id = self.store.next_id(Sequence::Records(T::TABLE))?;
        let record = T::build(T::Id::from_raw(id), account, input, now);
        self.check(&record, account)?;
        self.write(&record, account)?;
        tracing::debug!(entity = T::ENTITY, id, account_id = %account, "record created");
        Ok(record)
    }

    /// Apply a partial update to a record of `account`.
    ///
    /// Returns `None` if the tenant has no such record.
    ///
    /// # Errors
    ///
    /// Same as [`create`](Self::create).
    pub fn update(&self, id: T::Id, patch: T::Patch, account: AccountId) -> Result<Option<T>> {
        let Some(mut record) = self.get(id, account)? else {
            return Ok(None);
        };
        record.apply(patch, Utc::now());
        self.check(&record, account)?;
        self.write(&record, account)?;
        Ok(Some(record))
    }

    /// Delete a record of `account`. Returns `false` if the tenant has no such record.
    ///
    /// # Errors
    ///
    /// Returns `CrmError::Storage` if the store fails.
    pub fn delete(&self, id: T::Id, account: AccountId) -> Result<bool> {
        let deleted = self
            .store
            .delete_record(T::TABLE, RecordKey::tenant(account, id.raw()))?;
        if deleted {
            tracing::debug!(entity = T::ENTITY, id = %id, account_id = %account, "record deleted");
        }
        Ok(deleted)
    }

    /// Number of records `account` owns.
    ///
    /// # Errors
    ///
    /// Returns `CrmError::Storage` if the store fails.
    pub fn count(&self, account: AccountId) -> Result<u64> {
        Ok(self.store.count_records(T::TABLE, account)?)
    }

    /// Number of records per tenant.
    ///
    /// # Errors
    ///
    /// Returns `CrmError::Storage` if the store fails.
    pub fn count_by_account(&self) -> Result<HashMap<AccountId, u64>> {
        Ok(self.store.count_records_by_account(T::TABLE)?)
    }

    fn check(&self, record: &T, account: AccountId) -> Result<()> {
        record.validate()?;
        for reference in record.references() {
            let key = RecordKey::tenant(account, reference.raw_id());
            if self.store.get_record(reference.table(), key)?.is_none() {
                return Err(CrmError::InvalidReference {
                    entity: reference.entity(),
                    id: reference.raw_id(),
                });
            }
        }
        Ok(())
    }

    fn write(&self, record: &T, account: AccountId) -> Result<()> {
        let key = RecordKey::tenant(account, record.id().raw());
        self.store.put_record(T::TABLE, key, codec::encode(record)?)?;
        Ok(())
    }
}

/// Platform-wide view of users, for login and uniqueness checks.
///
/// Logins are not tenant-scoped: a user is found by email or username before
/// their tenant is known.
pub struct UserDirectory<'a> {
    store: &'a dyn Store,
}

impl<'a> UserDirectory<'a> {
    /// Wrap a store.
    #[must_use]
    pub fn new(store: &'a dyn Store) -> Self {
        Self { store }
    }

    fn all(&self) -> Result<Vec<User>> {
        self.store
            .scan_records(Table::Users, None)?
            .into_iter()
            .map(|(_, value)| codec::decode(&value).map_err(CrmError::from))
            .collect()
    }

    /// Find a user by email (case-insensitive) or username.
    ///
    /// # Errors
    ///
    /// Returns `CrmError::Storage` if the store fails.
    pub fn find_by_login(&self, login: &str) -> Result<Option<User>> {
        Ok(self.all()?.into_iter().find(|user| user.matches_login(login)))
    }

    /// Find a user by id, whatever tenant they belong to.
    ///
    /// # Errors
    ///
    /// Returns `CrmError::Storage` if the store fails.
    pub fn find_by_id(&self, id: UserId, account: Option<AccountId>) -> Result<Option<User>> {
        let key = match account {
            Some(account) => RecordKey::tenant(account, id.raw()),
            None => RecordKey::platform(id.raw()),
        };
        self.store
            .get_record(Table::Users, key)?
            .map(|value| codec::decode(&value).map_err(CrmError::from))
            .transpose()
    }

    /// Fail with `CrmError::Conflict` if another user already has this email or
    /// username.
    ///
    /// Logins match either column, so the new email is also checked against
    /// existing usernames and the new username against existing emails.
    ///
    /// # Errors
    ///
    /// Returns `CrmError::Conflict` on a clash, `CrmError::Storage` if the store fails.
    pub fn ensure_unique(&self, email: &str, username: &str, except: Option<UserId>) -> Result<()> {
        for user in self.all()? {
            if Some(user.id) == except {
                continue;
            }
            if user.matches_login(email) {
                return Err(CrmError::Conflict(format!("email {email} is already registered")));
            }
            if user.matches_login(username) {
                return Err(CrmError::Conflict(format!("username {username} is taken")));
            }
        }
        Ok(())
    }

    /// Whether any platform super admin exists.
    ///
    /// # Errors
    ///
    /// Returns `CrmError::Storage` if the store fails.
    pub fn has_super_admin(&self) -> Result<bool> {
        Ok(self
            .store
            .scan_records(Table::Users, None)?
            .iter()
            .any(|(key, _)| key.account().is_none()))
    }

    /// Store a new platform super admin.
    ///
    /// # Errors
    ///
    /// Returns `CrmError::Conflict` if the email or username is taken,
    /// `CrmError::Storage` if the store fails.
    pub fn create_super_admin(
        &self,
        email: &str,
        username: &str,
        password_hash: &str,
    ) -> Result<User> {
        self.ensure_unique(email, username, None)?;
        let id = self.store.next_id(Sequence::Records(Table::Users))?;
        let user = User::super_admin(UserId::new(id), email, username, password_hash, Utc::now());
        user.validate()?;
        self.store.put_record(
            Table::Users,
            RecordKey::platform(id),
            codec::encode(&user)?,
        )?;
        tracing::info!(user_id = id, email, "super admin created");
        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryStore;
    use crm_core::{
        Company, CompanyId, Contact, Deal, DealUpdate, NewCompany, NewContact, NewDeal, NewUser,
        Role, SuperAdminGrant,
    };

    const ACME: AccountId = AccountId::new(1);
    const GLOBEX: AccountId = AccountId::new(2);

    fn company(name: &str) -> NewCompany {
        NewCompany {
            name: name.into(),
            ..NewCompany::default()
        }
    }

    fn super_admin_grant() -> SuperAdminGrant {
        let admin = User::super_admin(UserId::new(1), "root@crm.test", "root", "hash", Utc::now());
        admin.principal().super_admin_grant().unwrap()
    }

    #[test]
    fn create_stamps_the_resolved_account() {
        let store = MemoryStore::new();
        let repo = TenantRepository::<Company>::new(&store);

        let created = repo.create(company("Initech"), ACME).unwrap();
        assert_eq!(created.account_id, ACME);
        assert_eq!(repo.get(created.id, ACME).unwrap(), Some(created));
    }

    #[test]
    fn other_tenants_rows_are_invisible() {
        let store = MemoryStore::new();
        let repo = TenantRepository::<Company>::new(&store);
        let theirs = repo.create(company("Hooli"), GLOBEX).unwrap();

        assert!(repo.get(theirs.id, ACME).unwrap().is_none());
        assert!(repo
            .update(theirs.id, crm_core::CompanyUpdate::default(), ACME)
            .unwrap()
            .is_none());
        assert!(!repo.delete(theirs.id, ACME).unwrap());
        assert!(repo.list(TenantScope::Account(ACME)).unwrap().is_empty());
        assert_eq!(repo.count(GLOBEX).unwrap(), 1);
    }

    #[test]
    fn all_tenants_scope_lists_everything() {
        let store = MemoryStore::new();
        let repo = TenantRepository::<Company>::new(&store);
        repo.create(company("A"), ACME).unwrap();
        repo.create(company("B"), GLOBEX).unwrap();

        let all = repo.list(TenantScope::AllTenants(super_admin_grant())).unwrap();
        assert_eq!(all.len(), 2);

        let counts = repo.count_by_account().unwrap();
        assert_eq!(counts[&ACME], 1);
        assert_eq!(counts[&GLOBEX], 1);
    }

    #[test]
    fn references_must_belong_to_the_tenant() {
        let store = MemoryStore::new();
        let companies = TenantRepository::<Company>::new(&store);
        let contacts = TenantRepository::<Contact>::new(&store);
        let theirs = companies.create(company("Hooli"), GLOBEX).unwrap();

        let result = contacts.create(
            NewContact {
                first_name: "Ann".into(),
                company_id: Some(theirs.id),
                ..NewContact::default()
            },
            ACME,
        );
        assert!(matches!(
            result,
            Err(CrmError::InvalidReference { entity: "company", .. })
        ));
        assert_eq!(contacts.count(ACME).unwrap(), 0);

        let ours = companies.create(company("Initech"), ACME).unwrap();
        let contact = contacts
            .create(
                NewContact {
                    first_name: "Ann".into(),
                    company_id: Some(ours.id),
                    ..NewContact::default()
                },
                ACME,
            )
            .unwrap();
        assert_eq!(contact.company_id, Some(ours.id));
    }

    #[test]
    fn update_keeps_absent_fields_and_checks_references() {
        let store = MemoryStore::new();
        let deals = TenantRepository::<Deal>::new(&store);
        let deal = deals
            .create(
                NewDeal {
                    title: "Pilot".into(),
                    value_cents: 10_000,
                    ..NewDeal::default()
                },
                ACME,
            )
            .unwrap();

        let patch: DealUpdate = serde_json::from_str(r#"{"value_cents": 12000}"#).unwrap();
        let updated = deals.update(deal.id, patch, ACME).unwrap().unwrap();
        assert_eq!(updated.title, "Pilot");
        assert_eq!(updated.value_cents, 12_000);
        assert_eq!(updated.account_id, ACME);

        let patch = DealUpdate {
            company_id: Some(Some(CompanyId::new(99))),
            ..DealUpdate::default()
        };
        assert!(matches!(
            deals.update(deal.id, patch, ACME),
            Err(CrmError::InvalidReference { id: 99, .. })
        ));
        assert_eq!(deals.get(deal.id, ACME).unwrap().unwrap().company_id, None);
    }

    #[test]
    fn invalid_records_are_not_written() {
        let store = MemoryStore::new();
        let repo = TenantRepository::<Company>::new(&store);
        assert!(matches!(
            repo.create(company("  "), ACME),
            Err(CrmError::Validation(_))
        ));
        assert_eq!(repo.count(ACME).unwrap(), 0);
    }

    #[test]
    fn directory_finds_users_across_tenants() {
        let store = MemoryStore::new();
        let users = TenantRepository::<User>::new(&store);
        let directory = UserDirectory::new(&store);

        let admin = directory.create_super_admin("root@crm.test", "root", "hash").unwrap();
        let jane = users
            .create(
                NewUser {
                    email: "jane@acme.test".into(),
                    username: "jane".into(),
                    password_hash: "hash".into(),
                    role: Role::CompanyAdmin,
                },
                ACME,
            )
            .unwrap();

        assert_eq!(directory.find_by_login("JANE@acme.test").unwrap(), Some(jane.clone()));
        assert_eq!(directory.find_by_login("root").unwrap(), Some(admin.clone()));
        assert_eq!(directory.find_by_id(jane.id, Some(ACME)).unwrap(), Some(jane.clone()));
        assert_eq!(directory.find_by_id(admin.id, None).unwrap(), Some(admin));
        assert!(directory.has_super_admin().unwrap());

        // Platform rows never show up in tenant listings.
        let all = users.list(TenantScope::AllTenants(super_admin_grant())).unwrap();
        assert_eq!(all, vec![jane.clone()]);

        assert!(matches!(
            directory.ensure_unique("jane@ACME.test", "other", None),
            Err(CrmError::Conflict(_))
        ));
        assert!(directory.ensure_unique("jane@acme.test", "jane", Some(jane.id)).is_ok());

        // Email and username share one login namespace.
        assert!(matches!(
            directory.ensure_unique("jane", "someone", None),
            Err(CrmError::Conflict(_))
        ));
        assert!(matches!(
            directory.ensure_unique("someone@acme.test", "JANE@acme.test", None),
            Err(CrmError::Conflict(_))
        ));
        assert!(directory.ensure_unique("someone@acme.test", "someone", None).is_ok());
    }
}
