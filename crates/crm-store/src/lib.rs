//! Storage layer for the multi-tenant CRM.
//!
//! This crate persists accounts and tenant-owned records. Every tenant record is
//! stored under a [`RecordKey`] whose first component is the owning account, so
//! a lookup for one tenant can never observe a row belonging to another.
//!
//! # Architecture
//!
//! The raw [`Store`] trait deals in CBOR-encoded bytes and is implemented by:
//!
//! - [`MemoryStore`]: `BTreeMap`s behind a lock, used by tests and ephemeral runs
//! - `RocksStore`: `RocksDB` column families (feature `rocksdb-backend`)
//!
//! Typed access goes through [`TenantRepository`], which stamps the tenant on
//! create, validates records and their cross-record references, and takes a
//! [`TenantScope`](crm_core::TenantScope) for listings.
//!
//! # Example
//!
//! ```
//! use chrono::Utc;
//! use crm_core::{Account, AccountId, Company, NewCompany, TenantScope};
//! use crm_store::{MemoryStore, Store, TenantRepository};
//!
//! let store = MemoryStore::new();
//! let account = Account::new_trial(AccountId::new(1), "Acme", Utc::now());
//! store.put_account(&account).unwrap();
//!
//! let companies = TenantRepository::<Company>::new(&store);
//! let created = companies
//!     .create(NewCompany { name: "Globex".into(), ..NewCompany::default() }, account.id)
//!     .unwrap();
//! assert_eq!(created.account_id, account.id);
//! assert_eq!(companies.list(TenantScope::Account(account.id)).unwrap().len(), 1);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod codec;
pub mod error;
pub mod keys;
pub mod memory;
pub mod repository;
#[cfg(feature = "rocksdb-backend")]
pub mod rocks;
pub mod schema;

use std::collections::HashMap;

pub use error::{Result, StoreError};
pub use keys::{RecordKey, Sequence};
pub use memory::MemoryStore;
pub use repository::{TenantRepository, UserDirectory};
#[cfg(feature = "rocksdb-backend")]
pub use rocks::RocksStore;

use crm_core::{Account, AccountId, Table};

/// The storage trait defining all database operations.
///
/// Implementations must be safe to share between request handlers and the
/// billing lifecycle job.
pub trait Store: Send + Sync {
    // =========================================================================
    // Sequences
    // =========================================================================

    /// Allocate the next id of a sequence. Ids start at 1 and are never reused.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn next_id(&self, sequence: Sequence) -> Result<i64>;

    // =========================================================================
    // Account Operations
    // =========================================================================

    /// Insert or update an account record.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn put_account(&self, account: &Account) -> Result<()>;

    /// Get an account by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn get_account(&self, id: AccountId) -> Result<Option<Account>>;

    /// List all accounts ordered by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn list_accounts(&self) -> Result<Vec<Account>>;

    /// Delete an account together with every record it owns.
    ///
    /// Returns `false` if the account did not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn purge_account(&self, id: AccountId) -> Result<bool>;

    // =========================================================================
    // Record Operations
    // =========================================================================

    /// Get the encoded record stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn get_record(&self, table: Table, key: RecordKey) -> Result<Option<Vec<u8>>>;

    /// Insert or overwrite the encoded record stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn put_record(&self, table: Table, key: RecordKey, value: Vec<u8>) -> Result<()>;

    /// Delete a record. Returns `false` if nothing was stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn delete_record(&self, table: Table, key: RecordKey) -> Result<bool>;

    /// Scan records in key order.
    ///
    /// With `Some(account)` only that tenant's partition is visited; with
    /// `None` the whole table is scanned, platform rows included.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn scan_records(
        &self,
        table: Table,
        account: Option<AccountId>,
    ) -> Result<Vec<(RecordKey, Vec<u8>)>>;

    /// Count the records one tenant owns in a table.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn count_records(&self, table: Table, account: AccountId) -> Result<u64>;

    /// Count records per owning tenant. Platform rows are not included.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn count_records_by_account(&self, table: Table) -> Result<HashMap<AccountId, u64>>;
}
