//! `RocksDB` storage implementation.
//!
//! This module provides the `RocksStore` implementation of the `Store` trait.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use parking_lot::Mutex;
use rocksdb::{
    BoundColumnFamily, ColumnFamilyDescriptor, DBWithThreadMode, Direction, IteratorMode,
    MultiThreaded, Options, WriteBatch,
};

use crm_core::{Account, AccountId, Table};

use crate::codec;
use crate::error::{Result, StoreError};
use crate::keys::{self, RecordKey, Sequence};
use crate::schema::{all_column_families, cf, table_cf};
use crate::Store;

/// RocksDB-backed storage implementation.
pub struct RocksStore {
    db: Arc<DBWithThreadMode<MultiThreaded>>,
    sequence_lock: Mutex<()>,
}

impl RocksStore {
    /// Open or create a `RocksDB` database at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or created.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cf_descriptors: Vec<_> = all_column_families()
            .into_iter()
            .map(|name| ColumnFamilyDescriptor::new(name, Options::default()))
            .collect();

        let db = DBWithThreadMode::open_cf_descriptors(&opts, path, cf_descriptors)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(Self {
            db: Arc::new(db),
            sequence_lock: Mutex::new(()),
        })
    }

    /// Get a column family handle.
    fn cf(&self, name: &str) -> Result<Arc<BoundColumnFamily<'_>>> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| StoreError::Database(format!("column family not found: {name}")))
    }

    /// Collect the keys and values of a column family, optionally restricted to a prefix.
    fn scan_cf(
        &self,
        name: &'static str,
        prefix: Option<&[u8]>,
    ) -> Result<Vec<(RecordKey, Vec<u8>)>> {
        let cf = self.cf(name)?;
        let mode = match prefix {
            Some(prefix) => IteratorMode::From(prefix, Direction::Forward),
            None => IteratorMode::Start,
        };

        let mut rows = Vec::new();
        for item in self.db.iterator_cf(&cf, mode) {
            let (key, value) = item.map_err(|e| StoreError::Database(e.to_string()))?;
            if let Some(prefix) = prefix {
                if !key.starts_with(prefix) {
                    break;
                }
            }
            rows.push((RecordKey::from_bytes(name, &key)?, value.to_vec()));
        }
        Ok(rows)
    }
}

impl Store for RocksStore {
    // =========================================================================
    // Sequences
    // =========================================================================

    fn next_id(&self, sequence: Sequence) -> Result<i64> {
        let cf = self.cf(cf::SEQUENCES)?;
        let key = sequence.as_str().as_bytes();

        let _guard = self.sequence_lock.lock();
        let last = self
            .db
            .get_cf(&cf, key)
            .map_err(|e| StoreError::Database(e.to_string()))?
            .map(|data| codec::decode::<i64>(&data))
            .transpose()?
            .unwrap_or(0);
        let next = last + 1;

        self.db
            .put_cf(&cf, key, codec::encode(&next)?)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(next)
    }

    // =========================================================================
    // Account Operations
    // =========================================================================

    fn put_account(&self, account: &Account) -> Result<()> {
        let cf = self.cf(cf::ACCOUNTS)?;
        let value = codec::encode(account)?;

        self.db
            .put_cf(&cf, keys::account_key(account.id), value)
            .map_err(|e| StoreError::Database(e.to_string()))
    }

    fn get_account(&self, id: AccountId) -> Result<Option<Account>> {
        let cf = self.cf(cf::ACCOUNTS)?;

        self.db
            .get_cf(&cf, keys::account_key(id))
            .map_err(|e| StoreError::Database(e.to_string()))?
            .map(|data| codec::decode(&data))
            .transpose()
    }

    fn list_accounts(&self) -> Result<Vec<Account>> {
        let cf = self.cf(cf::ACCOUNTS)?;

        let mut accounts = Vec::new();
        for item in self.db.iterator_cf(&cf, IteratorMode::Start) {
            let (_, value) = item.map_err(|e| StoreError::Database(e.to_string()))?;
            accounts.push(codec::decode(&value)?);
        }
        Ok(accounts)
    }

    fn purge_account(&self, id: AccountId) -> Result<bool> {
        if self.get_account(id)?.is_none() {
            return Ok(false);
        }

        let prefix = keys::partition_prefix(id);
        let mut batch = WriteBatch::default();
        for table in Table::ALL {
            let name = table_cf(table);
            let cf = self.cf(name)?;
            for (key, _) in self.scan_cf(name, Some(prefix.as_slice()))? {
                batch.delete_cf(&cf, key.to_bytes());
            }
        }
        let cf_accounts = self.cf(cf::ACCOUNTS)?;
        batch.delete_cf(&cf_accounts, keys::account_key(id));

        self.db
            .write(batch)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(true)
    }

    // =========================================================================
    // Record Operations
    // =========================================================================

    fn get_record(&self, table: Table, key: RecordKey) -> Result<Option<Vec<u8>>> {
        let cf = self.cf(table_cf(table))?;

        self.db
            .get_cf(&cf, key.to_bytes())
            .map_err(|e| StoreError::Database(e.to_string()))
    }

    fn put_record(&self, table: Table, key: RecordKey, value: Vec<u8>) -> Result<()> {
        let cf = self.cf(table_cf(table))?;

        self.db
            .put_cf(&cf, key.to_bytes(), value)
            .map_err(|e| StoreError::Database(e.to_string()))
    }

    fn delete_record(&self, table: Table, key: RecordKey) -> Result<bool> {
        if self.get_record(table, key)?.is_none() {
            return Ok(false);
        }

        let cf = self.cf(table_cf(table))?;
        self.db
            .delete_cf(&cf, key.to_bytes())
            .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(true)
    }

    fn scan_records(
        &self,
        table: Table,
        account: Option<AccountId>,
    ) -> Result<Vec<(RecordKey, Vec<u8>)>> {
        match account {
            Some(account) => {
                let prefix = keys::partition_prefix(account);
                self.scan_cf(table_cf(table), Some(prefix.as_slice()))
            }
            None => self.scan_cf(table_cf(table), None),
        }
    }

    fn count_records(&self, table: Table, account: AccountId) -> Result<u64> {
        let rows = self.scan_records(table, Some(account))?;
        Ok(rows.len() as u64)
    }

    fn count_records_by_account(&self, table: Table) -> Result<HashMap<AccountId, u64>> {
        let mut counts = HashMap::new();
        for (key, _) in self.scan_records(table, None)? {
            if let Some(account) = key.account() {
                *counts.entry(account).or_insert(0) += 1;
            }
        }
        Ok(counts)
    }
}
