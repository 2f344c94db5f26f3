//! In-memory storage implementation.
//!
//! Values are kept CBOR-encoded so the memory and `RocksDB` backends exercise
//! the same codec.

use std::collections::{BTreeMap, HashMap};

use parking_lot::RwLock;

use crm_core::{Account, AccountId, Table};

use crate::error::Result;
use crate::keys::{RecordKey, Sequence};
use crate::Store;

#[derive(Debug, Default)]
struct Tables {
    accounts: BTreeMap<AccountId, Account>,
    records: HashMap<Table, BTreeMap<RecordKey, Vec<u8>>>,
    sequences: HashMap<Sequence, i64>,
}

impl Tables {
    fn partition(
        &self,
        table: Table,
        account: AccountId,
    ) -> impl Iterator<Item = (&RecordKey, &Vec<u8>)> {
        let range = RecordKey::tenant(account, i64::MIN)..=RecordKey::tenant(account, i64::MAX);
        self.records
            .get(&table)
            .into_iter()
            .flat_map(move |rows| rows.range(range.clone()))
    }
}

/// Storage backed by in-process maps. Contents are lost on drop.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<Tables>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl Store for MemoryStore {
    fn next_id(&self, sequence: Sequence) -> Result<i64> {
        let mut inner = self.inner.write();
        let last = inner.sequences.entry(sequence).or_insert(0);
        *last += 1;
        Ok(*last)
    }

    fn put_account(&self, account: &Account) -> Result<()> {
        self.inner
            .write()
            .accounts
            .insert(account.id, account.clone());
        Ok(())
    }

    fn get_account(&self, id: AccountId) -> Result<Option<Account>> {
        Ok(self.inner.read().accounts.get(&id).cloned())
    }

    fn list_accounts(&self) -> Result<Vec<Account>> {
        Ok(self.inner.read().accounts.values().cloned().collect())
    }

    fn purge_account(&self, id: AccountId) -> Result<bool> {
        let mut inner = self.inner.write();
        if inner.accounts.remove(&id).is_none() {
            return Ok(false);
        }
        for rows in inner.records.values_mut() {
            rows.retain(|key, _| key.account() != Some(id));
        }
        Ok(true)
    }

    fn get_record(&self, table: Table, key: RecordKey) -> Result<Option<Vec<u8>>> {
        Ok(self
            .inner
            .read()
            .records
            .get(&table)
            .and_then(|rows| rows.get(&key))
            .cloned())
    }

    fn put_record(&self, table: Table, key: RecordKey, value: Vec<u8>) -> Result<()> {
        self.inner
            .write()
            .records
            .entry(table)
            .or_default()
            .insert(key, value);
        Ok(())
    }

    fn delete_record(&self, table: Table, key: RecordKey) -> Result<bool> {
        Ok(self
            .inner
            .write()
            .records
            .get_mut(&table)
            .and_then(|rows| rows.remove(&key))
            .is_some())
    }

    fn scan_records(
        &self,
        table: Table,
        account: Option<AccountId>,
    ) -> Result<Vec<(RecordKey, Vec<u8>)>> {
        let inner = self.inner.read();
        let rows = match account {
            Some(account) => inner
                .partition(table, account)
                .map(|(key, value)| (*key, value.clone()))
                .collect(),
            None => inner
                .records
                .get(&table)
                .map(|rows| rows.iter().map(|(key, value)| (*key, value.clone())).collect())
                .unwrap_or_default(),
        };
        Ok(rows)
    }

    fn count_records(&self, table: Table, account: AccountId) -> Result<u64> {
        let inner = self.inner.read();
        Ok(inner.partition(table, account).count() as u64)
    }

    fn count_records_by_account(&self, table: Table) -> Result<HashMap<AccountId, u64>> {
        let inner = self.inner.read();
        let mut counts = HashMap::new();
        if let Some(rows) = inner.records.get(&table) {
            for key in rows.keys() {
                if let Some(account) = key.account() {
                    *counts.entry(account).or_insert(0) += 1;
                }
            }
        }
        Ok(counts)
    }
}
