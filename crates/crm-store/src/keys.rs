//! Key encoding utilities.
//!
//! Tenant records are keyed by `partition (8 bytes BE) || id (8 bytes BE)`. The
//! partition is the owning account id, or `0` for platform rows such as super
//! admins. Because the partition comes first, one tenant's rows form a
//! contiguous key range.

use crm_core::{AccountId, Table};

use crate::error::{Result, StoreError};

/// Partition holding rows that belong to no tenant.
pub const PLATFORM_PARTITION: i64 = 0;

/// Length of an encoded [`RecordKey`].
pub const RECORD_KEY_LEN: usize = 16;

/// Composite key of a tenant record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RecordKey {
    partition: i64,
    id: i64,
}

impl RecordKey {
    /// Key of a record owned by `account`.
    #[must_use]
    pub const fn tenant(account: AccountId, id: i64) -> Self {
        Self {
            partition: account.get(),
            id,
        }
    }

    /// Key of a platform row.
    #[must_use]
    pub const fn platform(id: i64) -> Self {
        Self {
            partition: PLATFORM_PARTITION,
            id,
        }
    }

    /// Owning account, `None` for platform rows.
    #[must_use]
    pub const fn account(self) -> Option<AccountId> {
        if self.partition == PLATFORM_PARTITION {
            None
        } else {
            Some(AccountId::new(self.partition))
        }
    }

    /// Record id within the table.
    #[must_use]
    pub const fn id(self) -> i64 {
        self.id
    }

    /// Encode as `partition || id`.
    #[must_use]
    pub fn to_bytes(self) -> [u8; RECORD_KEY_LEN] {
        let mut key = [0u8; RECORD_KEY_LEN];
        key[..8].copy_from_slice(&self.partition.to_be_bytes());
        key[8..].copy_from_slice(&self.id.to_be_bytes());
        key
    }

    /// Decode a key read back from `table`.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::CorruptKey` if the key is not 16 bytes long.
    pub fn from_bytes(table: &'static str, bytes: &[u8]) -> Result<Self> {
        let corrupt = || StoreError::CorruptKey {
            table,
            len: bytes.len(),
        };
        if bytes.len() != RECORD_KEY_LEN {
            return Err(corrupt());
        }
        let partition = bytes[..8].try_into().map_err(|_| corrupt())?;
        let id = bytes[8..].try_into().map_err(|_| corrupt())?;
        Ok(Self {
            partition: i64::from_be_bytes(partition),
            id: i64::from_be_bytes(id),
        })
    }
}

/// Prefix shared by every key of one tenant.
#[must_use]
pub fn partition_prefix(account: AccountId) -> [u8; 8] {
    account.get().to_be_bytes()
}

/// Create an account key from an account id.
#[must_use]
pub fn account_key(id: AccountId) -> [u8; 8] {
    id.get().to_be_bytes()
}

/// An id sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Sequence {
    /// Account ids.
    Accounts,
    /// Ids of a tenant table.
    Records(Table),
}

impl Sequence {
    /// Sequence name, used as its key.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Accounts => "accounts",
            Self::Records(table) => table.as_str(),
        }
    }
}
