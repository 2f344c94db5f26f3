//! Database schema definitions and column families.
//!
//! This module defines the column families used in `RocksDB` storage.

use crm_core::Table;

/// Column family names for the `RocksDB` database.
pub mod cf {
    /// Account records, keyed by big-endian account id.
    pub const ACCOUNTS: &str = "accounts";

    /// Id sequences, keyed by sequence name. Value is the last issued id.
    pub const SEQUENCES: &str = "sequences";

    /// Users, keyed by `account_id || user_id` (account 0 for super admins).
    pub const USERS: &str = "users";

    /// Companies, keyed by `account_id || company_id`.
    pub const COMPANIES: &str = "companies";

    /// Contacts, keyed by `account_id || contact_id`.
    pub const CONTACTS: &str = "contacts";

    /// Deals, keyed by `account_id || deal_id`.
    pub const DEALS: &str = "deals";

    /// Tasks, keyed by `account_id || task_id`.
    pub const TASKS: &str = "tasks";
}

/// Column family holding a tenant table.
#[must_use]
pub const fn table_cf(table: Table) -> &'static str {
    match table {
        Table::Users => cf::USERS,
        Table::Companies => cf::COMPANIES,
        Table::Contacts => cf::CONTACTS,
        Table::Deals => cf::DEALS,
        Table::Tasks => cf::TASKS,
    }
}

/// Returns all column family names for database initialization.
#[must_use]
pub fn all_column_families() -> Vec<&'static str> {
    let mut families = vec![cf::ACCOUNTS, cf::SEQUENCES];
    families.extend(Table::ALL.into_iter().map(table_cf));
    families
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_table_has_a_family() {
        let families = all_column_families();
        assert_eq!(families.len(), 7);
        for table in Table::ALL {
            assert!(families.contains(&table_cf(table)));
        }
    }
}
