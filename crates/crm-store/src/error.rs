//! Error types for CRM storage.

use crm_core::CrmError;

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors that can occur in storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Database operation failed.
    #[error("database error: {0}")]
    Database(String),

    /// Serialization/deserialization failed.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// A stored key did not have the expected layout.
    #[error("corrupt key in {table}: {len} bytes")]
    CorruptKey {
        /// Table or column family the key was read from.
        table: &'static str,
        /// Length of the offending key.
        len: usize,
    },
}

impl From<StoreError> for CrmError {
    fn from(err: StoreError) -> Self {
        Self::Storage(err.to_string())
    }
}
