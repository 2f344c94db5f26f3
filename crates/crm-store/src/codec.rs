//! CBOR encoding of stored values.

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{Result, StoreError};

/// Serialize a value using CBOR.
///
/// # Errors
///
/// Returns `StoreError::Serialization` if the value cannot be encoded.
pub fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    ciborium::into_writer(value, &mut buf).map_err(|e| StoreError::Serialization(e.to_string()))?;
    Ok(buf)
}

/// Deserialize a value from CBOR.
///
/// # Errors
///
/// Returns `StoreError::Serialization` if the bytes do not decode as `T`.
pub fn decode<T: DeserializeOwned>(data: &[u8]) -> Result<T> {
    ciborium::from_reader(data).map_err(|e| StoreError::Serialization(e.to_string()))
}
