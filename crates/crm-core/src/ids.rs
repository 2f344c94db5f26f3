//! Identifier types for the CRM.
//!
//! Every persisted row is identified by a 64-bit integer allocated by the store.
//! Each entity gets its own newtype so a `DealId` can never be passed where a
//! `CompanyId` is expected.
//!
//! # Macro-based ID Types
//!
//! The `int_id_type!` macro reduces boilerplate for integer identifier types,
//! ensuring consistent implementation of serialization, parsing, and display traits.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Common behaviour of all row identifiers, used by the generic repository.
pub trait RecordId: Copy + Eq + fmt::Display + fmt::Debug + Send + Sync + 'static {
    /// Wrap a raw store-allocated integer.
    fn from_raw(raw: i64) -> Self;

    /// Return the raw integer.
    fn raw(self) -> i64;
}

/// Macro to define an integer identifier type with standard trait implementations.
///
/// This macro generates a newtype wrapper around `i64` with implementations for:
/// - `Clone`, `Copy`, `PartialEq`, `Eq`, `Hash`, `PartialOrd`, `Ord`
/// - `Serialize`, `Deserialize` (as a JSON number)
/// - `FromStr`, `Display`, `Debug`
/// - `RecordId`
///
/// # Example
///
/// ```ignore
/// int_id_type!(MyId, "A custom identifier type.");
/// let id = MyId::new(7);
/// let parsed: MyId = "7".parse().unwrap();
/// ```
macro_rules! int_id_type {
    ($name:ident, $doc:expr) => {
        #[doc = $doc]
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(i64);

        impl $name {
            /// Create a new identifier from its integer value.
            #[must_use]
            pub const fn new(value: i64) -> Self {
                Self(value)
            }

            /// Return the integer value.
            #[must_use]
            pub const fn get(self) -> i64 {
                self.0
            }
        }

        impl RecordId for $name {
            fn from_raw(raw: i64) -> Self {
                Self(raw)
            }

            fn raw(self) -> i64 {
                self.0
            }
        }

        impl FromStr for $name {
            type Err = IdError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.trim()
                    .parse::<i64>()
                    .map(Self)
                    .map_err(|_| IdError::InvalidInteger(s.to_string()))
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<$name> for i64 {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

int_id_type!(AccountId, "An account (tenant) identifier.");
int_id_type!(
    UserId,
    "A user identifier.\n\nUser IDs are embedded in issued tokens as the `sub` claim."
);
int_id_type!(CompanyId, "A company identifier (a CRM record owned by a tenant).");
int_id_type!(ContactId, "A contact identifier.");
int_id_type!(DealId, "A deal identifier.");
int_id_type!(TaskId, "A task identifier.");

/// Errors that can occur when parsing identifiers.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdError {
    /// The input is not a valid integer.
    #[error("invalid integer identifier: {0:?}")]
    InvalidInteger(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn account_id_parses_decimal() {
        assert_eq!("42".parse::<AccountId>().unwrap(), AccountId::new(42));
        assert_eq!(" 7 ".parse::<AccountId>().unwrap(), AccountId::new(7));
    }

    #[test]
    fn account_id_rejects_garbage() {
        assert!("abc".parse::<AccountId>().is_err());
        assert!("".parse::<AccountId>().is_err());
        assert!("4.2".parse::<AccountId>().is_err());
    }

    #[test]
    fn ids_serialize_as_numbers() {
        let json = serde_json::to_string(&CompanyId::new(9)).unwrap();
        assert_eq!(json, "9");
        let parsed: CompanyId = serde_json::from_str("9").unwrap();
        assert_eq!(parsed, CompanyId::new(9));
    }

    #[test]
    fn debug_names_the_type() {
        assert_eq!(format!("{:?}", DealId::new(3)), "DealId(3)");
    }
}
