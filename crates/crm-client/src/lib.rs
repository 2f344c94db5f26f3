//! CRM Client SDK.
//!
//! This crate provides a typed client for the multi-tenant CRM API.
//!
//! # Example
//!
//! ```no_run
//! use crm_client::CrmClient;
//! use crm_core::{Company, NewCompany};
//!
//! # async fn example() -> Result<(), crm_client::ClientError> {
//! let client = CrmClient::new("http://crm.internal:8080")?;
//! let session = client.login("alice@acme.test", "correct horse battery").await?;
//! let client = client.with_token(session.token);
//!
//! let company: Company = client
//!     .create(&NewCompany {
//!         name: "Globex".to_string(),
//!         ..NewCompany::default()
//!     })
//!     .await?;
//! println!("created company {}", company.id);
//! # Ok(())
//! # }
//! ```
//!
//! Billing and plan failures surface as dedicated [`ClientError`] variants,
//! so callers can prompt for an upgrade instead of parsing error codes.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

mod client;
mod error;
mod types;

pub use client::{ClientOptions, CrmClient};
pub use error::ClientError;
pub use types::*;
