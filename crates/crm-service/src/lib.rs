//! Multi-tenant CRM HTTP API service.
//!
//! This crate provides the HTTP API for the CRM, including:
//!
//! - Login, signup and token issuance
//! - Tenant-scoped CRUD for companies, contacts, deals, tasks and users
//! - Plan, feature and limit enforcement from the plan catalog
//! - Trial, grace and lock handling, with the periodic billing lifecycle job
//! - Platform administration for super admins
//!
//! # Tenancy
//!
//! Every tenant-scoped handler extracts a [`context::TenantContext`]. Tenant
//! users always act in their own account; a super admin selects one with the
//! `x-account-id` header. Rows of other tenants are indistinguishable from
//! rows that do not exist.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
// Allow some pedantic lints that are noisy for Axum handler functions
#![allow(clippy::missing_errors_doc)] // Axum handlers all return Result
#![allow(clippy::unused_async)] // Handlers must be async for axum

pub mod auth;
pub mod config;
pub mod context;
pub mod error;
pub mod handlers;
pub mod lifecycle;
pub mod password;
pub mod routes;
pub mod state;
pub mod tenancy;

pub use config::ServiceConfig;
pub use error::ApiError;
pub use lifecycle::{BillingLifecycleJob, LifecycleReport};
pub use routes::create_router;
pub use state::AppState;
