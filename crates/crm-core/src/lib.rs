//! Core types and tenancy rules for the multi-tenant CRM.
//!
//! This crate provides the foundational types used throughout the service:
//!
//! - **Identifiers**: `AccountId`, `UserId`, `CompanyId`, `ContactId`, `DealId`, `TaskId`
//! - **Accounts**: `Account`, `BillingPlan`, `AccountStatus` and [`resolve_status`]
//! - **Plans**: `PlanCatalog`, `PlanConfig`, `Feature`, `ResourceKind`
//! - **Principals**: `Principal`, `Role`, `TenantScope` and [`resolve_tenant`]
//! - **Access**: `AccountContext`, `AccessGate`
//! - **Entities**: `Company`, `Contact`, `Deal`, `Task`, `User`
//!
//! # Plan ladder
//!
//! `TRIAL < STARTER < PRO < ENTERPRISE`. Every limit and feature of a plan is
//! also available on all plans above it.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod access;
pub mod account;
pub mod entities;
pub mod error;
pub mod ids;
pub mod plans;
pub mod principal;
pub mod status;

pub use access::{AccessGate, AccountContext};
pub use account::{
    Account, BillingPlan, GRACE_PERIOD_DAYS, MAX_TRIAL_EXTENSION_DAYS, TRIAL_PERIOD_DAYS,
};
pub use entities::{
    Company, CompanyUpdate, Contact, ContactUpdate, Deal, DealStage, DealUpdate, NewCompany,
    NewContact, NewDeal, NewTask, NewUser, Reference, Table, Task, TaskPriority, TaskStatus,
    TaskUpdate, TenantRecord, User, UserProfile, UserUpdate,
};
pub use error::{CrmError, Result};
pub use ids::{AccountId, CompanyId, ContactId, DealId, IdError, RecordId, TaskId, UserId};
pub use plans::{Feature, PlanCatalog, PlanConfig, ResourceKind};
pub use principal::{resolve_tenant, Principal, Role, SuperAdminGrant, TenantScope};
pub use status::{resolve_status, AccountStatus};
