//! HTTP request handlers.

pub mod auth;
pub mod billing;
pub mod health;
pub mod insights;
pub mod records;
pub mod super_admin;
pub mod users;
