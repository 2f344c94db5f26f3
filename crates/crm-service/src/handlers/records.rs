//! Tenant-scoped CRUD for companies, contacts, deals and tasks.
//!
//! One set of generic handlers serves every entity; each route instantiates
//! them for a concrete [`Resource`]. Every handler takes a [`TenantContext`],
//! so the account is loaded and checked before the repository is touched,
//! and every repository call is scoped to that account.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::de::DeserializeOwned;

use crm_core::{
    Company, Contact, Deal, Feature, RecordId, ResourceKind, Task, TenantRecord, TenantScope,
};
use crm_store::TenantRepository;

use crate::context::TenantContext;
use crate::error::{ApiError, ApiJson};
use crate::state::AppState;

/// An entity exposed through the generic CRUD routes.
pub trait Resource: TenantRecord {
    /// Plan limit checked on create.
    const LIMIT: Option<ResourceKind> = None;
    /// Feature required to create.
    const FEATURE: Option<Feature> = None;
}

impl Resource for Company {
    const LIMIT: Option<ResourceKind> = Some(ResourceKind::Companies);
}

impl Resource for Contact {}

impl Resource for Deal {
    const LIMIT: Option<ResourceKind> = Some(ResourceKind::Deals);
}

impl Resource for Task {}

/// List the tenant's records.
pub async fn list<T: Resource>(
    State(state): State<Arc<AppState>>,
    TenantContext(ctx): TenantContext,
) -> Result<Json<Vec<T>>, ApiError> {
    let records = TenantRepository::<T>::new(state.store.as_ref())
        .list(TenantScope::Account(ctx.account_id()))?;
    Ok(Json(records))
}

/// Fetch one record. Another tenant's id is reported exactly like a missing one.
pub async fn get<T: Resource>(
    State(state): State<Arc<AppState>>,
    TenantContext(ctx): TenantContext,
    Path(id): Path<i64>,
) -> Result<Json<T>, ApiError> {
    TenantRepository::<T>::new(state.store.as_ref())
        .get(T::Id::from_raw(id), ctx.account_id())?
        .map(Json)
        .ok_or_else(|| ApiError::not_found(T::ENTITY))
}

/// Create a record owned by the tenant.
///
/// Checks run in order: plan lock, account status, feature, limit. The limit
/// counts rows at this moment, so concurrent creates can overshoot it.
pub async fn create<T>(
    State(state): State<Arc<AppState>>,
    TenantContext(ctx): TenantContext,
    ApiJson(input): ApiJson<T::Create>,
) -> Result<(StatusCode, Json<T>), ApiError>
where
    T: Resource,
    T::Create: DeserializeOwned + 'static,
{
    let repo = TenantRepository::<T>::new(state.store.as_ref());
    let account_id = ctx.account_id();

    state
        .gate
        .authorize_create(&ctx, T::FEATURE, T::LIMIT, || repo.count(account_id))?;

    let record = repo.create(input, account_id)?;
    tracing::info!(
        entity = T::ENTITY,
        id = %record.id(),
        account_id = %account_id,
        user_id = %ctx.principal.id,
        "Record created"
    );

    Ok((StatusCode::CREATED, Json(record)))
}

/// Apply a partial update. Absent fields are kept.
pub async fn update<T>(
    State(state): State<Arc<AppState>>,
    TenantContext(ctx): TenantContext,
    Path(id): Path<i64>,
    ApiJson(patch): ApiJson<T::Patch>,
) -> Result<Json<T>, ApiError>
where
    T: Resource,
    T::Patch: DeserializeOwned + 'static,
{
    state.gate.require_writable(&ctx)?;

    TenantRepository::<T>::new(state.store.as_ref())
        .update(T::Id::from_raw(id), patch, ctx.account_id())?
        .map(Json)
        .ok_or_else(|| ApiError::not_found(T::ENTITY))
}

/// Delete a record.
pub async fn delete<T: Resource>(
    State(state): State<Arc<AppState>>,
    TenantContext(ctx): TenantContext,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.gate.require_writable(&ctx)?;

    let deleted = TenantRepository::<T>::new(state.store.as_ref())
        .delete(T::Id::from_raw(id), ctx.account_id())?;
    if !deleted {
        return Err(ApiError::not_found(T::ENTITY));
    }

    tracing::info!(
        entity = T::ENTITY,
        id,
        account_id = %ctx.account_id(),
        user_id = %ctx.principal.id,
        "Record deleted"
    );
    Ok(StatusCode::NO_CONTENT)
}
