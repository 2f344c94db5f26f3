//! Tenant user management.
//!
//! Any member of a tenant may list its users; only company admins (or a super
//! admin acting in the tenant) may change them. Adding users is bounded by the
//! plan's user limit; changing an existing user's role or disabling them needs
//! the admin module. Responses are always [`UserProfile`]s, so password hashes
//! never leave the service.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;

use crm_core::{
    AccountContext, Feature, NewUser, ResourceKind, Role, TenantScope, User, UserId,
    UserProfile, UserUpdate,
};
use crm_store::{TenantRepository, UserDirectory};

use crate::context::TenantContext;
use crate::error::{ApiError, ApiJson};
use crate::password;
use crate::state::AppState;

const MANAGERS: &[Role] = &[Role::CompanyAdmin, Role::SuperAdmin];

fn tenant_role(role: Role) -> Result<Role, ApiError> {
    if role == Role::SuperAdmin {
        return Err(ApiError::validation("tenant users cannot be super admins"));
    }
    Ok(role)
}

/// Create user request.
#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    /// Email address.
    pub email: String,
    /// Login name.
    pub username: String,
    /// Initial password.
    pub password: String,
    /// Role, `USER` if omitted.
    #[serde(default = "default_role")]
    pub role: Role,
}

fn default_role() -> Role {
    Role::User
}

/// Update user request. Absent fields are kept.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateUserRequest {
    /// New email.
    pub email: Option<String>,
    /// New login name.
    pub username: Option<String>,
    /// New password.
    pub password: Option<String>,
    /// New role.
    pub role: Option<Role>,
    /// Enable or disable login.
    pub is_active: Option<bool>,
}

/// List the tenant's users.
pub async fn list(
    State(state): State<Arc<AppState>>,
    TenantContext(ctx): TenantContext,
) -> Result<Json<Vec<UserProfile>>, ApiError> {
    let users = TenantRepository::<User>::new(state.store.as_ref())
        .list(TenantScope::Account(ctx.account_id()))?;
    Ok(Json(users.iter().map(User::profile).collect()))
}

/// Fetch one user of the tenant.
pub async fn get(
    State(state): State<Arc<AppState>>,
    TenantContext(ctx): TenantContext,
    Path(id): Path<i64>,
) -> Result<Json<UserProfile>, ApiError> {
    let user = find(&state, &ctx, UserId::new(id))?;
    Ok(Json(user.profile()))
}

fn find(state: &AppState, ctx: &AccountContext, id: UserId) -> Result<User, ApiError> {
    TenantRepository::<User>::new(state.store.as_ref())
        .get(id, ctx.account_id())?
        .ok_or_else(|| ApiError::not_found("user"))
}

/// Add a user to the tenant.
///
/// Requires a free slot under the plan's user limit.
pub async fn create(
    State(state): State<Arc<AppState>>,
    TenantContext(ctx): TenantContext,
    ApiJson(body): ApiJson<CreateUserRequest>,
) -> Result<(StatusCode, Json<UserProfile>), ApiError> {
    ctx.principal.require_role(MANAGERS)?;

    let store = state.store.as_ref();
    let repo = TenantRepository::<User>::new(store);
    let account_id = ctx.account_id();
    state.gate.authorize_create(&ctx, None, Some(ResourceKind::Users), || {
        repo.count(account_id)
    })?;

    let role = tenant_role(body.role)?;
    let email = body.email.trim().to_string();
    let username = body.username.trim().to_string();
    password::check_strength(&body.password)?;
    UserDirectory::new(store).ensure_unique(&email, &username, None)?;
    let password_hash = password::hash_async(body.password).await?;

    let user = repo.create(
        NewUser {
            email,
            username,
            password_hash,
            role,
        },
        account_id,
    )?;

    tracing::info!(
        user_id = %user.id,
        account_id = %account_id,
        role = %user.role,
        created_by = %ctx.principal.id,
        "User created"
    );

    Ok((StatusCode::CREATED, Json(user.profile())))
}

/// Update a user of the tenant.
pub async fn update(
    State(state): State<Arc<AppState>>,
    TenantContext(ctx): TenantContext,
    Path(id): Path<i64>,
    ApiJson(body): ApiJson<UpdateUserRequest>,
) -> Result<Json<UserProfile>, ApiError> {
    ctx.principal.require_role(MANAGERS)?;
    state.gate.require_writable(&ctx)?;
    if body.role.is_some() || body.is_active.is_some() {
        state.gate.require_feature(&ctx, Feature::AdminModule)?;
    }

    let store = state.store.as_ref();
    let id = UserId::new(id);
    let existing = find(&state, &ctx, id)?;

    let role = body.role.map(tenant_role).transpose()?;
    let email = body.email.map(|email| email.trim().to_string());
    let username = body.username.map(|username| username.trim().to_string());
    if email.is_some() || username.is_some() {
        UserDirectory::new(store).ensure_unique(
            email.as_deref().unwrap_or(&existing.email),
            username.as_deref().unwrap_or(&existing.username),
            Some(id),
        )?;
    }

    let password_hash = match body.password {
        Some(password) => {
            password::check_strength(&password)?;
            Some(password::hash_async(password).await?)
        }
        None => None,
    };

    let patch = UserUpdate {
        email,
        username,
        password_hash,
        role,
        is_active: body.is_active,
    };
    let user = TenantRepository::<User>::new(store)
        .update(id, patch, ctx.account_id())?
        .ok_or_else(|| ApiError::not_found("user"))?;

    tracing::info!(
        user_id = %user.id,
        account_id = %ctx.account_id(),
        updated_by = %ctx.principal.id,
        "User updated"
    );

    Ok(Json(user.profile()))
}

/// Remove a user from the tenant. Admins cannot remove themselves.
pub async fn delete(
    State(state): State<Arc<AppState>>,
    TenantContext(ctx): TenantContext,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    ctx.principal.require_role(MANAGERS)?;
    state.gate.require_writable(&ctx)?;

    let id = UserId::new(id);
    if id == ctx.principal.id {
        return Err(ApiError::validation("you cannot delete your own user"));
    }

    let deleted =
        TenantRepository::<User>::new(state.store.as_ref()).delete(id, ctx.account_id())?;
    if !deleted {
        return Err(ApiError::not_found("user"));
    }

    tracing::info!(
        user_id = %id,
        account_id = %ctx.account_id(),
        deleted_by = %ctx.principal.id,
        "User deleted"
    );
    Ok(StatusCode::NO_CONTENT)
}
