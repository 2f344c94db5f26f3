//! Login, signup and current-principal handlers.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crm_core::{resolve_status, Account, AccountStatus, BillingPlan, UserProfile};
use crm_store::UserDirectory;

use crate::auth::{AuthPrincipal, IssuedToken};
use crate::error::{ApiError, ApiJson};
use crate::password;
use crate::state::AppState;
use crate::tenancy::{provision_tenant, FirstAdmin};

/// Login request. `login` may be an email or a username.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    /// Email or username.
    #[serde(alias = "email", alias = "username")]
    pub login: String,
    /// Password.
    pub password: String,
}

/// Token plus the user it was issued to.
#[derive(Debug, Serialize)]
pub struct TokenResponse {
    /// The access token.
    #[serde(flatten)]
    pub token: IssuedToken,
    /// The authenticated user.
    pub user: UserProfile,
}

/// Verify a credential and issue an access token.
pub async fn login(
    State(state): State<Arc<AppState>>,
    ApiJson(body): ApiJson<LoginRequest>,
) -> Result<Json<TokenResponse>, ApiError> {
    let user = UserDirectory::new(state.store.as_ref()).find_by_login(body.login.trim())?;

    let Some(user) = user.filter(|user| user.is_active) else {
        tracing::info!(login = %body.login, "Login rejected: unknown or disabled user");
        return Err(ApiError::Unauthorized);
    };
    if !password::verify_async(body.password, user.password_hash.clone()).await? {
        tracing::info!(user_id = %user.id, "Login rejected: wrong password");
        return Err(ApiError::Unauthorized);
    }

    let token = state.tokens.issue(&user)?;
    tracing::info!(user_id = %user.id, role = %user.role, "User logged in");

    Ok(Json(TokenResponse {
        token,
        user: user.profile(),
    }))
}

/// Signup request: a new tenant and its first administrator.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    /// Company (tenant) name.
    pub company_name: String,
    /// Administrator email.
    pub email: String,
    /// Administrator username.
    pub username: String,
    /// Administrator password.
    pub password: String,
}

/// Signup response.
#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    /// Access token of the new administrator.
    #[serde(flatten)]
    pub token: IssuedToken,
    /// The new administrator.
    pub user: UserProfile,
    /// The new account, on trial.
    pub account: Account,
}

/// Sign up a new tenant on the trial plan.
pub async fn register(
    State(state): State<Arc<AppState>>,
    ApiJson(body): ApiJson<RegisterRequest>,
) -> Result<(StatusCode, Json<RegisterResponse>), ApiError> {
    let admin = FirstAdmin {
        email: body.email.trim().to_string(),
        username: body.username.trim().to_string(),
        password: body.password,
    };
    let (account, user) =
        provision_tenant(state.store.as_ref(), &body.company_name, admin, BillingPlan::Trial)
            .await?;
    let token = state.tokens.issue(&user)?;

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            token,
            user: user.profile(),
            account,
        }),
    ))
}

/// Current principal response.
#[derive(Debug, Serialize)]
pub struct MeResponse {
    /// The authenticated user.
    pub user: UserProfile,
    /// Their account; absent for super admins.
    pub account: Option<Account>,
    /// Status of that account.
    pub status: Option<AccountStatus>,
}

/// Return the authenticated user and their own account.
pub async fn me(
    State(state): State<Arc<AppState>>,
    AuthPrincipal(principal): AuthPrincipal,
) -> Result<Json<MeResponse>, ApiError> {
    let user = UserDirectory::new(state.store.as_ref())
        .find_by_id(principal.id, principal.account_id)?
        .ok_or(ApiError::Unauthorized)?;

    let account = match principal.account_id {
        Some(id) => state.store.get_account(id)?,
        None => None,
    };
    let status = account
        .as_ref()
        .map(|account| resolve_status(account, Utc::now()));

    Ok(Json(MeResponse {
        user: user.profile(),
        account,
        status,
    }))
}
