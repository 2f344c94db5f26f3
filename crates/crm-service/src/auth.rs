//! Authentication: token issuance, verification and extractors.
//!
//! This module provides:
//! - `TokenService` - HS256 access tokens embedding role and account
//! - `AuthPrincipal` - any authenticated user
//! - `SuperAdmin` - a platform super admin, carrying the grant for unscoped reads

use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crm_core::{AccountId, CrmError, Principal, Role, SuperAdminGrant, User, UserId};
use crm_store::UserDirectory;

use crate::error::ApiError;
use crate::state::AppState;

/// Claims carried by an access token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user id).
    pub sub: String,
    /// Email at issuance.
    pub email: String,
    /// Username at issuance.
    pub username: String,
    /// Role at issuance.
    pub role: Role,
    /// Owning account; absent for super admins.
    pub account_id: Option<AccountId>,
    /// Issuer.
    pub iss: String,
    /// Issued at.
    pub iat: i64,
    /// Expiration time.
    pub exp: i64,
    /// Token id.
    pub jti: String,
}

/// A freshly signed access token.
#[derive(Debug, Clone, Serialize)]
pub struct IssuedToken {
    /// The encoded JWT.
    pub token: String,
    /// Always `Bearer`.
    pub token_type: &'static str,
    /// Expiry.
    pub expires_at: DateTime<Utc>,
}

/// Signs and verifies access tokens with a shared secret.
#[derive(Clone)]
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    issuer: String,
    ttl: Duration,
}

impl std::fmt::Debug for TokenService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenService")
            .field("issuer", &self.issuer)
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

impl TokenService {
    /// Create a token service.
    #[must_use]
    pub fn new(secret: &str, issuer: impl Into<String>, ttl_seconds: i64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            issuer: issuer.into(),
            ttl: Duration::seconds(ttl_seconds),
        }
    }

    /// Issue a token for `user`.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Internal` if signing fails.
    pub fn issue(&self, user: &User) -> Result<IssuedToken, ApiError> {
        let now = Utc::now();
        let expires_at = now + self.ttl;
        let claims = Claims {
            sub: user.id.to_string(),
            email: user.email.clone(),
            username: user.username.clone(),
            role: user.role,
            account_id: user.account_id,
            iss: self.issuer.clone(),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
            jti: uuid::Uuid::new_v4().to_string(),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| ApiError::Internal(format!("token signing failed: {e}")))?;

        Ok(IssuedToken {
            token,
            token_type: "Bearer",
            expires_at,
        })
    }

    /// Verify signature, issuer and expiry of a token.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Unauthorized` for any invalid token.
    pub fn verify(&self, token: &str) -> Result<Claims, ApiError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[&self.issuer]);

        decode::<Claims>(token, &self.decoding, &validation)
            .map(|data| data.claims)
            .map_err(|e| {
                tracing::debug!(error = %e, "JWT validation failed");
                ApiError::Unauthorized
            })
    }
}

/// Extract the bearer token from the `Authorization` header.
fn bearer_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Resolve verified claims to the stored user they name.
///
/// The user must still exist under the same account and be active, so
/// disabling a user revokes their outstanding tokens.
fn load_principal(state: &AppState, claims: &Claims) -> Result<Principal, ApiError> {
    let user_id: UserId = claims.sub.parse().map_err(|_| ApiError::Unauthorized)?;
    let user = UserDirectory::new(state.store.as_ref())
        .find_by_id(user_id, claims.account_id)?
        .filter(|user| user.is_active)
        .ok_or_else(|| {
            tracing::debug!(user_id = %user_id, "token subject is unknown or disabled");
            ApiError::Unauthorized
        })?;
    Ok(user.principal())
}

/// An authenticated user.
#[derive(Debug, Clone)]
pub struct AuthPrincipal(pub Principal);

#[async_trait]
impl FromRequestParts<Arc<AppState>> for AuthPrincipal {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        if let Some(principal) = parts.extensions.get::<Principal>() {
            return Ok(Self(principal.clone()));
        }

        let token = bearer_token(parts).ok_or(ApiError::Unauthorized)?;
        let claims = state.tokens.verify(token)?;
        let principal = load_principal(state, &claims)?;

        parts.extensions.insert(principal.clone());
        Ok(Self(principal))
    }
}

/// A platform super admin.
#[derive(Debug, Clone)]
pub struct SuperAdmin {
    /// The authenticated super admin.
    pub principal: Principal,
    /// Capability to read across tenants.
    pub grant: SuperAdminGrant,
}

#[async_trait]
impl FromRequestParts<Arc<AppState>> for SuperAdmin {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let AuthPrincipal(principal) = AuthPrincipal::from_request_parts(parts, state).await?;
        let grant = principal
            .super_admin_grant()
            .ok_or(CrmError::Forbidden {
                role: principal.role,
            })?;

        tracing::debug!(user_id = %principal.id, "Super admin authenticated");

        Ok(Self { principal, grant })
    }
}
