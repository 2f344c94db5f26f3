//! CRM HTTP client implementation.

use std::time::Duration;

use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crm_core::{AccountId, BillingPlan, PlanConfig, RecordId, TenantRecord, UserId, UserProfile};

use crate::error::ClientError;
use crate::types::{
    ApiErrorResponse, BillingCurrent, CreateUserRequest, LoginRequest, Me, RegisterRequest,
    Registration, Session, UpgradeRequest,
};

/// Header selecting the tenant a super admin acts in.
const ACCOUNT_HEADER: &str = "x-account-id";

/// CRM API client.
///
/// Cheap to clone. Credentials and tenant selection are fixed per instance;
/// derive variants with [`Self::with_token`] and [`Self::for_account`].
#[derive(Debug, Clone)]
pub struct CrmClient {
    client: Client,
    base_url: String,
    token: Option<String>,
    account_id: Option<AccountId>,
}

impl CrmClient {
    /// Create a new client.
    ///
    /// # Arguments
    ///
    /// * `base_url` - Base URL of the CRM service (e.g., `"http://crm:8080"`)
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Http`] if the HTTP client cannot be built.
    pub fn new(base_url: impl Into<String>) -> Result<Self, ClientError> {
        Self::with_options(base_url, ClientOptions::default())
    }

    /// Create a new client with custom options.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Configuration`] for an empty base URL and
    /// [`ClientError::Http`] if the HTTP client cannot be built.
    pub fn with_options(
        base_url: impl Into<String>,
        options: ClientOptions,
    ) -> Result<Self, ClientError> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        if base_url.is_empty() {
            return Err(ClientError::Configuration("base URL must not be empty".into()));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(options.timeout_seconds))
            .build()?;

        Ok(Self {
            client,
            base_url,
            token: None,
            account_id: None,
        })
    }

    /// A copy of this client that authenticates with `token`.
    #[must_use]
    pub fn with_token(&self, token: impl Into<String>) -> Self {
        Self {
            token: Some(token.into()),
            ..self.clone()
        }
    }

    /// A copy of this client that acts in `account_id`.
    ///
    /// Only honored for super admins; tenant users always act in their own account.
    #[must_use]
    pub fn for_account(&self, account_id: AccountId) -> Self {
        Self {
            account_id: Some(account_id),
            ..self.clone()
        }
    }

    // ------------------------------------------------------------------------
    // Auth
    // ------------------------------------------------------------------------

    /// Log in with an email or username.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Unauthorized`] for a bad credential.
    pub async fn login(
        &self,
        login: impl Into<String>,
        password: impl Into<String>,
    ) -> Result<Session, ClientError> {
        let request = LoginRequest {
            login: login.into(),
            password: password.into(),
        };
        Self::send(self.request(Method::POST, "/auth/login").json(&request))
            .await
    }

    /// Sign up a new tenant.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the server returns an error.
    pub async fn register(&self, request: &RegisterRequest) -> Result<Registration, ClientError> {
        Self::send(self.request(Method::POST, "/auth/register").json(request))
            .await
    }

    /// The authenticated user and their account.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the server returns an error.
    pub async fn me(&self) -> Result<Me, ClientError> {
        Self::send(self.request(Method::GET, "/auth/me")).await
    }

    // ------------------------------------------------------------------------
    // Billing
    // ------------------------------------------------------------------------

    /// Current plan, status, limits and usage.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the server returns an error.
    pub async fn billing(&self) -> Result<BillingCurrent, ClientError> {
        Self::send(self.request(Method::GET, "/billing/current"))
            .await
    }

    /// The plan catalog, in ladder order.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the server returns an error.
    pub async fn plans(&self) -> Result<Vec<PlanConfig>, ClientError> {
        Self::send(self.request(Method::GET, "/billing/plans")).await
    }

    /// Upgrade the account to a paid plan.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the server returns an error.
    pub async fn upgrade(&self, plan: BillingPlan) -> Result<BillingCurrent, ClientError> {
        Self::send(
            self.request(Method::POST, "/billing/upgrade")
                .json(&UpgradeRequest { plan }),
        )
        .await
    }

    // ------------------------------------------------------------------------
    // Records
    // ------------------------------------------------------------------------

    /// List all records of type `T` in the current tenant.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the server returns an error.
    pub async fn list<T: TenantRecord>(&self) -> Result<Vec<T>, ClientError> {
        Self::send(self.request(Method::GET, &collection::<T>())).await
    }

    /// Fetch one record.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::NotFound`] for unknown (or foreign) ids.
    pub async fn get<T: TenantRecord>(&self, id: T::Id) -> Result<T, ClientError> {
        Self::send(self.request(Method::GET, &member::<T>(id))).await
    }

    /// Create a record.
    ///
    /// # Errors
    ///
    /// Returns a plan or billing error if the tenant may not create it.
    pub async fn create<T>(&self, input: &T::Create) -> Result<T, ClientError>
    where
        T: TenantRecord,
        T::Create: Serialize + Sync,
    {
        Self::send(self.request(Method::POST, &collection::<T>()).json(input))
            .await
    }

    /// Partially update a record.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the server returns an error.
    pub async fn update<T>(&self, id: T::Id, patch: &T::Patch) -> Result<T, ClientError>
    where
        T: TenantRecord,
        T::Patch: Serialize + Sync,
    {
        Self::send(self.request(Method::PATCH, &member::<T>(id)).json(patch))
            .await
    }

    /// Delete a record.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::NotFound`] for unknown (or foreign) ids.
    pub async fn delete<T: TenantRecord>(&self, id: T::Id) -> Result<(), ClientError> {
        Self::send_empty(self.request(Method::DELETE, &member::<T>(id)))
            .await
    }

    // ------------------------------------------------------------------------
    // Users
    // ------------------------------------------------------------------------

    /// List the tenant's users.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the server returns an error.
    pub async fn list_users(&self) -> Result<Vec<UserProfile>, ClientError> {
        Self::send(self.request(Method::GET, "/users")).await
    }

    /// Add a user to the tenant.
    ///
    /// # Errors
    ///
    /// Returns a limit error if the plan has no free user slot.
    pub async fn create_user(
        &self,
        request: &CreateUserRequest,
    ) -> Result<UserProfile, ClientError> {
        Self::send(self.request(Method::POST, "/users").json(request))
            .await
    }

    /// Remove a user from the tenant.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the server returns an error.
    pub async fn delete_user(&self, id: UserId) -> Result<(), ClientError> {
        Self::send_empty(self.request(Method::DELETE, &format!("/users/{id}")))
            .await
    }

    // ------------------------------------------------------------------------
    // Plumbing
    // ------------------------------------------------------------------------

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let mut builder = self
            .client
            .request(method, format!("{}{path}", self.base_url));
        if let Some(token) = &self.token {
            builder = builder.bearer_auth(token);
        }
        if let Some(account_id) = self.account_id {
            builder = builder.header(ACCOUNT_HEADER, account_id.to_string());
        }
        builder
    }

    async fn send<T: DeserializeOwned>(builder: RequestBuilder) -> Result<T, ClientError> {
        let response = builder.send().await?;
        if response.status().is_success() {
            return Ok(response.json().await?);
        }
        Err(Self::error_from(response).await)
    }

    async fn send_empty(builder: RequestBuilder) -> Result<(), ClientError> {
        let response = builder.send().await?;
        if response.status().is_success() {
            return Ok(());
        }
        Err(Self::error_from(response).await)
    }

    /// Convert an error response into a typed error.
    async fn error_from(response: reqwest::Response) -> ClientError {
        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            return ClientError::Unauthorized;
        }

        let Ok(body) = response.json::<ApiErrorResponse>().await else {
            return ClientError::Api {
                code: "unknown".to_string(),
                message: format!("HTTP {status}"),
                status: status.as_u16(),
            };
        };
        let error = body.error;
        tracing::debug!(code = %error.code, status = status.as_u16(), "CRM API error");

        let details = error.details.unwrap_or(Value::Null);
        let typed = match error.code.as_str() {
            "plan_locked" | "account_in_grace" | "account_locked" => {
                Some(ClientError::PaymentRequired {
                    code: error.code.clone(),
                    message: error.message.clone(),
                })
            }
            "feature_not_available" => field(&details, "feature").and_then(|feature| {
                Some(ClientError::FeatureNotAvailable {
                    feature,
                    current_plan: field(&details, "current_plan")?,
                    minimum_plan: field(&details, "minimum_plan"),
                })
            }),
            "insufficient_plan" => field(&details, "current_plan").and_then(|current_plan| {
                Some(ClientError::InsufficientPlan {
                    current_plan,
                    required_plan: field(&details, "required_plan")?,
                })
            }),
            "limit_reached" => field(&details, "entity").and_then(|entity| {
                Some(ClientError::LimitReached {
                    entity,
                    limit: field(&details, "limit")?,
                    current: field(&details, "current")?,
                })
            }),
            "not_found" | "account_not_found" => {
                Some(ClientError::NotFound(error.message.clone()))
            }
            _ => None,
        };

        typed.unwrap_or(ClientError::Api {
            code: error.code,
            message: error.message,
            status: status.as_u16(),
        })
    }
}

fn field<T: DeserializeOwned>(details: &Value, name: &str) -> Option<T> {
    details
        .get(name)
        .and_then(|value| serde_json::from_value(value.clone()).ok())
}

fn collection<T: TenantRecord>() -> String {
    format!("/{}", T::TABLE.as_str())
}

fn member<T: TenantRecord>(id: T::Id) -> String {
    format!("/{}/{}", T::TABLE.as_str(), id.raw())
}

/// Client options for customization.
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// Request timeout in seconds (default: 30).
    pub timeout_seconds: u64,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self { timeout_seconds: 30 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crm_core::{Company, CompanyId, Deal};

    #[test]
    fn client_trims_trailing_slash() {
        let client = CrmClient::new("http://localhost:8080/").unwrap();
        assert_eq!(client.base_url, "http://localhost:8080");
    }

    #[test]
    fn empty_base_url_is_rejected() {
        assert!(matches!(
            CrmClient::new("/"),
            Err(ClientError::Configuration(_))
        ));
    }

    #[test]
    fn derived_clients_keep_settings() {
        let client = CrmClient::new("http://localhost:8080").unwrap();
        let scoped = client.with_token("t").for_account(AccountId::new(9));
        assert_eq!(scoped.token.as_deref(), Some("t"));
        assert_eq!(scoped.account_id, Some(AccountId::new(9)));
        assert!(client.token.is_none());
    }

    #[test]
    fn record_paths() {
        assert_eq!(collection::<Deal>(), "/deals");
        assert_eq!(member::<Company>(CompanyId::new(12)), "/companies/12");
    }
}
