//! Service configuration.

use std::path::Path;

use crm_core::{CrmError, PlanCatalog};

/// Default token lifetime: 24 hours.
const DEFAULT_TOKEN_TTL_SECONDS: i64 = 24 * 60 * 60;

/// Default lifecycle job period: once a day.
const DEFAULT_LIFECYCLE_INTERVAL_SECONDS: u64 = 24 * 60 * 60;

/// Service configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Address to listen on (default: "0.0.0.0:8080").
    pub listen_addr: String,

    /// Path to `RocksDB` data directory (default: "/data/crm").
    pub data_dir: String,

    /// HMAC secret used to sign access tokens.
    pub jwt_secret: String,

    /// Issuer claim of access tokens (default: "crm-service").
    pub jwt_issuer: String,

    /// Access token lifetime in seconds.
    pub token_ttl_seconds: i64,

    /// CORS allowed origins.
    pub cors_origins: Vec<String>,

    /// Maximum request body size in bytes.
    pub max_body_bytes: usize,

    /// Request timeout in seconds.
    pub request_timeout_seconds: u64,

    /// Period of the billing lifecycle job in seconds.
    pub lifecycle_interval_seconds: u64,

    /// JSON plan catalog overriding the built-in one.
    pub plan_catalog_path: Option<String>,

    /// Email of the super admin created at startup if missing.
    pub bootstrap_admin_email: Option<String>,

    /// Password of the bootstrap super admin.
    pub bootstrap_admin_password: Option<String>,
}

impl ServiceConfig {
    /// Load configuration from environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        let jwt_secret = std::env::var("JWT_SECRET").unwrap_or_else(|_| {
            tracing::warn!(
                "JWT_SECRET not set - using an ephemeral secret, tokens will not survive a restart"
            );
            ephemeral_secret()
        });

        Self {
            listen_addr: std::env::var("LISTEN_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".into()),
            data_dir: std::env::var("DATA_DIR").unwrap_or_else(|_| "/data/crm".into()),
            jwt_secret,
            jwt_issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "crm-service".into()),
            token_ttl_seconds: parse_env("TOKEN_TTL_SECONDS").unwrap_or(DEFAULT_TOKEN_TTL_SECONDS),
            cors_origins: std::env::var("CORS_ORIGINS")
                .unwrap_or_else(|_| "*".into())
                .split(',')
                .map(|s| s.trim().to_string())
                .collect(),
            max_body_bytes: parse_env("MAX_BODY_BYTES").unwrap_or(1024 * 1024), // 1MB
            request_timeout_seconds: parse_env("REQUEST_TIMEOUT_SECONDS").unwrap_or(30),
            lifecycle_interval_seconds: parse_env("LIFECYCLE_INTERVAL_SECONDS")
                .unwrap_or(DEFAULT_LIFECYCLE_INTERVAL_SECONDS),
            plan_catalog_path: std::env::var("PLAN_CATALOG_PATH").ok(),
            bootstrap_admin_email: std::env::var("BOOTSTRAP_ADMIN_EMAIL").ok(),
            bootstrap_admin_password: std::env::var("BOOTSTRAP_ADMIN_PASSWORD").ok(),
        }
    }

    /// Build the plan catalog: the file at `plan_catalog_path` if set, else the built-in one.
    ///
    /// # Errors
    ///
    /// Returns `CrmError::InvalidCatalog` if the file cannot be read or fails validation.
    pub fn plan_catalog(&self) -> Result<PlanCatalog, CrmError> {
        match &self.plan_catalog_path {
            Some(path) => load_plan_catalog(path),
            None => Ok(PlanCatalog::standard()),
        }
    }
}

/// Read and validate a JSON plan catalog.
///
/// # Errors
///
/// Returns `CrmError::InvalidCatalog` if the file cannot be read or fails validation.
pub fn load_plan_catalog(path: impl AsRef<Path>) -> Result<PlanCatalog, CrmError> {
    let path = path.as_ref();
    let contents = std::fs::read_to_string(path)
        .map_err(|e| CrmError::InvalidCatalog(format!("{}: {e}", path.display())))?;
    let catalog = PlanCatalog::from_json(&contents)?;
    tracing::info!(path = %path.display(), "Loaded plan catalog from file");
    Ok(catalog)
}

fn parse_env<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|s| s.parse().ok())
}

fn ephemeral_secret() -> String {
    format!(
        "{}{}",
        uuid::Uuid::new_v4().simple(),
        uuid::Uuid::new_v4().simple()
    )
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8080".into(),
            data_dir: "/data/crm".into(),
            jwt_secret: ephemeral_secret(),
            jwt_issuer: "crm-service".into(),
            token_ttl_seconds: DEFAULT_TOKEN_TTL_SECONDS,
            cors_origins: vec!["*".into()],
            max_body_bytes: 1024 * 1024,
            request_timeout_seconds: 30,
            lifecycle_interval_seconds: DEFAULT_LIFECYCLE_INTERVAL_SECONDS,
            plan_catalog_path: None,
            bootstrap_admin_email: None,
            bootstrap_admin_password: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crm_core::BillingPlan;
    use std::io::Write;

    #[test]
    fn default_uses_builtin_catalog() {
        let config = ServiceConfig::default();
        assert_eq!(config.plan_catalog().unwrap(), PlanCatalog::standard());
        assert_eq!(config.jwt_secret.len(), 64);
    }

    #[test]
    fn catalog_file_overrides_builtin() {
        let mut plans: Vec<_> = PlanCatalog::standard().iter().cloned().collect();
        plans[1].max_companies = Some(60);
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(serde_json::to_string(&plans).unwrap().as_bytes())
            .unwrap();

        let config = ServiceConfig {
            plan_catalog_path: Some(file.path().to_string_lossy().to_string()),
            ..ServiceConfig::default()
        };
        let catalog = config.plan_catalog().unwrap();
        assert_eq!(catalog.get(BillingPlan::Starter).max_companies, Some(60));
    }

    #[test]
    fn missing_catalog_file_is_an_error() {
        let result = load_plan_catalog("/nonexistent/plans.json");
        assert!(matches!(result, Err(CrmError::InvalidCatalog(_))));
    }
}
