//! Client error types.

use crm_core::{BillingPlan, Feature, ResourceKind};

/// Errors that can occur when using the CRM client.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Missing or rejected credentials.
    #[error("unauthorized")]
    Unauthorized,

    /// The account is locked or past its trial and must be upgraded.
    #[error("payment required ({code}): {message}")]
    PaymentRequired {
        /// `plan_locked`, `account_in_grace` or `account_locked`.
        code: String,
        /// Error message.
        message: String,
    },

    /// The plan does not include a feature.
    #[error("feature {feature:?} not available on {current_plan}")]
    FeatureNotAvailable {
        /// The feature.
        feature: Feature,
        /// Current plan.
        current_plan: BillingPlan,
        /// Lowest plan with the feature.
        minimum_plan: Option<BillingPlan>,
    },

    /// The plan ranks below the one required.
    #[error("plan {current_plan} is below {required_plan}")]
    InsufficientPlan {
        /// Current plan.
        current_plan: BillingPlan,
        /// Required plan.
        required_plan: BillingPlan,
    },

    /// A plan limit has been reached.
    #[error("{entity:?} limit reached: {current}/{limit}")]
    LimitReached {
        /// Limited resource.
        entity: ResourceKind,
        /// The limit.
        limit: u64,
        /// Rows currently owned.
        current: u64,
    },

    /// Resource not found (or owned by another tenant).
    #[error("not found: {0}")]
    NotFound(String),

    /// Server returned any other error response.
    #[error("API error: {code} - {message}")]
    Api {
        /// Error code.
        code: String,
        /// Error message.
        message: String,
        /// HTTP status code.
        status: u16,
    },

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Invalid configuration.
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl ClientError {
    /// Whether upgrading the plan would clear the error.
    #[must_use]
    pub const fn needs_upgrade(&self) -> bool {
        matches!(
            self,
            Self::PaymentRequired { .. }
                | Self::FeatureNotAvailable { .. }
                | Self::InsufficientPlan { .. }
                | Self::LimitReached { .. }
        )
    }
}
