//! API error types and responses.
//!
//! Every failure leaves the service as `{"error": {"code", "message", "details"}}`.
//! Billing failures carry the dates or plans a client needs to render an
//! upgrade prompt; plan and limit failures carry current versus required.

use axum::extract::rejection::JsonRejection;
use axum::extract::FromRequest;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::{json, Value};

use crm_core::CrmError;

/// API error type.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Unauthorized - missing or invalid credentials.
    #[error("unauthorized")]
    Unauthorized,

    /// Billing required: the account is locked or past its trial (402).
    #[error("{message}")]
    PaymentRequired {
        /// Machine-readable code.
        code: &'static str,
        /// Human-readable message.
        message: String,
        /// Relevant dates.
        details: Value,
    },

    /// Valid credentials but the role, plan or limit does not allow the operation (403).
    #[error("{message}")]
    Forbidden {
        /// Machine-readable code.
        code: &'static str,
        /// Human-readable message.
        message: String,
        /// Current versus required values.
        details: Option<Value>,
    },

    /// Resource not found. Also used for rows owned by another tenant.
    #[error("{message}")]
    NotFound {
        /// Machine-readable code.
        code: &'static str,
        /// Human-readable message.
        message: String,
    },

    /// Bad request - invalid input.
    #[error("{message}")]
    BadRequest {
        /// Machine-readable code.
        code: &'static str,
        /// Human-readable message.
        message: String,
        /// Offending values.
        details: Option<Value>,
    },

    /// Conflict - resource already exists.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    /// A 400 with code `validation_error`.
    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::BadRequest {
            code: "validation_error",
            message: message.into(),
            details: None,
        }
    }

    /// A 404 for a tenant record, identical whether the id is unknown or foreign.
    #[must_use]
    pub fn not_found(entity: &str) -> Self {
        Self::NotFound {
            code: "not_found",
            message: format!("{entity} not found"),
        }
    }
}

/// JSON error response body.
#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    code: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<Value>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message, details) = match self {
            Self::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "unauthorized",
                "unauthorized".to_string(),
                None,
            ),
            Self::PaymentRequired {
                code,
                message,
                details,
            } => (StatusCode::PAYMENT_REQUIRED, code, message, Some(details)),
            Self::Forbidden {
                code,
                message,
                details,
            } => (StatusCode::FORBIDDEN, code, message, details),
            Self::NotFound { code, message } => (StatusCode::NOT_FOUND, code, message, None),
            Self::BadRequest {
                code,
                message,
                details,
            } => (StatusCode::BAD_REQUEST, code, message, details),
            Self::Conflict(message) => (StatusCode::CONFLICT, "conflict", message, None),
            Self::Internal(msg) => {
                tracing::error!(error = %msg, "Internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "An internal error occurred".to_string(),
                    None,
                )
            }
        };

        let body = ErrorResponse {
            error: ErrorBody {
                code: code.to_string(),
                message,
                details,
            },
        };

        (status, Json(body)).into_response()
    }
}

impl From<CrmError> for ApiError {
    fn from(err: CrmError) -> Self {
        let message = err.to_string();
        match err {
            CrmError::Unauthorized => Self::Unauthorized,
            CrmError::Forbidden { role } => Self::Forbidden {
                code: "forbidden",
                message,
                details: Some(json!({ "role": role })),
            },
            CrmError::AccountRequired => Self::BadRequest {
                code: "account_required",
                message,
                details: None,
            },
            CrmError::AccountNotFound => Self::NotFound {
                code: "account_not_found",
                message,
            },
            CrmError::AccountInactive => Self::Forbidden {
                code: "account_inactive",
                message,
                details: None,
            },
            CrmError::PlanLocked => Self::PaymentRequired {
                code: "plan_locked",
                message,
                details: json!({}),
            },
            CrmError::AccountInGrace {
                trial_ends_at,
                grace_ends_at,
            } => Self::PaymentRequired {
                code: "account_in_grace",
                message,
                details: json!({
                    "trial_ends_at": trial_ends_at,
                    "grace_ends_at": grace_ends_at,
                }),
            },
            CrmError::AccountLocked { grace_ends_at } => Self::PaymentRequired {
                code: "account_locked",
                message,
                details: json!({ "grace_ends_at": grace_ends_at }),
            },
            CrmError::InsufficientPlan { current, required } => Self::Forbidden {
                code: "insufficient_plan",
                message,
                details: Some(json!({
                    "current_plan": current,
                    "required_plan": required,
                })),
            },
            CrmError::FeatureNotAvailable {
                feature,
                current_plan,
                minimum_plan,
            } => Self::Forbidden {
                code: "feature_not_available",
                message,
                details: Some(json!({
                    "feature": feature,
                    "current_plan": current_plan,
                    "minimum_plan": minimum_plan,
                })),
            },
            CrmError::LimitReached {
                entity,
                limit,
                current,
            } => Self::Forbidden {
                code: "limit_reached",
                message,
                details: Some(json!({
                    "entity": entity,
                    "limit": limit,
                    "current": current,
                })),
            },
            CrmError::NotFound { entity } => Self::not_found(entity),
            CrmError::InvalidReference { entity, id } => Self::BadRequest {
                code: "invalid_reference",
                message,
                details: Some(json!({ "entity": entity, "id": id })),
            },
            CrmError::InvalidPlanTransition { from, to } => Self::BadRequest {
                code: "invalid_plan_transition",
                message,
                details: Some(json!({ "from": from, "to": to })),
            },
            CrmError::Validation(_) => Self::BadRequest {
                code: "validation_error",
                message,
                details: None,
            },
            CrmError::InvalidId(_) => Self::BadRequest {
                code: "bad_request",
                message,
                details: None,
            },
            CrmError::Conflict(msg) => Self::Conflict(msg),
            CrmError::InvalidCatalog(msg) | CrmError::Storage(msg) => Self::Internal(msg),
        }
    }
}

impl From<crm_store::StoreError> for ApiError {
    fn from(err: crm_store::StoreError) -> Self {
        Self::Internal(err.to_string())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest {
            code: "bad_request",
            message: rejection.body_text(),
            details: None,
        }
    }
}

/// JSON request body whose rejections use the API error envelope.
#[derive(Debug, FromRequest)]
#[from_request(via(Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);
