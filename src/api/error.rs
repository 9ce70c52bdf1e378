//! API error types with structured JSON responses.
//!
//! Every failure leaves the server as `{"error": {"code", "message"}}`.
//! Codes follow the callable-function vocabulary the client already
//! handles; validation failures add a `fields` list.

use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::accounts::CallableError;
use crate::core_state::CoreError;
use crate::db::DatabaseError;
use crate::prescription::PrescriptionError;
use crate::validation::{FieldError, ValidationErrors};

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub code: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<FieldError>,
}

/// API-level errors with HTTP status mapping.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Authentication required")]
    Unauthenticated,
    #[error("Invalid credentials")]
    InvalidCredentials { remaining: u32 },
    #[error("Permission denied: {0}")]
    PermissionDenied(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    #[error("Validation failed: {0}")]
    Validation(ValidationErrors),
    #[error("Already exists: {0}")]
    AlreadyExists(String),
    #[error("Too many attempts")]
    ResourceExhausted { retry_after: u64 },
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::Unauthenticated | ApiError::InvalidCredentials { .. } => "unauthenticated",
            ApiError::PermissionDenied(_) => "permission-denied",
            ApiError::NotFound(_) => "not-found",
            ApiError::InvalidArgument(_) | ApiError::Validation(_) => "invalid-argument",
            ApiError::AlreadyExists(_) => "already-exists",
            ApiError::ResourceExhausted { .. } => "resource-exhausted",
            ApiError::Internal(_) => "internal",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthenticated | ApiError::InvalidCredentials { .. } => StatusCode::UNAUTHORIZED,
            ApiError::PermissionDenied(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::InvalidArgument(_) | ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::AlreadyExists(_) => StatusCode::CONFLICT,
            ApiError::ResourceExhausted { .. } => StatusCode::TOO_MANY_REQUESTS,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let code = self.code();
        let (message, fields) = match &self {
            ApiError::Unauthenticated => ("Authentication required".to_string(), Vec::new()),
            ApiError::InvalidCredentials { remaining } => (
                format!("Incorrect e-mail or password. {remaining} attempt(s) remaining"),
                Vec::new(),
            ),
            ApiError::PermissionDenied(detail)
            | ApiError::NotFound(detail)
            | ApiError::InvalidArgument(detail)
            | ApiError::AlreadyExists(detail) => (detail.clone(), Vec::new()),
            ApiError::Validation(errors) => ("Invalid input".to_string(), errors.errors.clone()),
            ApiError::ResourceExhausted { retry_after } => (
                format!("Too many attempts. Retry after {retry_after}s"),
                Vec::new(),
            ),
            ApiError::Internal(detail) => {
                tracing::error!(detail, "API internal error");
                ("An internal error occurred".to_string(), Vec::new())
            }
        };

        let body = ErrorBody {
            error: ErrorDetail {
                code,
                message,
                fields,
            },
        };

        let mut response = (status, Json(body)).into_response();
        if let ApiError::ResourceExhausted { retry_after } = &self {
            if let Ok(val) = HeaderValue::from_str(&retry_after.to_string()) {
                response.headers_mut().insert("Retry-After", val);
            }
        }
        response
    }
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::LockPoisoned => ApiError::Internal("lock poisoned".into()),
            CoreError::Database(e) => e.into(),
        }
    }
}

impl From<DatabaseError> for ApiError {
    fn from(err: DatabaseError) -> Self {
        if err.is_unique_violation() {
            return ApiError::AlreadyExists("A record with the same unique value already exists".into());
        }
        match err {
            DatabaseError::NotFound { entity_type, id } => {
                ApiError::NotFound(format!("{entity_type} {id} not found"))
            }
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<ValidationErrors> for ApiError {
    fn from(err: ValidationErrors) -> Self {
        ApiError::Validation(err)
    }
}

impl From<CallableError> for ApiError {
    fn from(err: CallableError) -> Self {
        match err {
            CallableError::Unauthenticated => ApiError::Unauthenticated,
            CallableError::PermissionDenied => {
                ApiError::PermissionDenied(CallableError::PermissionDenied.to_string())
            }
            CallableError::InvalidArgument(errors) => ApiError::Validation(errors),
            e @ CallableError::AlreadyExists(_) => ApiError::AlreadyExists(e.to_string()),
            CallableError::Internal(detail) => ApiError::Internal(detail),
        }
    }
}

impl From<PrescriptionError> for ApiError {
    fn from(err: PrescriptionError) -> Self {
        ApiError::Internal(err.to_string())
    }
}
