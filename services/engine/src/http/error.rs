//! JSON error responses

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use tracing::error;

use crate::admin::AdminError;
use crate::auth::AuthError;
use crate::records::{RecordError, ValidationError};

/// Error body: `{"detail": "...", "kind": "..."}`
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub kind: &'static str,
    pub detail: String,
}

impl ApiError {
    pub fn new(status: StatusCode, kind: &'static str, detail: impl Into<String>) -> Self {
        Self {
            status,
            kind,
            detail: detail.into(),
        }
    }

    fn storage(err: impl std::fmt::Display) -> Self {
        error!(error = %err, "Storage failure");
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "store",
            "Storage temporarily unavailable",
        )
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(serde_json::json!({
            "detail": self.detail,
            "kind": self.kind,
        }));
        (self.status, body).into_response()
    }
}

impl From<RecordError> for ApiError {
    fn from(err: RecordError) -> Self {
        let status = match &err {
            RecordError::Validation(ValidationError::QuotaExceeded { .. }) => StatusCode::FORBIDDEN,
            RecordError::Validation(_) => StatusCode::BAD_REQUEST,
            RecordError::NotFound => StatusCode::NOT_FOUND,
            RecordError::Provider(_) => StatusCode::BAD_GATEWAY,
            RecordError::Consistency { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            RecordError::Store(e) => return Self::storage(e),
        };
        Self::new(status, err.kind(), err.to_string())
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        let status = match &err {
            AuthError::InvalidEmail
            | AuthError::EmailDomainNotAllowed { .. }
            | AuthError::PasswordTooShort { .. }
            | AuthError::EmailTaken => StatusCode::BAD_REQUEST,
            AuthError::InvalidCredentials
            | AuthError::NotAuthenticated
            | AuthError::TokenExpired
            | AuthError::InvalidToken
            | AuthError::UserNotFound => StatusCode::UNAUTHORIZED,
            AuthError::AdminRequired => StatusCode::FORBIDDEN,
            AuthError::Store(e) => return Self::storage(e),
            AuthError::Internal(e) => {
                error!(error = %e, "Auth failure");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        Self::new(status, err.kind(), err.to_string())
    }
}

impl From<AdminError> for ApiError {
    fn from(err: AdminError) -> Self {
        match err {
            AdminError::UserNotFound => Self::new(StatusCode::NOT_FOUND, "not_found", err.to_string()),
            AdminError::ProtectedUser => {
                Self::new(StatusCode::BAD_REQUEST, "validation", err.to_string())
            }
            AdminError::Records(e) => e.into(),
            AdminError::Store(e) => Self::storage(e),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::new(rejection.status(), "invalid_body", rejection.body_text())
    }
}
