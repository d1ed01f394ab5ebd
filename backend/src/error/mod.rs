use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::Value;

use crate::{repositories::RepositoryError, utils::jwt::TokenError};

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

/// Debug rendering of an internal failure, attached to the response so that
/// the development-only middleware can surface it.
#[derive(Debug, Clone)]
pub struct InternalErrorDetail(pub String);

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    Unauthorized(String),
    #[error("access token expired")]
    TokenExpired,
    #[error("{0}")]
    RefreshFailed(String),
    #[error("not a member of the requested organization")]
    NoTenantAccess,
    #[error("insufficient role")]
    InsufficientRole,
    #[error("organization selection required")]
    TenantSelectionRequired,
    #[error("no organizations")]
    NoOrganizations,
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("validation failed")]
    Validation(Vec<FieldError>),
    #[error(transparent)]
    InternalServerError(#[from] anyhow::Error),
}

impl AppError {
    pub fn unauthorized(message: impl Into<String>) -> Self {
        AppError::Unauthorized(message.into())
    }

    pub fn code(&self) -> &'static str {
        match self {
            AppError::Unauthorized(_) => "UNAUTHORIZED",
            AppError::TokenExpired => "TOKEN_EXPIRED",
            AppError::RefreshFailed(_) => "REFRESH_FAILED",
            AppError::NoTenantAccess => "NO_TENANT_ACCESS",
            AppError::InsufficientRole => "INSUFFICIENT_ROLE",
            AppError::TenantSelectionRequired => "TENANT_SELECTION_REQUIRED",
            AppError::NoOrganizations => "NO_ORGANIZATIONS",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::Conflict(_) => "CONFLICT",
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::InternalServerError(_) => "INTERNAL_SERVER_ERROR",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Unauthorized(_) | AppError::TokenExpired | AppError::RefreshFailed(_) => {
                StatusCode::UNAUTHORIZED
            }
            AppError::NoTenantAccess
            | AppError::InsufficientRole
            | AppError::TenantSelectionRequired
            | AppError::NoOrganizations => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::InternalServerError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let code = self.code().to_string();
        let mut internal_detail = None;

        let (error_message, details) = match self {
            AppError::Validation(errors) => (
                "Validation failed".to_string(),
                Some(serde_json::json!({ "errors": errors })),
            ),
            AppError::InternalServerError(err) => {
                tracing::error!("Internal server error: {:?}", err);
                internal_detail = Some(InternalErrorDetail(format!("{:?}", err)));
                ("Internal server error".to_string(), None)
            }
            AppError::NoOrganizations => (
                "Your account does not belong to any organization".to_string(),
                None,
            ),
            other => (other.to_string(), None),
        };

        let body = Json(ErrorResponse {
            error: error_message,
            code,
            details,
        });

        let mut response = (status, body).into_response();
        if let Some(detail) = internal_detail {
            response.extensions_mut().insert(detail);
        }
        response
    }
}

impl From<TokenError> for AppError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Expired => AppError::TokenExpired,
            TokenError::WrongKind { .. } | TokenError::Invalid => {
                AppError::unauthorized("Invalid access token")
            }
        }
    }
}

impl From<RepositoryError> for AppError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::Conflict(msg) => AppError::Conflict(msg),
            RepositoryError::NotFound(msg) => AppError::NotFound(msg),
            RepositoryError::Backend(err) => AppError::InternalServerError(err),
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut fields: Vec<FieldError> = errors
            .field_errors()
            .into_iter()
            .flat_map(|(field, errs)| {
                errs.iter().map(move |e| FieldError {
                    field: field.to_string(),
                    message: e
                        .message
                        .as_ref()
                        .map(|message| message.to_string())
                        .unwrap_or_else(|| e.code.to_string()),
                })
            })
            .collect();
        fields.sort_by(|a, b| a.field.cmp(&b.field));
        AppError::Validation(fields)
    }
}
