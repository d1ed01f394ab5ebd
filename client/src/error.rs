use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Error body emitted by the API for every non-success status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiErrorBody {
    pub error: String,
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

/// Authorization failures are never retried; the kind lets callers tell
/// "wrong organization" from "wrong role" without parsing messages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ForbiddenKind {
    NoTenantAccess,
    InsufficientRole,
    TenantSelectionRequired,
    Other(String),
}

impl ForbiddenKind {
    pub fn from_code(code: &str) -> Self {
        match code {
            "NO_TENANT_ACCESS" => ForbiddenKind::NoTenantAccess,
            "INSUFFICIENT_ROLE" => ForbiddenKind::InsufficientRole,
            "TENANT_SELECTION_REQUIRED" => ForbiddenKind::TenantSelectionRequired,
            other => ForbiddenKind::Other(other.to_string()),
        }
    }

    pub fn code(&self) -> &str {
        match self {
            ForbiddenKind::NoTenantAccess => "NO_TENANT_ACCESS",
            ForbiddenKind::InsufficientRole => "INSUFFICIENT_ROLE",
            ForbiddenKind::TenantSelectionRequired => "TENANT_SELECTION_REQUIRED",
            ForbiddenKind::Other(code) => code,
        }
    }
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum ClientError {
    /// Renewal failed; the caller has to authenticate again.
    #[error("session expired")]
    SessionExpired,
    #[error("forbidden: {}", .0.code())]
    Forbidden(ForbiddenKind),
    #[error("account does not belong to any organization")]
    NoOrganizations,
    #[error("validation failed")]
    Validation(Vec<FieldError>),
    #[error("{status}: {message}")]
    Http {
        status: StatusCode,
        code: String,
        message: String,
    },
    #[error("request timed out")]
    Timeout,
    #[error("transport error: {0}")]
    Transport(String),
    #[error("failed to decode response: {0}")]
    Decode(String),
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl ClientError {
    pub fn code(&self) -> &str {
        match self {
            ClientError::SessionExpired => "SESSION_EXPIRED",
            ClientError::Forbidden(kind) => kind.code(),
            ClientError::NoOrganizations => "NO_ORGANIZATIONS",
            ClientError::Validation(_) => "VALIDATION_ERROR",
            ClientError::Http { code, .. } => code,
            ClientError::Timeout => "TIMEOUT",
            ClientError::Transport(_) => "TRANSPORT_ERROR",
            ClientError::Decode(_) => "DECODE_ERROR",
            ClientError::InvalidRequest(_) => "INVALID_REQUEST",
        }
    }

    /// Builds the error for a non-success response from its status and body.
    pub fn from_response(status: StatusCode, body: Option<ApiErrorBody>) -> Self {
        let body = body.unwrap_or_else(|| ApiErrorBody {
            error: status
                .canonical_reason()
                .unwrap_or("request failed")
                .to_string(),
            code: format!("HTTP_{}", status.as_u16()),
            details: None,
        });

        match (status, body.code.as_str()) {
            (StatusCode::FORBIDDEN, "NO_ORGANIZATIONS") => ClientError::NoOrganizations,
            (StatusCode::FORBIDDEN, code) => ClientError::Forbidden(ForbiddenKind::from_code(code)),
            (StatusCode::BAD_REQUEST, "VALIDATION_ERROR") => {
                ClientError::Validation(field_errors(body.details.as_ref()))
            }
            _ => ClientError::Http {
                status,
                code: body.code,
                message: body.error,
            },
        }
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ClientError::Timeout
        } else if err.is_decode() {
            ClientError::Decode(err.to_string())
        } else {
            ClientError::Transport(err.to_string())
        }
    }
}

fn field_errors(details: Option<&Value>) -> Vec<FieldError> {
    details
        .and_then(|details| details.get("errors"))
        .and_then(|errors| serde_json::from_value(errors.clone()).ok())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn body(code: &str, details: Option<Value>) -> Option<ApiErrorBody> {
        Some(ApiErrorBody {
            error: "message".into(),
            code: code.into(),
            details,
        })
    }

    #[test]
    fn forbidden_codes_map_to_kinds() {
        let cases = [
            ("NO_TENANT_ACCESS", ForbiddenKind::NoTenantAccess),
            ("INSUFFICIENT_ROLE", ForbiddenKind::InsufficientRole),
            (
                "TENANT_SELECTION_REQUIRED",
                ForbiddenKind::TenantSelectionRequired,
            ),
            ("SOMETHING_ELSE", ForbiddenKind::Other("SOMETHING_ELSE".into())),
        ];
        for (code, kind) in cases {
            match ClientError::from_response(StatusCode::FORBIDDEN, body(code, None)) {
                ClientError::Forbidden(actual) => assert_eq!(actual, kind),
                other => panic!("unexpected {other:?}"),
            }
        }
    }

    #[test]
    fn no_organizations_is_distinct_from_forbidden() {
        let err = ClientError::from_response(StatusCode::FORBIDDEN, body("NO_ORGANIZATIONS", None));
        assert!(matches!(err, ClientError::NoOrganizations));
        assert_eq!(err.code(), "NO_ORGANIZATIONS");
    }

    #[test]
    fn validation_details_are_parsed() {
        let err = ClientError::from_response(
            StatusCode::BAD_REQUEST,
            body(
                "VALIDATION_ERROR",
                Some(json!({ "errors": [{ "field": "email", "message": "bad" }] })),
            ),
        );
        match err {
            ClientError::Validation(fields) => {
                assert_eq!(fields.len(), 1);
                assert_eq!(fields[0].field, "email");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn missing_body_falls_back_to_status() {
        let err = ClientError::from_response(StatusCode::BAD_GATEWAY, None);
        assert_eq!(err.code(), "HTTP_502");
    }
}
