//! Models that represent users and authentication payloads.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::validation::rules::validate_display_name;

#[derive(Debug, Clone, Serialize, Deserialize)]
/// Directory representation of a user account.
pub struct User {
    /// Unique identifier for the user.
    pub id: String,
    /// Login identifier, stored lowercase.
    pub email: String,
    /// Human-readable name.
    pub display_name: String,
    /// Opaque credential hash owned by the directory.
    #[serde(skip_serializing)]
    pub password_hash: String,
    /// Creation timestamp for auditing.
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
/// Public projection of a user returned by the auth endpoints.
pub struct UserResponse {
    pub id: String,
    pub email: String,
    pub display_name: String,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        UserResponse {
            id: user.id,
            email: user.email,
            display_name: user.display_name,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
/// Credentials submitted by a user attempting to authenticate.
pub struct LoginRequest {
    #[validate(email(message = "must be a valid email address"))]
    pub email: String,
    #[validate(length(min = 1, message = "must not be empty"))]
    pub password: String,
    /// Clients that cannot store cookies ask for the tokens in the body.
    #[serde(default)]
    pub return_tokens: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
/// Payload for creating an account together with its first organization.
pub struct RegisterRequest {
    #[validate(email(message = "must be a valid email address"))]
    pub email: String,
    #[validate(length(min = 8, message = "must be at least 8 characters"))]
    pub password: String,
    #[validate(custom(function = "validate_display_name"))]
    pub display_name: String,
    #[validate(length(min = 1, max = 100, message = "must be 1-100 characters"))]
    pub organization_name: String,
    #[serde(default)]
    pub return_tokens: bool,
}

/// Fields handed to the directory when registering.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub display_name: String,
    pub password: String,
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_response_drops_credential_hash() {
        let user = User {
            id: "u1".into(),
            email: "alice@example.com".into(),
            display_name: "Alice".into(),
            password_hash: "$argon2id$secret".into(),
            created_at: Utc::now(),
        };
        let json = serde_json::to_value(UserResponse::from(user.clone())).expect("json");
        assert_eq!(json["email"], "alice@example.com");
        assert!(json.get("password_hash").is_none());

        let raw = serde_json::to_value(&user).expect("json");
        assert!(raw.get("password_hash").is_none());
    }

    #[test]
    fn login_request_validates_email_shape() {
        let request = LoginRequest {
            email: "not-an-email".into(),
            password: "pw".into(),
            return_tokens: false,
        };
        let errors = request.validate().expect_err("invalid email");
        assert!(errors.field_errors().contains_key("email"));
    }

    #[test]
    fn normalize_email_trims_and_lowercases() {
        assert_eq!(normalize_email("  Alice@Example.COM "), "alice@example.com");
    }
}
