//! Response and request bodies of the session endpoints.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use super::{
    organization::{MembershipRole, OrganizationSummary},
    user::UserResponse,
};
use crate::{
    services::tenant::SelectionSource,
    utils::jwt::CredentialPair,
    validation::rules::validate_org_id,
};

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
/// Raw tokens, only returned to clients that asked for body transport.
pub struct TokenBundle {
    pub access_token: String,
    pub refresh_token: String,
}

impl From<&CredentialPair> for TokenBundle {
    fn from(pair: &CredentialPair) -> Self {
        TokenBundle {
            access_token: pair.access_token.clone(),
            refresh_token: pair.refresh_token.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
/// Body returned by login and registration.
pub struct SessionResponse {
    pub user: UserResponse,
    pub organizations: Vec<OrganizationSummary>,
    pub current_org_id: Option<String>,
    /// True while the caller still has to pick one of `organizations`.
    pub selection_required: bool,
    pub access_expires_at: DateTime<Utc>,
    pub refresh_expires_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tokens: Option<TokenBundle>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct RefreshRequest {
    #[serde(default)]
    pub refresh_token: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RefreshResponse {
    pub user: UserResponse,
    pub access_expires_at: DateTime<Utc>,
    pub refresh_expires_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tokens: Option<TokenBundle>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct SelectOrganizationRequest {
    #[validate(custom(function = "validate_org_id"))]
    pub organization_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SelectOrganizationResponse {
    pub current_org_id: String,
    pub role: MembershipRole,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
/// Tenant context re-derived on every "who am I" check.
pub struct MeResponse {
    pub user: UserResponse,
    pub organizations: Vec<OrganizationSummary>,
    pub current_org_id: Option<String>,
    pub selection_required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selection_source: Option<SelectionSource>,
}
