use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserInfo {
    pub id: String,
    pub email: String,
    pub display_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrganizationSummary {
    pub id: String,
    pub name: String,
    pub role: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub display_name: String,
    pub organization_name: String,
}

/// Body of a successful login or registration.
#[derive(Debug, Clone, Deserialize)]
pub struct SessionInfo {
    pub user: UserInfo,
    pub organizations: Vec<OrganizationSummary>,
    pub current_org_id: Option<String>,
    #[serde(default)]
    pub selection_required: bool,
    pub access_expires_at: DateTime<Utc>,
    pub refresh_expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RefreshedSession {
    pub user: UserInfo,
    pub access_expires_at: DateTime<Utc>,
    pub refresh_expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SelectedOrganization {
    pub current_org_id: String,
    pub role: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TenantContext {
    pub user: UserInfo,
    pub organizations: Vec<OrganizationSummary>,
    pub current_org_id: Option<String>,
    #[serde(default)]
    pub selection_required: bool,
    pub selection_source: Option<String>,
}
