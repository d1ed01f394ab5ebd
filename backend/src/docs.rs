#![allow(dead_code)] // OpenAPI doc stubs are only referenced by utoipa macros.

use axum::Json;
use utoipa::{
    openapi::security::{ApiKey, ApiKeyValue, Http, HttpAuthScheme, SecurityScheme},
    Modify, OpenApi,
};

use crate::{
    handlers::workspace::WorkspaceResponse,
    models::{
        organization::{MembershipRole, OrganizationSummary},
        session::{
            MeResponse, RefreshRequest, RefreshResponse, SelectOrganizationRequest,
            SelectOrganizationResponse, SessionResponse, TokenBundle,
        },
        user::{LoginRequest, RegisterRequest, UserResponse},
    },
    services::tenant::SelectionSource,
};

#[derive(OpenApi)]
#[openapi(
    paths(
        register_doc,
        login_doc,
        select_organization_doc,
        refresh_doc,
        logout_doc,
        me_doc,
        workspace_doc,
        workspace_settings_doc
    ),
    components(
        schemas(
            LoginRequest,
            RegisterRequest,
            SessionResponse,
            TokenBundle,
            RefreshRequest,
            RefreshResponse,
            SelectOrganizationRequest,
            SelectOrganizationResponse,
            MeResponse,
            UserResponse,
            OrganizationSummary,
            MembershipRole,
            SelectionSource,
            WorkspaceResponse
        )
    ),
    modifiers(&SecuritySchemes),
    tags(
        (name = "Auth", description = "Login, credential rotation and tenant selection"),
        (name = "Workspace", description = "Tenant-scoped routes")
    ),
    security(("CookieAuth" = []), ("BearerAuth" = []))
)]
pub struct ApiDoc;

struct SecuritySchemes;

impl Modify for SecuritySchemes {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_default();

        let mut bearer = Http::new(HttpAuthScheme::Bearer);
        bearer.bearer_format = Some("JWT".to_string());
        components.add_security_scheme("BearerAuth", SecurityScheme::Http(bearer));
        components.add_security_scheme(
            "CookieAuth",
            SecurityScheme::ApiKey(ApiKey::Cookie(ApiKeyValue::new("lockbox_access"))),
        );
    }
}

pub async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

#[utoipa::path(
    post,
    path = "/api/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Account and first organization created", body = SessionResponse),
        (status = 400, description = "Validation error"),
        (status = 409, description = "Email already registered")
    ),
    tag = "Auth",
    security(())
)]
fn register_doc() {}

#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in; org cookie set when exactly one organization", body = SessionResponse),
        (status = 401, description = "Invalid credentials"),
        (status = 403, description = "NO_ORGANIZATIONS")
    ),
    tag = "Auth",
    security(())
)]
fn login_doc() {}

#[utoipa::path(
    post,
    path = "/api/auth/select-organization",
    request_body = SelectOrganizationRequest,
    responses(
        (status = 200, description = "Org cookie set", body = SelectOrganizationResponse),
        (status = 403, description = "NO_TENANT_ACCESS")
    ),
    tag = "Auth"
)]
fn select_organization_doc() {}

#[utoipa::path(
    post,
    path = "/api/auth/refresh",
    request_body = RefreshRequest,
    responses(
        (status = 200, description = "Access and refresh cookies rotated", body = RefreshResponse),
        (status = 401, description = "REFRESH_FAILED")
    ),
    tag = "Auth",
    security(())
)]
fn refresh_doc() {}

#[utoipa::path(
    post,
    path = "/api/auth/logout",
    responses((status = 200, description = "Session cookies cleared")),
    tag = "Auth",
    security(())
)]
fn logout_doc() {}

#[utoipa::path(
    get,
    path = "/api/auth/me",
    params(("x-org-id" = Option<String>, Header, description = "Per-request organization override")),
    responses(
        (status = 200, description = "Current user and tenant context", body = MeResponse),
        (status = 401, description = "Missing or expired access token")
    ),
    tag = "Auth"
)]
fn me_doc() {}

#[utoipa::path(
    get,
    path = "/api/workspace",
    responses(
        (status = 200, body = WorkspaceResponse),
        (status = 403, description = "TENANT_SELECTION_REQUIRED or NO_TENANT_ACCESS")
    ),
    tag = "Workspace"
)]
fn workspace_doc() {}

#[utoipa::path(
    get,
    path = "/api/workspace/settings",
    responses(
        (status = 200, body = WorkspaceResponse),
        (status = 403, description = "INSUFFICIENT_ROLE")
    ),
    tag = "Workspace"
)]
fn workspace_settings_doc() {}
