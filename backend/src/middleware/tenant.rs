use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use super::auth::cookie_from_headers;
use crate::{
    error::AppError,
    models::{organization::MembershipRole, user::User},
    services::tenant::{SelectionSource, TenantSelector, TenantState},
    state::AppState,
};

pub const ORG_OVERRIDE_HEADER: &str = "x-org-id";

/// Tenant scope attached to requests on tenant-bound routes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TenantScope {
    pub org_id: String,
    pub org_name: String,
    pub role: MembershipRole,
    pub source: SelectionSource,
}

impl TenantScope {
    pub fn require_role(&self, required: MembershipRole) -> Result<(), AppError> {
        if self.role.satisfies(required) {
            Ok(())
        } else {
            Err(AppError::InsufficientRole)
        }
    }
}

/// Must run after [`super::auth::auth`]; rejects requests that have no
/// resolvable organization.
pub async fn require_tenant(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let user = request
        .extensions()
        .get::<User>()
        .cloned()
        .ok_or_else(|| AppError::unauthorized("Missing authenticated user"))?;

    let (cookie_org, header_org) = org_hints(request.headers(), &state.cookies.org_name());
    let tenant = TenantSelector::new(state.directory.as_ref())
        .derive(&user.id, cookie_org.as_deref(), header_org.as_deref())
        .await?;

    let scope = match tenant {
        TenantState::Resolved {
            membership, source, ..
        } => TenantScope {
            org_id: membership.organization.id,
            org_name: membership.organization.name,
            role: membership.role,
            source,
        },
        TenantState::AwaitingSelection { .. } => return Err(AppError::TenantSelectionRequired),
        TenantState::Blocked => return Err(AppError::NoOrganizations),
    };

    request.extensions_mut().insert(scope);
    Ok(next.run(request).await)
}

/// Org cookie value and the read-only `x-org-id` override, if present.
pub fn org_hints(
    headers: &axum::http::HeaderMap,
    org_cookie_name: &str,
) -> (Option<String>, Option<String>) {
    let cookie_org = cookie_from_headers(headers, org_cookie_name);
    let header_org = headers
        .get(ORG_OVERRIDE_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string);
    (cookie_org, header_org)
}
