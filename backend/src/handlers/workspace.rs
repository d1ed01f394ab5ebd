//! Tenant-bound routes. They stand in for the CRUD surface, which only ever
//! sees requests that already carry a resolved [`TenantScope`].

use axum::{extract::Extension, Json};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{
    error::AppError,
    middleware::tenant::TenantScope,
    models::{organization::MembershipRole, user::User},
    services::tenant::SelectionSource,
};

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct WorkspaceResponse {
    pub org_id: String,
    pub org_name: String,
    pub role: MembershipRole,
    pub selection_source: SelectionSource,
    pub user_id: String,
}

fn workspace_response(scope: TenantScope, user: &User) -> WorkspaceResponse {
    WorkspaceResponse {
        org_id: scope.org_id,
        org_name: scope.org_name,
        role: scope.role,
        selection_source: scope.source,
        user_id: user.id.clone(),
    }
}

pub async fn current_workspace(
    Extension(scope): Extension<TenantScope>,
    Extension(user): Extension<User>,
) -> Json<WorkspaceResponse> {
    Json(workspace_response(scope, &user))
}

/// Admin-only view of the active organization.
pub async fn workspace_settings(
    Extension(scope): Extension<TenantScope>,
    Extension(user): Extension<User>,
) -> Result<Json<WorkspaceResponse>, AppError> {
    scope.require_role(MembershipRole::Admin)?;
    Ok(Json(workspace_response(scope, &user)))
}
