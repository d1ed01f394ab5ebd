//! Tenant context selection.
//!
//! After credentials are validated a session is `Unresolved`; the selector
//! turns that into one of three outcomes depending on how many organizations
//! the user belongs to. Nothing here is persisted: every "who am I" check
//! recomputes the state from the org cookie, the `x-org-id` override and a
//! fresh membership lookup.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{
    error::AppError,
    models::organization::{Membership, OrganizationSummary},
    repositories::DirectoryRepository,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SelectionSource {
    /// Exactly one candidate existed.
    Auto,
    /// The caller picked it through the selection endpoint.
    Explicit,
    /// Taken from a previously bound org cookie.
    Cookie,
    /// Per-request `x-org-id` override.
    Header,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TenantState {
    /// No memberships at all; the login attempt ends here.
    Blocked,
    AwaitingSelection {
        candidates: Vec<Membership>,
    },
    Resolved {
        membership: Membership,
        source: SelectionSource,
        candidates: Vec<Membership>,
    },
}

impl TenantState {
    fn from_candidates(candidates: Vec<Membership>) -> Self {
        match candidates.len() {
            0 => TenantState::Blocked,
            1 => TenantState::Resolved {
                membership: candidates[0].clone(),
                source: SelectionSource::Auto,
                candidates,
            },
            _ => TenantState::AwaitingSelection { candidates },
        }
    }

    pub fn current_org_id(&self) -> Option<&str> {
        match self {
            TenantState::Resolved { membership, .. } => Some(&membership.organization.id),
            _ => None,
        }
    }

    pub fn source(&self) -> Option<SelectionSource> {
        match self {
            TenantState::Resolved { source, .. } => Some(*source),
            _ => None,
        }
    }

    pub fn is_awaiting_selection(&self) -> bool {
        matches!(self, TenantState::AwaitingSelection { .. })
    }

    pub fn summaries(&self) -> Vec<OrganizationSummary> {
        match self {
            TenantState::Blocked => Vec::new(),
            TenantState::AwaitingSelection { candidates }
            | TenantState::Resolved { candidates, .. } => {
                candidates.iter().map(OrganizationSummary::from).collect()
            }
        }
    }

    /// An org cookie should be written only when the server resolved the
    /// tenant itself on this request.
    pub fn org_cookie_value(&self) -> Option<&str> {
        match self {
            TenantState::Resolved {
                membership,
                source: SelectionSource::Auto | SelectionSource::Explicit,
                ..
            } => Some(&membership.organization.id),
            _ => None,
        }
    }
}

pub struct TenantSelector<'a> {
    directory: &'a dyn DirectoryRepository,
}

impl<'a> TenantSelector<'a> {
    pub fn new(directory: &'a dyn DirectoryRepository) -> Self {
        Self { directory }
    }

    /// Unresolved -> Blocked | Resolved(auto) | AwaitingSelection.
    pub async fn resolve_after_login(&self, user_id: &str) -> Result<TenantState, AppError> {
        let candidates = self.directory.list_memberships(user_id).await?;
        Ok(TenantState::from_candidates(candidates))
    }

    /// AwaitingSelection -> Resolved(explicit). Membership is re-checked here
    /// because the candidate list the client saw may already be stale.
    pub async fn select(&self, user_id: &str, org_id: &str) -> Result<TenantState, AppError> {
        let membership = self
            .directory
            .find_membership(user_id, org_id)
            .await?
            .ok_or(AppError::NoTenantAccess)?;
        let candidates = self.directory.list_memberships(user_id).await?;
        Ok(TenantState::Resolved {
            membership,
            source: SelectionSource::Explicit,
            candidates,
        })
    }

    /// Recomputes the tenant state for an authenticated request.
    ///
    /// A header override that names a foreign organization is refused, while a
    /// stale cookie (membership revoked since it was set) is ignored and the
    /// state falls back to what the current memberships allow.
    pub async fn derive(
        &self,
        user_id: &str,
        cookie_org: Option<&str>,
        header_org: Option<&str>,
    ) -> Result<TenantState, AppError> {
        let candidates = self.directory.list_memberships(user_id).await?;

        if let Some(org_id) = header_org {
            let membership = find_candidate(&candidates, org_id).ok_or(AppError::NoTenantAccess)?;
            return Ok(TenantState::Resolved {
                membership,
                source: SelectionSource::Header,
                candidates,
            });
        }

        if let Some(org_id) = cookie_org {
            if let Some(membership) = find_candidate(&candidates, org_id) {
                return Ok(TenantState::Resolved {
                    membership,
                    source: SelectionSource::Cookie,
                    candidates,
                });
            }
            tracing::debug!(user_id, org_id, "ignoring org cookie without membership");
        }

        Ok(TenantState::from_candidates(candidates))
    }
}

fn find_candidate(candidates: &[Membership], org_id: &str) -> Option<Membership> {
    candidates
        .iter()
        .find(|membership| membership.organization.id == org_id)
        .cloned()
}
