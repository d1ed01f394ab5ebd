//! Organizations and the memberships that scope every tenant-bound request.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Organization {
    pub id: String,
    pub name: String,
}

/// Membership roles, ordered from least to most privileged.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, ToSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum MembershipRole {
    Viewer,
    Member,
    Admin,
    Owner,
}

impl MembershipRole {
    pub fn satisfies(self, required: MembershipRole) -> bool {
        self >= required
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Membership {
    pub organization: Organization,
    pub role: MembershipRole,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
/// Candidate organization as presented to the client.
pub struct OrganizationSummary {
    pub id: String,
    pub name: String,
    pub role: MembershipRole,
}

impl From<&Membership> for OrganizationSummary {
    fn from(membership: &Membership) -> Self {
        OrganizationSummary {
            id: membership.organization.id.clone(),
            name: membership.organization.name.clone(),
            role: membership.role,
        }
    }
}
