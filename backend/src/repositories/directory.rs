use async_trait::async_trait;

use crate::models::{
    organization::{Membership, Organization},
    user::{NewUser, User},
};

#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    NotFound(String),
    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

pub type RepositoryResult<T> = Result<T, RepositoryError>;

/// Identity and membership queries consumed by the session endpoints.
///
/// Implementations must be safe to call concurrently; the handlers never hold
/// any state of their own between requests.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DirectoryRepository: Send + Sync {
    async fn find_user_by_id(&self, user_id: &str) -> RepositoryResult<Option<User>>;

    /// Returns the user when `password` matches the stored credential.
    async fn verify_credentials(&self, email: &str, password: &str)
        -> RepositoryResult<Option<User>>;

    async fn create_user(&self, new_user: NewUser) -> RepositoryResult<User>;

    /// Creates an organization owned by `owner_id`.
    async fn create_organization(&self, name: &str, owner_id: &str)
        -> RepositoryResult<Organization>;

    async fn list_memberships(&self, user_id: &str) -> RepositoryResult<Vec<Membership>>;

    async fn find_membership(
        &self,
        user_id: &str,
        org_id: &str,
    ) -> RepositoryResult<Option<Membership>>;
}
