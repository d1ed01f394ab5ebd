use std::{
    collections::HashMap,
    sync::{RwLock, RwLockReadGuard, RwLockWriteGuard},
};

use anyhow::anyhow;
use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use super::directory::{DirectoryRepository, RepositoryError, RepositoryResult};
use crate::{
    models::{
        organization::{Membership, MembershipRole, Organization},
        user::{normalize_email, NewUser, User},
    },
    utils::password::{hash_password, verify_password},
};

#[derive(Default)]
struct DirectoryData {
    users: HashMap<String, User>,
    organizations: HashMap<String, Organization>,
    // (user_id, org_id, role) in insertion order
    memberships: Vec<(String, String, MembershipRole)>,
}

/// Process-local directory used for development and tests.
#[derive(Default)]
pub struct InMemoryDirectory {
    data: RwLock<DirectoryData>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Development fixture: one user per organization-count case.
    pub fn seeded() -> anyhow::Result<Self> {
        let directory = Self::new();
        let acme = directory.add_organization("Acme")?;
        let globex = directory.add_organization("Globex")?;

        let solo = directory.add_user("solo@example.com", "Solo User", "password123")?;
        directory.add_membership(&solo.id, &acme.id, MembershipRole::Owner)?;

        let multi = directory.add_user("multi@example.com", "Multi User", "password123")?;
        directory.add_membership(&multi.id, &acme.id, MembershipRole::Member)?;
        directory.add_membership(&multi.id, &globex.id, MembershipRole::Admin)?;

        directory.add_user("orphan@example.com", "Orphan User", "password123")?;
        Ok(directory)
    }

    pub fn add_user(
        &self,
        email: &str,
        display_name: &str,
        password: &str,
    ) -> anyhow::Result<User> {
        let user = build_user(email, display_name, password)?;
        let mut data = self.write()?;
        if data.users.values().any(|existing| existing.email == user.email) {
            return Err(anyhow!("user {} already exists", user.email));
        }
        data.users.insert(user.id.clone(), user.clone());
        Ok(user)
    }

    pub fn add_organization(&self, name: &str) -> anyhow::Result<Organization> {
        let organization = Organization {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
        };
        self.write()?
            .organizations
            .insert(organization.id.clone(), organization.clone());
        Ok(organization)
    }

    pub fn add_membership(
        &self,
        user_id: &str,
        org_id: &str,
        role: MembershipRole,
    ) -> anyhow::Result<()> {
        let mut data = self.write()?;
        if !data.organizations.contains_key(org_id) {
            return Err(anyhow!("unknown organization {}", org_id));
        }
        data.memberships
            .retain(|(user, org, _)| !(user == user_id && org == org_id));
        data.memberships
            .push((user_id.to_string(), org_id.to_string(), role));
        Ok(())
    }

    pub fn remove_membership(&self, user_id: &str, org_id: &str) -> anyhow::Result<()> {
        let mut data = self.write()?;
        data.memberships
            .retain(|(user, org, _)| !(user == user_id && org == org_id));
        Ok(())
    }

    fn read(&self) -> anyhow::Result<RwLockReadGuard<'_, DirectoryData>> {
        self.data
            .read()
            .map_err(|_| anyhow!("directory lock poisoned"))
    }

    fn write(&self) -> anyhow::Result<RwLockWriteGuard<'_, DirectoryData>> {
        self.data
            .write()
            .map_err(|_| anyhow!("directory lock poisoned"))
    }
}

#[async_trait]
impl DirectoryRepository for InMemoryDirectory {
    async fn find_user_by_id(&self, user_id: &str) -> RepositoryResult<Option<User>> {
        Ok(self.read()?.users.get(user_id).cloned())
    }

    async fn verify_credentials(
        &self,
        email: &str,
        password: &str,
    ) -> RepositoryResult<Option<User>> {
        let email = normalize_email(email);
        let user = self
            .read()?
            .users
            .values()
            .find(|user| user.email == email)
            .cloned();
        match user {
            Some(user) if verify_password(password, &user.password_hash)? => Ok(Some(user)),
            _ => Ok(None),
        }
    }

    async fn create_user(&self, new_user: NewUser) -> RepositoryResult<User> {
        let user = build_user(&new_user.email, &new_user.display_name, &new_user.password)?;
        let mut data = self.write()?;
        if data.users.values().any(|existing| existing.email == user.email) {
            return Err(RepositoryError::Conflict(
                "An account with this email already exists".to_string(),
            ));
        }
        data.users.insert(user.id.clone(), user.clone());
        Ok(user)
    }

    async fn create_organization(
        &self,
        name: &str,
        owner_id: &str,
    ) -> RepositoryResult<Organization> {
        let organization = Organization {
            id: Uuid::new_v4().to_string(),
            name: name.trim().to_string(),
        };
        let mut data = self.write()?;
        if !data.users.contains_key(owner_id) {
            return Err(RepositoryError::NotFound("Owner not found".to_string()));
        }
        data.organizations
            .insert(organization.id.clone(), organization.clone());
        data.memberships.push((
            owner_id.to_string(),
            organization.id.clone(),
            MembershipRole::Owner,
        ));
        Ok(organization)
    }

    async fn list_memberships(&self, user_id: &str) -> RepositoryResult<Vec<Membership>> {
        let data = self.read()?;
        Ok(data
            .memberships
            .iter()
            .filter(|(user, _, _)| user == user_id)
            .filter_map(|(_, org_id, role)| {
                data.organizations.get(org_id).map(|organization| Membership {
                    organization: organization.clone(),
                    role: *role,
                })
            })
            .collect())
    }

    async fn find_membership(
        &self,
        user_id: &str,
        org_id: &str,
    ) -> RepositoryResult<Option<Membership>> {
        let data = self.read()?;
        Ok(data
            .memberships
            .iter()
            .find(|(user, org, _)| user == user_id && org == org_id)
            .and_then(|(_, org_id, role)| {
                data.organizations.get(org_id).map(|organization| Membership {
                    organization: organization.clone(),
                    role: *role,
                })
            }))
    }
}

fn build_user(email: &str, display_name: &str, password: &str) -> anyhow::Result<User> {
    Ok(User {
        id: Uuid::new_v4().to_string(),
        email: normalize_email(email),
        display_name: display_name.trim().to_string(),
        password_hash: hash_password(password)?,
        created_at: Utc::now(),
    })
}
