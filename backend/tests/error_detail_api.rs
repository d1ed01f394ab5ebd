use std::sync::Arc;

use anyhow::anyhow;
use async_trait::async_trait;
use axum::http::{Method, StatusCode};
use lockbox_backend::{
    build_router,
    config::{AppEnv, Config},
    models::{
        organization::{Membership, Organization},
        user::{NewUser, User},
    },
    repositories::{DirectoryRepository, RepositoryError, RepositoryResult},
    state::AppState,
};
use serde_json::json;
use tower::ServiceExt;

mod support;

use support::{body_json, json_request, test_config};

/// Directory whose backing store is unreachable.
struct OfflineDirectory;

fn offline<T>() -> RepositoryResult<T> {
    Err(RepositoryError::Backend(anyhow!("directory store offline")))
}

#[async_trait]
impl DirectoryRepository for OfflineDirectory {
    async fn find_user_by_id(&self, _user_id: &str) -> RepositoryResult<Option<User>> {
        offline()
    }

    async fn verify_credentials(
        &self,
        _email: &str,
        _password: &str,
    ) -> RepositoryResult<Option<User>> {
        offline()
    }

    async fn create_user(&self, _new_user: NewUser) -> RepositoryResult<User> {
        offline()
    }

    async fn create_organization(
        &self,
        _name: &str,
        _owner_id: &str,
    ) -> RepositoryResult<Organization> {
        offline()
    }

    async fn list_memberships(&self, _user_id: &str) -> RepositoryResult<Vec<Membership>> {
        offline()
    }

    async fn find_membership(
        &self,
        _user_id: &str,
        _org_id: &str,
    ) -> RepositoryResult<Option<Membership>> {
        offline()
    }
}

async fn login_against(config: Config) -> serde_json::Value {
    let router = build_router(AppState::new(config, Arc::new(OfflineDirectory)));
    let response = router
        .oneshot(json_request(
            Method::POST,
            "/api/auth/login",
            json!({ "email": "solo@example.com", "password": "whatever" }),
            &[],
        ))
        .await
        .expect("router");
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    body_json(response).await
}

#[tokio::test]
async fn development_exposes_internal_error_detail() {
    let body = login_against(Config {
        app_env: AppEnv::Development,
        ..test_config()
    })
    .await;
    assert_eq!(body["code"], "INTERNAL_SERVER_ERROR");
    assert_eq!(body["error"], "Internal server error");
    assert!(body["details"]["debug"]
        .as_str()
        .is_some_and(|debug| debug.contains("directory store offline")));
}

#[tokio::test]
async fn production_hides_internal_error_detail() {
    let body = login_against(test_config()).await;
    assert_eq!(body["code"], "INTERNAL_SERVER_ERROR");
    assert!(body.get("details").is_none());
}
