#![allow(dead_code)]
use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, HeaderMap, Method, Request, StatusCode},
    response::Response,
    Router,
};
use lockbox_backend::{
    build_router,
    config::{AppEnv, Config},
    models::{
        organization::{MembershipRole, Organization},
        user::User,
    },
    repositories::{DirectoryRepository, InMemoryDirectory},
    state::AppState,
};
use serde_json::Value;
use tower::ServiceExt;

pub const PASSWORD: &str = "correct-horse-battery";

pub fn test_config() -> Config {
    Config {
        jwt_secret: "integration-test-secret-0123456789".to_string(),
        jwt_leeway_seconds: 0,
        cookie_prefix: "lb".to_string(),
        ..Config::default()
    }
}

pub struct TestApp {
    pub router: Router,
    pub directory: Arc<InMemoryDirectory>,
    pub state: AppState,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_config(test_config())
    }

    pub fn with_config(config: Config) -> Self {
        let directory = Arc::new(InMemoryDirectory::new());
        let shared: Arc<dyn DirectoryRepository> = directory.clone();
        let state = AppState::new(config, shared);
        Self {
            router: build_router(state.clone()),
            directory,
            state,
        }
    }

    pub fn development() -> Self {
        Self::with_config(Config {
            app_env: AppEnv::Development,
            ..test_config()
        })
    }

    /// Adds a user that belongs to `org_count` fresh organizations.
    pub fn user_with_orgs(&self, email: &str, org_count: usize) -> (User, Vec<Organization>) {
        self.user_with_roles(email, &vec![MembershipRole::Member; org_count])
    }

    pub fn user_with_roles(&self, email: &str, roles: &[MembershipRole]) -> (User, Vec<Organization>) {
        let user = self
            .directory
            .add_user(email, "Test User", PASSWORD)
            .expect("add user");
        let orgs = roles
            .iter()
            .enumerate()
            .map(|(idx, role)| {
                let org = self
                    .directory
                    .add_organization(&format!("Org {}", idx))
                    .expect("organization");
                self.directory
                    .add_membership(&user.id, &org.id, *role)
                    .expect("add membership");
                org
            })
            .collect();
        (user, orgs)
    }

    pub async fn send(&self, request: Request<Body>) -> Response {
        self.router.clone().oneshot(request).await.expect("router")
    }

    pub async fn login(&self, email: &str) -> Response {
        self.send(json_request(
            Method::POST,
            "/api/auth/login",
            serde_json::json!({ "email": email, "password": PASSWORD }),
            &[],
        ))
        .await
    }
}

pub fn json_request(method: Method, uri: &str, body: Value, cookies: &[(String, String)]) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if !cookies.is_empty() {
        builder = builder.header(header::COOKIE, cookie_header(cookies));
    }
    builder.body(Body::from(body.to_string())).expect("request")
}

pub fn get_request(uri: &str, cookies: &[(String, String)], extra: &[(&str, &str)]) -> Request<Body> {
    let mut builder = Request::builder().method(Method::GET).uri(uri);
    if !cookies.is_empty() {
        builder = builder.header(header::COOKIE, cookie_header(cookies));
    }
    for (name, value) in extra {
        builder = builder.header(*name, *value);
    }
    builder.body(Body::empty()).expect("request")
}

pub fn cookie_header(cookies: &[(String, String)]) -> String {
    cookies
        .iter()
        .map(|(name, value)| format!("{}={}", name, value))
        .collect::<Vec<_>>()
        .join("; ")
}

pub async fn body_json(response: Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read body");
    serde_json::from_slice(&bytes).expect("json body")
}

pub fn set_cookies(headers: &HeaderMap) -> Vec<String> {
    headers
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .map(str::to_string)
        .collect()
}

/// Full Set-Cookie directive for `name`, if present.
pub fn set_cookie_directive(headers: &HeaderMap, name: &str) -> Option<String> {
    let prefix = format!("{name}=");
    set_cookies(headers)
        .into_iter()
        .find(|cookie| cookie.starts_with(&prefix))
}

pub fn set_cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    let prefix = format!("{name}=");
    set_cookie_directive(headers, name).and_then(|cookie| {
        let token = cookie.strip_prefix(&prefix)?.split(';').next()?.trim().to_string();
        (!token.is_empty()).then_some(token)
    })
}

/// Session cookies a browser would hold after `response`.
pub fn session_cookies(headers: &HeaderMap) -> Vec<(String, String)> {
    ["lb_access", "lb_refresh", "lb_org"]
        .iter()
        .filter_map(|name| set_cookie_value(headers, name).map(|value| (name.to_string(), value)))
        .collect()
}

pub fn assert_status(response: &Response, status: StatusCode) {
    assert_eq!(response.status(), status, "unexpected status");
}
