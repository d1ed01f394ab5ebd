use std::{
    net::Ipv4Addr,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    time::Duration,
};

use axum::{extract::Request, middleware::Next};
use chrono::Duration as TokenTtl;
use lockbox_backend::{
    build_router,
    config::Config,
    models::organization::{MembershipRole, Organization},
    repositories::InMemoryDirectory,
    state::AppState,
    utils::jwt::{create_token, TokenKind},
};
use lockbox_client::{
    types::TenantContext, ApiClient, ClientConfig, ClientError, ForbiddenKind, RequestSpec,
    SessionExpiredHandler,
};
use reqwest::{cookie::CookieStore, Url};
use tokio::net::TcpListener;

const PASSWORD: &str = "correct-horse-battery";

struct Backend {
    base: String,
    directory: Arc<InMemoryDirectory>,
    config: Config,
    refresh_calls: Arc<AtomicUsize>,
}

impl Backend {
    async fn start() -> Self {
        let config = Config {
            jwt_secret: "client-session-flow-secret-0123456789".to_string(),
            jwt_leeway_seconds: 0,
            cookie_prefix: "lb".to_string(),
            ..Config::default()
        };
        let directory = Arc::new(InMemoryDirectory::new());
        let refresh_calls = Arc::new(AtomicUsize::new(0));

        // Counts and slows down renewals so concurrent expiries overlap.
        let counter = Arc::clone(&refresh_calls);
        let app = build_router(AppState::new(config.clone(), directory.clone())).layer(
            axum::middleware::from_fn(move |request: Request, next: Next| {
                let counter = Arc::clone(&counter);
                async move {
                    if request.uri().path() == "/api/auth/refresh" {
                        counter.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(150)).await;
                    }
                    next.run(request).await
                }
            }),
        );

        let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0))
            .await
            .expect("bind");
        let addr = listener.local_addr().expect("local addr");
        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("serve");
        });

        Self {
            base: format!("http://{}", addr),
            directory,
            config,
            refresh_calls,
        }
    }

    fn user_with_orgs(&self, email: &str, count: usize) -> (String, Vec<Organization>) {
        let user = self
            .directory
            .add_user(email, "Flow User", PASSWORD)
            .expect("user");
        let orgs = (0..count)
            .map(|idx| {
                let org = self
                    .directory
                    .add_organization(&format!("Org {}", idx))
                    .expect("organization");
                self.directory
                    .add_membership(&user.id, &org.id, MembershipRole::Member)
                    .expect("membership");
                org
            })
            .collect();
        (user.id, orgs)
    }

    fn url(&self, path: &str) -> Url {
        Url::parse(&self.base)
            .and_then(|base| base.join(path))
            .expect("url")
    }

    fn client(&self) -> ApiClient {
        ApiClient::new(ClientConfig::new(&self.base).expect("config")).expect("client")
    }
}

#[derive(Default)]
struct CountingHandler(AtomicUsize);

impl SessionExpiredHandler for CountingHandler {
    fn on_session_expired(&self, _login_path: &str) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

#[tokio::test]
async fn three_organizations_select_and_me() {
    let backend = Backend::start().await;
    let (_, orgs) = backend.user_with_orgs("three@example.com", 3);
    let client = backend.client();

    let session = client
        .login("three@example.com", PASSWORD)
        .await
        .expect("login");
    assert_eq!(session.organizations.len(), 3);
    assert!(session.current_org_id.is_none());
    assert!(session.selection_required);

    let pending = client.me().await.expect("me");
    assert!(pending.selection_required);

    let selected = client
        .select_organization(&orgs[1].id)
        .await
        .expect("select");
    assert_eq!(selected.current_org_id, orgs[1].id);
    assert_eq!(selected.role, "member");

    let context = client.me().await.expect("me");
    assert_eq!(context.current_org_id.as_deref(), Some(orgs[1].id.as_str()));
    assert_eq!(context.selection_source.as_deref(), Some("cookie"));

    let overridden = client
        .send(
            RequestSpec::get("/api/auth/me")
                .with_org_override(&orgs[2].id)
                .expect("spec"),
        )
        .await
        .expect("me with override")
        .json::<TenantContext>()
        .await
        .expect("decode");
    assert_eq!(overridden.current_org_id.as_deref(), Some(orgs[2].id.as_str()));
    assert_eq!(overridden.selection_source.as_deref(), Some("header"));

    // The override is not persisted.
    let context = client.me().await.expect("me");
    assert_eq!(context.current_org_id.as_deref(), Some(orgs[1].id.as_str()));
}

#[tokio::test]
async fn selecting_a_foreign_organization_is_forbidden() {
    let backend = Backend::start().await;
    backend.user_with_orgs("multi@example.com", 2);
    let (_, foreign) = backend.user_with_orgs("other@example.com", 1);
    let client = backend.client();
    client
        .login("multi@example.com", PASSWORD)
        .await
        .expect("login");

    let err = client
        .select_organization(&foreign[0].id)
        .await
        .expect_err("not a member");
    assert!(matches!(
        err,
        ClientError::Forbidden(ForbiddenKind::NoTenantAccess)
    ));

    let workspace = client
        .get_json::<serde_json::Value>("/api/workspace")
        .await
        .expect_err("no tenant selected");
    assert!(matches!(
        workspace,
        ClientError::Forbidden(ForbiddenKind::TenantSelectionRequired)
    ));
}

#[tokio::test]
async fn login_failures_are_not_renewed() {
    let backend = Backend::start().await;
    backend.user_with_orgs("orphan@example.com", 0);
    backend.user_with_orgs("solo@example.com", 1);
    let client = backend.client();

    let blocked = client
        .login("orphan@example.com", PASSWORD)
        .await
        .expect_err("no organizations");
    assert!(matches!(blocked, ClientError::NoOrganizations));

    let wrong = client
        .login("solo@example.com", "wrong-password")
        .await
        .expect_err("bad password");
    assert_eq!(wrong.code(), "UNAUTHORIZED");
    assert_eq!(backend.refresh_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn cookie_jar_scopes_refresh_cookie_to_refresh_path() {
    let backend = Backend::start().await;
    backend.user_with_orgs("solo@example.com", 1);
    let client = backend.client();
    client
        .login("solo@example.com", PASSWORD)
        .await
        .expect("login");

    let jar = client.cookie_jar();
    let api_cookies = jar
        .cookies(&backend.url("/api/auth/me"))
        .expect("api cookies");
    let api_cookies = api_cookies.to_str().expect("ascii");
    assert!(api_cookies.contains("lb_access="));
    assert!(api_cookies.contains("lb_org="));
    assert!(!api_cookies.contains("lb_refresh="));

    let refresh_cookies = jar
        .cookies(&backend.url("/api/auth/refresh"))
        .expect("refresh cookies");
    assert!(refresh_cookies
        .to_str()
        .expect("ascii")
        .contains("lb_refresh="));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn expired_access_is_renewed_once_for_concurrent_requests() {
    let backend = Backend::start().await;
    let (user_id, orgs) = backend.user_with_orgs("solo@example.com", 1);
    let client = backend.client();
    client
        .login("solo@example.com", PASSWORD)
        .await
        .expect("login");

    let (expired, _) = create_token(
        TokenKind::Access,
        &user_id,
        "solo@example.com",
        &backend.config.jwt_secret,
        TokenTtl::seconds(-60),
    )
    .expect("token");
    client
        .cookie_jar()
        .add_cookie_str(&format!("lb_access={}; Path=/", expired), &backend.url("/"));

    let tasks: Vec<_> = (0..5)
        .map(|_| {
            let client = client.clone();
            tokio::spawn(async move { client.me().await })
        })
        .collect();
    for task in tasks {
        let context = task.await.expect("task").expect("renewed and replayed");
        assert_eq!(context.current_org_id.as_deref(), Some(orgs[0].id.as_str()));
    }
    assert_eq!(backend.refresh_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn logout_ends_the_session() {
    let backend = Backend::start().await;
    backend.user_with_orgs("solo@example.com", 1);
    let handler = Arc::new(CountingHandler::default());
    let client = ApiClient::with_session_expired_handler(
        ClientConfig::new(&backend.base).expect("config"),
        handler.clone(),
    )
    .expect("client");

    client
        .login("solo@example.com", PASSWORD)
        .await
        .expect("login");
    client.me().await.expect("me");

    client.logout().await.expect("logout");
    let err = client.me().await.expect_err("logged out");
    assert!(matches!(err, ClientError::SessionExpired));
    assert_eq!(handler.0.load(Ordering::SeqCst), 1);
    assert_eq!(backend.refresh_calls.load(Ordering::SeqCst), 1);
}
