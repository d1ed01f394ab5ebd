use std::sync::Arc;

use reqwest::{
    cookie::Jar,
    header::{HeaderName, HeaderValue},
    Method, Response, StatusCode,
};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::{json, Value};
use tokio::{
    sync::oneshot,
    task::JoinHandle,
    time::{interval_at, Instant, MissedTickBehavior},
};

use crate::{
    config::ClientConfig,
    error::{ApiErrorBody, ClientError},
    single_flight::SingleFlight,
    types::{
        LoginRequest, RefreshedSession, RegisterRequest, SelectedOrganization, SessionInfo,
        TenantContext,
    },
};

pub const ORG_OVERRIDE_HEADER: &str = "x-org-id";

const LOGIN_PATH: &str = "/api/auth/login";
const REGISTER_PATH: &str = "/api/auth/register";
const LOGOUT_PATH: &str = "/api/auth/logout";
const ME_PATH: &str = "/api/auth/me";
const SELECT_ORGANIZATION_PATH: &str = "/api/auth/select-organization";

/// Invoked once per failed renewal cycle; the embedding application sends the
/// user back to `login_path`.
pub trait SessionExpiredHandler: Send + Sync {
    fn on_session_expired(&self, login_path: &str);
}

/// Description of an outbound request. Kept around so the request can be
/// rebuilt and replayed after a renewal.
#[derive(Debug, Clone)]
pub struct RequestSpec {
    pub method: Method,
    pub path: String,
    pub body: Option<Value>,
    pub headers: Vec<(HeaderName, HeaderValue)>,
    renew_on_expiry: bool,
}

impl RequestSpec {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            body: None,
            headers: Vec::new(),
            renew_on_expiry: true,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>, body: Value) -> Self {
        Self {
            body: Some(body),
            ..Self::new(Method::POST, path)
        }
    }

    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.push((name, value));
        self
    }

    /// Per-request organization override; never persisted.
    pub fn with_org_override(self, org_id: &str) -> Result<Self, ClientError> {
        let value = HeaderValue::from_str(org_id)
            .map_err(|e| ClientError::InvalidRequest(format!("invalid organization id: {}", e)))?;
        Ok(self.with_header(HeaderName::from_static(ORG_OVERRIDE_HEADER), value))
    }

    /// For entry points where a 401 means bad input rather than an expired
    /// session (login, register, logout).
    pub fn without_renewal(mut self) -> Self {
        self.renew_on_expiry = false;
        self
    }
}

/// Cheap to clone; clones share the cookie jar and the renewal coordinator.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<Inner>,
}

struct Inner {
    http: reqwest::Client,
    jar: Arc<Jar>,
    config: ClientConfig,
    refresh: SingleFlight<RefreshedSession, ClientError>,
    on_expired: Option<Arc<dyn SessionExpiredHandler>>,
}

impl ApiClient {
    pub fn new(config: ClientConfig) -> Result<Self, ClientError> {
        Self::build_client(config, None)
    }

    pub fn with_session_expired_handler(
        config: ClientConfig,
        handler: Arc<dyn SessionExpiredHandler>,
    ) -> Result<Self, ClientError> {
        Self::build_client(config, Some(handler))
    }

    fn build_client(
        config: ClientConfig,
        on_expired: Option<Arc<dyn SessionExpiredHandler>>,
    ) -> Result<Self, ClientError> {
        let jar = Arc::new(Jar::default());
        let http = reqwest::Client::builder()
            .cookie_provider(Arc::clone(&jar))
            .build()?;
        Ok(Self {
            inner: Arc::new(Inner {
                http,
                jar,
                config,
                refresh: SingleFlight::new(ClientError::SessionExpired),
                on_expired,
            }),
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    /// The jar enforces cookie path scoping: the refresh cookie only ever
    /// rides along to the refresh endpoint.
    pub fn cookie_jar(&self) -> Arc<Jar> {
        Arc::clone(&self.inner.jar)
    }

    pub fn is_refreshing(&self) -> bool {
        self.inner.refresh.is_in_flight()
    }

    /// Sends `spec`, renewing the session and replaying once if the access
    /// credential was rejected. Timeouts and transport failures surface
    /// directly and never trigger a renewal.
    pub async fn send(&self, spec: RequestSpec) -> Result<Response, ClientError> {
        let request = self.inner.build(&spec)?;
        let response = self.inner.execute(request).await?;
        if response.status() != StatusCode::UNAUTHORIZED
            || !spec.renew_on_expiry
            || self.inner.config.is_refresh_path(&spec.path)
        {
            return classify(response).await;
        }
        drop(response);

        let stamp = self.inner.refresh.arrive();
        tracing::debug!(path = %spec.path, stamp, "Access credential rejected, awaiting renewal");
        let replayed = self.replay_after_renewal(stamp, spec).await?;
        // The replay is never renewed again; a second 401 is surfaced.
        classify(replayed).await
    }

    async fn replay_after_renewal(
        &self,
        stamp: u64,
        spec: RequestSpec,
    ) -> Result<Response, ClientError> {
        let (tx, rx) = oneshot::channel();

        // Runs in arrival order once the renewal settles, so replays are
        // initiated first-come first-served.
        let replay_inner = Arc::clone(&self.inner);
        let continuation = move |outcome: Result<RefreshedSession, ClientError>| {
            let replay = outcome
                .and_then(|_| replay_inner.build(&spec))
                .map(|request| {
                    let inner = Arc::clone(&replay_inner);
                    tokio::spawn(async move { inner.execute(request).await })
                });
            let _ = tx.send(replay);
        };

        let renew_inner = Arc::clone(&self.inner);
        self.inner.refresh.join(stamp, continuation, move || async move {
            renew_inner.renew().await
        });

        let replay: JoinHandle<Result<Response, ClientError>> =
            rx.await.map_err(|_| ClientError::SessionExpired)??;
        replay
            .await
            .map_err(|e| ClientError::Transport(format!("replay task failed: {}", e)))?
    }

    pub async fn get_json<R: DeserializeOwned>(&self, path: &str) -> Result<R, ClientError> {
        let response = self.send(RequestSpec::get(path)).await?;
        decode(response).await
    }

    pub async fn post_json<B: Serialize, R: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<R, ClientError> {
        let response = self.send(RequestSpec::post(path, to_body(body)?)).await?;
        decode(response).await
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<SessionInfo, ClientError> {
        let body = to_body(&LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        })?;
        let response = self
            .send(RequestSpec::post(LOGIN_PATH, body).without_renewal())
            .await?;
        let session: SessionInfo = decode(response).await?;
        tracing::debug!(
            user_id = %session.user.id,
            selection_required = session.selection_required,
            "Logged in"
        );
        Ok(session)
    }

    pub async fn register(&self, request: &RegisterRequest) -> Result<SessionInfo, ClientError> {
        let response = self
            .send(RequestSpec::post(REGISTER_PATH, to_body(request)?).without_renewal())
            .await?;
        decode(response).await
    }

    pub async fn select_organization(
        &self,
        organization_id: &str,
    ) -> Result<SelectedOrganization, ClientError> {
        self.post_json(
            SELECT_ORGANIZATION_PATH,
            &json!({ "organization_id": organization_id }),
        )
        .await
    }

    pub async fn me(&self) -> Result<TenantContext, ClientError> {
        self.get_json(ME_PATH).await
    }

    /// Renews through the coordinator; collapses into any renewal already
    /// running.
    pub async fn refresh_session(&self) -> Result<RefreshedSession, ClientError> {
        let inner = Arc::clone(&self.inner);
        self.inner
            .refresh
            .run(move || async move { inner.renew().await })
            .await
    }

    /// Drops any pending renewal, then clears the server-side cookies. A
    /// renewal must not settle after the cookies are cleared.
    pub async fn logout(&self) -> Result<(), ClientError> {
        self.inner.refresh.reset();
        self.send(RequestSpec::post(LOGOUT_PATH, json!({})).without_renewal())
            .await
            .map(|_| ())
    }

    /// Periodically renews the session while the client is in use. Stops on
    /// the first failed renewal; abort the handle to stop it earlier.
    pub fn spawn_keepalive(&self) -> JoinHandle<()> {
        let client = self.clone();
        let period = self.inner.config.keepalive_period;
        tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if let Err(err) = client.refresh_session().await {
                    tracing::warn!(error = %err, "Keepalive stopped");
                    break;
                }
                tracing::debug!("Keepalive renewed session");
            }
        })
    }
}

impl Inner {
    fn build(&self, spec: &RequestSpec) -> Result<reqwest::Request, ClientError> {
        let url = self.config.url(&spec.path)?;
        let mut builder = self
            .http
            .request(spec.method.clone(), url)
            .timeout(self.config.request_timeout);
        for (name, value) in &spec.headers {
            builder = builder.header(name.clone(), value.clone());
        }
        if let Some(body) = &spec.body {
            builder = builder.json(body);
        }
        builder
            .build()
            .map_err(|e| ClientError::InvalidRequest(e.to_string()))
    }

    async fn execute(&self, request: reqwest::Request) -> Result<Response, ClientError> {
        self.http.execute(request).await.map_err(ClientError::from)
    }

    /// One renewal cycle. Any failure is reported uniformly as an expired
    /// session and triggers the re-authentication handler.
    async fn renew(&self) -> Result<RefreshedSession, ClientError> {
        tracing::debug!("Renewing session");
        match self.request_refresh().await {
            Ok(session) => {
                tracing::debug!(user_id = %session.user.id, "Session renewed");
                Ok(session)
            }
            Err(err) => {
                tracing::warn!(
                    error = %err,
                    code = err.code(),
                    "Session renewal failed, re-authentication required"
                );
                if let Some(handler) = &self.on_expired {
                    handler.on_session_expired(&self.config.login_path);
                }
                Err(ClientError::SessionExpired)
            }
        }
    }

    async fn request_refresh(&self) -> Result<RefreshedSession, ClientError> {
        let spec = RequestSpec::post(self.config.refresh_path.clone(), json!({}));
        let response = self.execute(self.build(&spec)?).await?;
        decode(classify(response).await?).await
    }
}

async fn classify(response: Response) -> Result<Response, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.json::<ApiErrorBody>().await.ok();
    Err(ClientError::from_response(status, body))
}

async fn decode<R: DeserializeOwned>(response: Response) -> Result<R, ClientError> {
    response
        .json::<R>()
        .await
        .map_err(|e| ClientError::Decode(e.to_string()))
}

fn to_body<B: Serialize>(body: &B) -> Result<Value, ClientError> {
    serde_json::to_value(body).map_err(|e| ClientError::InvalidRequest(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_entry_points_opt_out_of_renewal() {
        let spec = RequestSpec::post(LOGIN_PATH, json!({})).without_renewal();
        assert!(!spec.renew_on_expiry);
        assert!(RequestSpec::get(ME_PATH).renew_on_expiry);
    }

    #[test]
    fn org_override_sets_header() {
        let spec = RequestSpec::get(ME_PATH)
            .with_org_override("org-42")
            .expect("spec");
        assert_eq!(spec.headers.len(), 1);
        assert_eq!(spec.headers[0].0.as_str(), ORG_OVERRIDE_HEADER);
        assert_eq!(spec.headers[0].1, "org-42");
        assert!(RequestSpec::get(ME_PATH).with_org_override("bad\nvalue").is_err());
    }

    #[tokio::test]
    async fn build_applies_timeout_and_base_url() {
        let config = ClientConfig::new("http://127.0.0.1:9")
            .expect("config")
            .with_request_timeout(std::time::Duration::from_millis(250));
        let client = ApiClient::new(config).expect("client");
        let request = client
            .inner
            .build(&RequestSpec::post("/api/things", json!({ "a": 1 })))
            .expect("request");
        assert_eq!(request.url().as_str(), "http://127.0.0.1:9/api/things");
        assert_eq!(
            request.timeout(),
            Some(&std::time::Duration::from_millis(250))
        );
        assert!(request.body().is_some());
        assert!(!client.is_refreshing());
    }
}
