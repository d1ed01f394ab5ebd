use axum::{
    body::Bytes,
    extract::{Extension, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    Json,
};
use serde_json::{json, Value};

use crate::{
    error::AppError,
    middleware::{auth::cookie_from_headers, tenant::org_hints},
    models::{
        session::{
            MeResponse, RefreshRequest, RefreshResponse, SelectOrganizationRequest,
            SelectOrganizationResponse, SessionResponse, TokenBundle,
        },
        user::{normalize_email, LoginRequest, NewUser, RegisterRequest, User, UserResponse},
    },
    services::tenant::{TenantSelector, TenantState},
    state::AppState,
    utils::jwt::{issue_credential_pair, verify_refresh_token},
    validation::Validate,
};

type SessionReply = (HeaderMap, Json<SessionResponse>);

pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<SessionReply, AppError> {
    payload.validate()?;

    let user = state
        .directory
        .verify_credentials(&payload.email, &payload.password)
        .await?
        .ok_or_else(|| AppError::unauthorized("Invalid email or password"))?;

    let tenant = TenantSelector::new(state.directory.as_ref())
        .resolve_after_login(&user.id)
        .await?;
    if tenant == TenantState::Blocked {
        tracing::info!(user_id = %user.id, "Login refused: user has no organizations");
        return Err(AppError::NoOrganizations);
    }

    let reply = open_session(&state, user, &tenant, payload.return_tokens)?;
    tracing::info!(
        user_id = %reply.1.user.id,
        current_org_id = ?reply.1.current_org_id,
        candidates = reply.1.organizations.len(),
        "User logged in"
    );
    Ok(reply)
}

pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, HeaderMap, Json<SessionResponse>), AppError> {
    payload.validate()?;

    let user = state
        .directory
        .create_user(NewUser {
            email: normalize_email(&payload.email),
            display_name: payload.display_name.trim().to_string(),
            password: payload.password.clone(),
        })
        .await?;
    let organization = state
        .directory
        .create_organization(&payload.organization_name, &user.id)
        .await?;

    let tenant = TenantSelector::new(state.directory.as_ref())
        .resolve_after_login(&user.id)
        .await?;
    let (headers, body) = open_session(&state, user, &tenant, payload.return_tokens)?;
    tracing::info!(
        user_id = %body.user.id,
        org_id = %organization.id,
        "User registered"
    );
    Ok((StatusCode::CREATED, headers, body))
}

/// AwaitingSelection -> Resolved(explicit).
pub async fn select_organization(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Json(payload): Json<SelectOrganizationRequest>,
) -> Result<(HeaderMap, Json<SelectOrganizationResponse>), AppError> {
    payload.validate()?;

    let tenant = TenantSelector::new(state.directory.as_ref())
        .select(&user.id, &payload.organization_id)
        .await
        .inspect_err(|_| {
            tracing::warn!(
                user_id = %user.id,
                org_id = %payload.organization_id,
                "Organization selection refused"
            );
        })?;

    let TenantState::Resolved { membership, .. } = &tenant else {
        return Err(AppError::NoTenantAccess);
    };
    let headers = set_cookie_headers([state
        .cookies
        .bind_organization(&membership.organization.id)])?;

    Ok((
        headers,
        Json(SelectOrganizationResponse {
            current_org_id: membership.organization.id.clone(),
            role: membership.role,
        }),
    ))
}

/// Validates and rotates the renewal credential. A failed refresh never
/// touches the existing cookies; clearing them is the caller's decision.
pub async fn refresh(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<(HeaderMap, Json<RefreshResponse>), AppError> {
    let (token, via_body) = match cookie_from_headers(&headers, &state.cookies.refresh_name()) {
        Some(token) => (token, false),
        None => {
            let token = refresh_token_from_body(&body)
                .ok_or_else(|| AppError::RefreshFailed("Refresh token is required".into()))?;
            (token, true)
        }
    };

    let claims = verify_refresh_token(&token, &state.jwt).map_err(|err| {
        tracing::info!(error = %err, "Refresh token rejected");
        AppError::RefreshFailed("Invalid or expired refresh token".into())
    })?;

    let user = state
        .directory
        .find_user_by_id(&claims.sub)
        .await?
        .ok_or_else(|| AppError::RefreshFailed("User not found".into()))?;

    let pair = issue_credential_pair(&user.id, &user.email, &state.jwt)?;
    let headers = set_cookie_headers(state.cookies.bind_credentials(&pair))?;
    tracing::debug!(user_id = %user.id, via_body, "Credentials rotated");

    Ok((
        headers,
        Json(RefreshResponse {
            user: UserResponse::from(user),
            access_expires_at: pair.access_expires_at,
            refresh_expires_at: pair.refresh_expires_at,
            tokens: via_body.then(|| TokenBundle::from(&pair)),
        }),
    ))
}

/// Clears the whole cookie triple, re-using the paths they were set with.
/// Works without a valid access token so an expired session can still sign out.
pub async fn logout(State(state): State<AppState>) -> Result<(HeaderMap, Json<Value>), AppError> {
    let mut cookies = state.cookies.clear_credentials();
    cookies.push(state.cookies.clear_organization());
    let headers = set_cookie_headers(cookies)?;
    Ok((headers, Json(json!({ "message": "Logged out" }))))
}

/// Re-derives the tenant context from the presented cookie/header each time.
pub async fn me(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    headers: HeaderMap,
) -> Result<Json<MeResponse>, AppError> {
    let (cookie_org, header_org) = org_hints(&headers, &state.cookies.org_name());
    let tenant = TenantSelector::new(state.directory.as_ref())
        .derive(&user.id, cookie_org.as_deref(), header_org.as_deref())
        .await?;
    if tenant == TenantState::Blocked {
        return Err(AppError::NoOrganizations);
    }

    Ok(Json(MeResponse {
        organizations: tenant.summaries(),
        current_org_id: tenant.current_org_id().map(str::to_string),
        selection_required: tenant.is_awaiting_selection(),
        selection_source: tenant.source(),
        user: UserResponse::from(user),
    }))
}

fn open_session(
    state: &AppState,
    user: User,
    tenant: &TenantState,
    return_tokens: bool,
) -> Result<SessionReply, AppError> {
    let pair = issue_credential_pair(&user.id, &user.email, &state.jwt)?;

    let mut cookies = state.cookies.bind_credentials(&pair);
    if let Some(org_id) = tenant.org_cookie_value() {
        cookies.push(state.cookies.bind_organization(org_id));
    }
    let headers = set_cookie_headers(cookies)?;

    let body = SessionResponse {
        user: UserResponse::from(user),
        organizations: tenant.summaries(),
        current_org_id: tenant.current_org_id().map(str::to_string),
        selection_required: tenant.is_awaiting_selection(),
        access_expires_at: pair.access_expires_at,
        refresh_expires_at: pair.refresh_expires_at,
        tokens: return_tokens.then(|| TokenBundle::from(&pair)),
    };
    Ok((headers, Json(body)))
}

fn refresh_token_from_body(body: &[u8]) -> Option<String> {
    if body.is_empty() {
        return None;
    }
    serde_json::from_slice::<RefreshRequest>(body)
        .ok()
        .and_then(|request| request.refresh_token)
        .map(|token| token.trim().to_string())
        .filter(|token| !token.is_empty())
}

fn set_cookie_headers(cookies: impl IntoIterator<Item = String>) -> Result<HeaderMap, AppError> {
    let mut headers = HeaderMap::new();
    for cookie in cookies {
        let value = HeaderValue::from_str(&cookie)
            .map_err(|e| anyhow::anyhow!("Invalid Set-Cookie value: {}", e))?;
        headers.append(header::SET_COOKIE, value);
    }
    Ok(headers)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn refresh_token_from_body_ignores_garbage() {
        assert_eq!(refresh_token_from_body(b""), None);
        assert_eq!(refresh_token_from_body(b"not json"), None);
        assert_eq!(refresh_token_from_body(br#"{"refresh_token":"  "}"#), None);
        assert_eq!(
            refresh_token_from_body(br#"{"refresh_token":"abc"}"#).as_deref(),
            Some("abc")
        );
    }

    #[test]
    fn set_cookie_headers_appends_each_cookie() {
        let headers =
            set_cookie_headers(["a=1; Path=/".to_string(), "b=2; Path=/x".to_string()])
                .expect("headers");
        assert_eq!(headers.get_all(header::SET_COOKIE).iter().count(), 2);
    }
}
