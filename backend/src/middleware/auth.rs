use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};

use crate::{
    error::AppError,
    state::AppState,
    utils::{cookies::extract_cookie_value, jwt::verify_access_token},
};

/// Verifies the access credential and attaches the directory `User` to the
/// request. Purely stateless: the token itself is the session.
pub async fn auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = access_token_from_headers(request.headers(), &state.cookies.access_name())
        .ok_or_else(|| AppError::unauthorized("Missing access token"))?;

    let claims = verify_access_token(&token, &state.jwt)?;

    let user = state
        .directory
        .find_user_by_id(&claims.sub)
        .await?
        .ok_or_else(|| AppError::unauthorized("User not found"))?;

    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}

fn parse_bearer_token(header: &str) -> Option<&str> {
    let (scheme, rest) = header.split_once(' ')?;
    if scheme.eq_ignore_ascii_case("bearer") {
        let token = rest.trim();
        (!token.is_empty()).then_some(token)
    } else {
        None
    }
}

/// Bearer header first (non-browser clients), then the access cookie.
pub fn access_token_from_headers(headers: &HeaderMap, cookie_name: &str) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(parse_bearer_token)
        .map(str::to_string)
        .or_else(|| cookie_from_headers(headers, cookie_name))
}

pub fn cookie_from_headers(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .find_map(|raw| extract_cookie_value(raw, name))
}
