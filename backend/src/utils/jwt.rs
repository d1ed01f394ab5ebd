use chrono::{DateTime, Duration, TimeZone, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenKind {
    Access,
    Refresh,
}

/// Identity carried by both access and refresh tokens. Organization and role
/// data are deliberately absent: tenant selection never requires re-signing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // user_id
    pub email: String,
    pub iat: i64,
    pub exp: i64,
    pub jti: String,
    pub token_type: TokenKind,
}

#[derive(Debug, Clone)]
pub struct JwtSettings {
    pub secret: String,
    pub access_ttl: Duration,
    pub refresh_ttl: Duration,
    pub leeway_seconds: u64,
}

#[derive(Debug, Clone)]
pub struct CredentialPair {
    pub access_token: String,
    pub refresh_token: String,
    pub access_expires_at: DateTime<Utc>,
    pub refresh_expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    #[error("token expired")]
    Expired,
    #[error("expected a {expected:?} token")]
    WrongKind { expected: TokenKind },
    #[error("invalid token")]
    Invalid,
}

impl Claims {
    pub fn new(kind: TokenKind, user_id: &str, email: &str, ttl: Duration) -> Self {
        let now = Utc::now();
        let exp = now + ttl;

        Self {
            sub: user_id.to_string(),
            email: email.to_string(),
            iat: now.timestamp(),
            exp: exp.timestamp(),
            jti: Uuid::new_v4().to_string(),
            token_type: kind,
        }
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        Utc.timestamp_opt(self.exp, 0)
            .single()
            .unwrap_or_else(Utc::now)
    }
}

pub fn create_token(
    kind: TokenKind,
    user_id: &str,
    email: &str,
    secret: &str,
    ttl: Duration,
) -> anyhow::Result<(String, Claims)> {
    let claims = Claims::new(kind, user_id, email, ttl);
    let token = encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret.as_ref()),
    )?;

    Ok((token, claims))
}

/// Mints a fresh access/refresh pair for a verified identity.
pub fn issue_credential_pair(
    user_id: &str,
    email: &str,
    settings: &JwtSettings,
) -> anyhow::Result<CredentialPair> {
    let (access_token, access_claims) = create_token(
        TokenKind::Access,
        user_id,
        email,
        &settings.secret,
        settings.access_ttl,
    )?;
    let (refresh_token, refresh_claims) = create_token(
        TokenKind::Refresh,
        user_id,
        email,
        &settings.secret,
        settings.refresh_ttl,
    )?;

    Ok(CredentialPair {
        access_token,
        refresh_token,
        access_expires_at: access_claims.expires_at(),
        refresh_expires_at: refresh_claims.expires_at(),
    })
}

pub fn verify_token(
    token: &str,
    secret: &str,
    expected: TokenKind,
    leeway_seconds: u64,
) -> Result<Claims, TokenError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.leeway = leeway_seconds;

    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_ref()),
        &validation,
    )
    .map_err(|err| match err.kind() {
        ErrorKind::ExpiredSignature => TokenError::Expired,
        _ => TokenError::Invalid,
    })?;

    if token_data.claims.token_type != expected {
        return Err(TokenError::WrongKind { expected });
    }

    Ok(token_data.claims)
}

pub fn verify_access_token(token: &str, settings: &JwtSettings) -> Result<Claims, TokenError> {
    verify_token(
        token,
        &settings.secret,
        TokenKind::Access,
        settings.leeway_seconds,
    )
}

pub fn verify_refresh_token(token: &str, settings: &JwtSettings) -> Result<Claims, TokenError> {
    verify_token(
        token,
        &settings.secret,
        TokenKind::Refresh,
        settings.leeway_seconds,
    )
}
