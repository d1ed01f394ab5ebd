use anyhow::anyhow;
use std::{env, net::SocketAddr, time::Duration};

use crate::utils::{cookies::CookieSettings, jwt::JwtSettings};

pub const REFRESH_PATH: &str = "/api/auth/refresh";

const PLACEHOLDER_JWT_SECRET: &str = "your-secret-key-change-this-in-production";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnv {
    Development,
    Production,
}

impl AppEnv {
    fn parse(raw: &str) -> anyhow::Result<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" | "local" => Ok(AppEnv::Development),
            "production" | "prod" => Ok(AppEnv::Production),
            other => Err(anyhow!("Invalid APP_ENV value: {}", other)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub jwt_secret: String,
    pub access_token_ttl_minutes: u64,
    pub refresh_token_ttl_days: u64,
    pub org_cookie_ttl_hours: u64,
    pub jwt_leeway_seconds: u64,
    pub cookie_prefix: String,
    pub cookie_domain: Option<String>,
    pub cookie_cross_site: bool,
    pub app_env: AppEnv,
    pub bind_addr: SocketAddr,
    pub cors_allow_origins: Vec<String>,
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let jwt_secret = env::var("JWT_SECRET")
            .ok()
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty());

        let access_token_ttl_minutes = parse_env_u64("ACCESS_TOKEN_TTL_MINUTES", 15);
        let refresh_token_ttl_days = parse_env_u64("REFRESH_TOKEN_TTL_DAYS", 30);
        let org_cookie_ttl_hours = parse_env_u64("ORG_COOKIE_TTL_HOURS", 12);
        let jwt_leeway_seconds = parse_env_u64("JWT_LEEWAY_SECONDS", 30);

        let cookie_prefix = env::var("COOKIE_PREFIX")
            .ok()
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| "lockbox".to_string());
        let cookie_domain = env::var("COOKIE_DOMAIN")
            .ok()
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty());
        let cookie_cross_site = parse_env_bool("COOKIE_CROSS_SITE", false);

        let app_env = AppEnv::parse(
            &env::var("APP_ENV").unwrap_or_else(|_| "production".to_string()),
        )?;

        let bind_addr_raw = env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
        let bind_addr: SocketAddr = bind_addr_raw
            .parse()
            .map_err(|_| anyhow!("Invalid BIND_ADDR value: {}", bind_addr_raw))?;

        let cors_allow_origins = env::var("CORS_ALLOW_ORIGINS")
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|origin| !origin.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        let jwt_secret = resolve_jwt_secret(jwt_secret, app_env)?;

        let config = Config {
            jwt_secret,
            access_token_ttl_minutes,
            refresh_token_ttl_days,
            org_cookie_ttl_hours,
            jwt_leeway_seconds,
            cookie_prefix,
            cookie_domain,
            cookie_cross_site,
            app_env,
            bind_addr,
            cors_allow_origins,
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        if self.app_env == AppEnv::Production && self.jwt_secret == PLACEHOLDER_JWT_SECRET {
            return Err(anyhow!(
                "JWT_SECRET must not use the placeholder value in production"
            ));
        }
        if self.jwt_secret.len() < 16 {
            return Err(anyhow!("JWT_SECRET must be at least 16 characters"));
        }
        if self.access_token_ttl_minutes == 0 {
            return Err(anyhow!("ACCESS_TOKEN_TTL_MINUTES must be greater than zero"));
        }
        if self.refresh_token_ttl_days * 24 * 60 <= self.access_token_ttl_minutes {
            return Err(anyhow!(
                "REFRESH_TOKEN_TTL_DAYS must outlive ACCESS_TOKEN_TTL_MINUTES"
            ));
        }
        Ok(())
    }

    pub fn is_development(&self) -> bool {
        self.app_env == AppEnv::Development
    }

    pub fn jwt_settings(&self) -> JwtSettings {
        JwtSettings {
            secret: self.jwt_secret.clone(),
            access_ttl: chrono::Duration::minutes(self.access_token_ttl_minutes as i64),
            refresh_ttl: chrono::Duration::days(self.refresh_token_ttl_days as i64),
            leeway_seconds: self.jwt_leeway_seconds,
        }
    }

    pub fn cookie_settings(&self) -> CookieSettings {
        CookieSettings {
            prefix: self.cookie_prefix.clone(),
            domain: self.cookie_domain.clone(),
            cross_site: self.cookie_cross_site,
            access_ttl: Duration::from_secs(self.access_token_ttl_minutes * 60),
            refresh_ttl: Duration::from_secs(self.refresh_token_ttl_days * 24 * 60 * 60),
            org_ttl: Duration::from_secs(self.org_cookie_ttl_hours * 60 * 60),
            refresh_path: REFRESH_PATH.to_string(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            jwt_secret: PLACEHOLDER_JWT_SECRET.to_string(),
            access_token_ttl_minutes: 15,
            refresh_token_ttl_days: 30,
            org_cookie_ttl_hours: 12,
            jwt_leeway_seconds: 30,
            cookie_prefix: "lockbox".to_string(),
            cookie_domain: None,
            cookie_cross_site: false,
            app_env: AppEnv::Production,
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 3000)),
            cors_allow_origins: Vec::new(),
        }
    }
}

/// Only development may fall back to the placeholder secret.
fn resolve_jwt_secret(configured: Option<String>, app_env: AppEnv) -> anyhow::Result<String> {
    match (configured, app_env) {
        (Some(secret), _) => Ok(secret),
        (None, AppEnv::Development) => Ok(PLACEHOLDER_JWT_SECRET.to_string()),
        (None, AppEnv::Production) => Err(anyhow!("JWT_SECRET must be set when APP_ENV=production")),
    }
}

fn parse_env_u64(key: &str, default: u64) -> u64 {
    env::var(key)
        .ok()
        .and_then(|value| value.trim().parse().ok())
        .unwrap_or(default)
}

fn parse_env_bool(key: &str, default: bool) -> bool {
    env::var(key)
        .ok()
        .map(|value| matches!(value.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
        .unwrap_or(default)
}
