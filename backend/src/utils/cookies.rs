use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::jwt::CredentialPair;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SameSite {
    Lax,
    Strict,
    None,
}

#[derive(Debug, Clone)]
pub struct CookieOptions {
    pub secure: bool,
    pub same_site: SameSite,
    pub domain: Option<String>,
}

pub const ACCESS_COOKIE_SUFFIX: &str = "access";
pub const REFRESH_COOKIE_SUFFIX: &str = "refresh";
pub const ORG_COOKIE_SUFFIX: &str = "org";
pub const ACCESS_COOKIE_PATH: &str = "/";
pub const ORG_COOKIE_PATH: &str = "/";

/// Names, lifetimes and scoping of the session cookie triple.
#[derive(Debug, Clone)]
pub struct CookieSettings {
    pub prefix: String,
    pub domain: Option<String>,
    pub cross_site: bool,
    pub access_ttl: Duration,
    pub refresh_ttl: Duration,
    pub org_ttl: Duration,
    /// The refresh cookie is only ever sent to this path.
    pub refresh_path: String,
}

impl CookieSettings {
    pub fn access_name(&self) -> String {
        format!("{}_{}", self.prefix, ACCESS_COOKIE_SUFFIX)
    }

    pub fn refresh_name(&self) -> String {
        format!("{}_{}", self.prefix, REFRESH_COOKIE_SUFFIX)
    }

    pub fn org_name(&self) -> String {
        format!("{}_{}", self.prefix, ORG_COOKIE_SUFFIX)
    }

    /// Cross-site delivery is only possible over secure transport, so the two
    /// flags always travel together.
    pub fn options(&self) -> CookieOptions {
        if self.cross_site {
            CookieOptions {
                secure: true,
                same_site: SameSite::None,
                domain: self.domain.clone(),
            }
        } else {
            CookieOptions {
                secure: false,
                same_site: SameSite::Lax,
                domain: self.domain.clone(),
            }
        }
    }

    pub fn bind_credentials(&self, pair: &CredentialPair) -> Vec<String> {
        let options = self.options();
        vec![
            build_auth_cookie(
                &self.access_name(),
                &pair.access_token,
                self.access_ttl,
                ACCESS_COOKIE_PATH,
                &options,
            ),
            build_auth_cookie(
                &self.refresh_name(),
                &pair.refresh_token,
                self.refresh_ttl,
                &self.refresh_path,
                &options,
            ),
        ]
    }

    pub fn bind_organization(&self, org_id: &str) -> String {
        build_auth_cookie(
            &self.org_name(),
            org_id,
            self.org_ttl,
            ORG_COOKIE_PATH,
            &self.options(),
        )
    }

    /// Clearing must repeat the exact path and domain used when setting.
    pub fn clear_credentials(&self) -> Vec<String> {
        let options = self.options();
        vec![
            build_clear_cookie(&self.access_name(), ACCESS_COOKIE_PATH, &options),
            build_clear_cookie(&self.refresh_name(), &self.refresh_path, &options),
        ]
    }

    pub fn clear_organization(&self) -> String {
        build_clear_cookie(&self.org_name(), ORG_COOKIE_PATH, &self.options())
    }
}

pub fn build_auth_cookie(
    name: &str,
    value: &str,
    max_age: Duration,
    path: &str,
    options: &CookieOptions,
) -> String {
    let mut cookie = format!(
        "{}={}; Path={}; Max-Age={}; HttpOnly; SameSite={}",
        name,
        value,
        path,
        max_age.as_secs(),
        same_site_value(options.same_site)
    );
    append_scope(&mut cookie, options);
    cookie
}

pub fn build_clear_cookie(name: &str, path: &str, options: &CookieOptions) -> String {
    let mut cookie = format!(
        "{}=; Path={}; Max-Age=0; HttpOnly; SameSite={}",
        name,
        path,
        same_site_value(options.same_site)
    );
    append_scope(&mut cookie, options);
    cookie
}

pub fn extract_cookie_value(header: &str, name: &str) -> Option<String> {
    header.split(';').map(str::trim).find_map(|pair| {
        let mut parts = pair.splitn(2, '=');
        let key = parts.next()?.trim();
        let value = parts.next()?.trim();
        if key == name && !value.is_empty() {
            Some(value.to_string())
        } else {
            None
        }
    })
}

fn append_scope(cookie: &mut String, options: &CookieOptions) {
    if let Some(domain) = &options.domain {
        cookie.push_str("; Domain=");
        cookie.push_str(domain);
    }
    if options.secure {
        cookie.push_str("; Secure");
    }
}

fn same_site_value(same_site: SameSite) -> &'static str {
    match same_site {
        SameSite::Lax => "Lax",
        SameSite::Strict => "Strict",
        SameSite::None => "None",
    }
}
