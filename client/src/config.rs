use std::time::Duration;

use url::Url;

use crate::error::ClientError;

pub const DEFAULT_REFRESH_PATH: &str = "/api/auth/refresh";
pub const DEFAULT_LOGIN_PATH: &str = "/login";

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: Url,
    /// Applied to every outbound request, including the refresh call.
    pub request_timeout: Duration,
    pub refresh_path: String,
    /// Handed to the session-expired handler as the re-authentication target.
    pub login_path: String,
    pub keepalive_period: Duration,
}

impl ClientConfig {
    pub fn new(base_url: &str) -> Result<Self, ClientError> {
        let base_url = Url::parse(base_url)
            .map_err(|e| ClientError::InvalidRequest(format!("invalid base url: {}", e)))?;
        Ok(Self {
            base_url,
            request_timeout: Duration::from_secs(10),
            refresh_path: DEFAULT_REFRESH_PATH.to_string(),
            login_path: DEFAULT_LOGIN_PATH.to_string(),
            keepalive_period: Duration::from_secs(25 * 60),
        })
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_keepalive_period(mut self, period: Duration) -> Self {
        self.keepalive_period = period;
        self
    }

    pub fn url(&self, path: &str) -> Result<Url, ClientError> {
        self.base_url
            .join(path)
            .map_err(|e| ClientError::InvalidRequest(format!("invalid path {}: {}", path, e)))
    }

    pub fn is_refresh_path(&self, path: &str) -> bool {
        let path = path.split('?').next().unwrap_or(path);
        path.trim_end_matches('/') == self.refresh_path.trim_end_matches('/')
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_follow_session_lifetimes() {
        let config = ClientConfig::new("http://localhost:3000").expect("config");
        assert_eq!(config.request_timeout, Duration::from_secs(10));
        assert_eq!(config.keepalive_period, Duration::from_secs(1500));
        assert_eq!(config.refresh_path, "/api/auth/refresh");
    }

    #[test]
    fn refresh_path_matching_ignores_query_and_trailing_slash() {
        let config = ClientConfig::new("http://localhost:3000").expect("config");
        assert!(config.is_refresh_path("/api/auth/refresh"));
        assert!(config.is_refresh_path("/api/auth/refresh/"));
        assert!(config.is_refresh_path("/api/auth/refresh?x=1"));
        assert!(!config.is_refresh_path("/api/auth/me"));
    }

    #[test]
    fn url_joins_absolute_paths() {
        let config = ClientConfig::new("http://127.0.0.1:8080").expect("config");
        assert_eq!(
            config.url("/api/auth/me").expect("url").as_str(),
            "http://127.0.0.1:8080/api/auth/me"
        );
        assert!(ClientConfig::new("not a url").is_err());
    }
}
