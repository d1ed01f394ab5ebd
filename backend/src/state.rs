use std::sync::Arc;

use crate::{
    config::Config,
    repositories::DirectoryRepository,
    utils::{cookies::CookieSettings, jwt::JwtSettings},
};

/// Immutable per-process state shared by every handler. Nothing in here is
/// mutated while serving requests.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub directory: Arc<dyn DirectoryRepository>,
    pub jwt: Arc<JwtSettings>,
    pub cookies: Arc<CookieSettings>,
}

impl AppState {
    pub fn new(config: Config, directory: Arc<dyn DirectoryRepository>) -> Self {
        let jwt = Arc::new(config.jwt_settings());
        let cookies = Arc::new(config.cookie_settings());
        Self {
            config: Arc::new(config),
            directory,
            jwt,
            cookies,
        }
    }
}
