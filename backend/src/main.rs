use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use lockbox_backend::{
    build_router,
    config::Config,
    repositories::{DirectoryRepository, InMemoryDirectory},
    state::AppState,
};

fn mask_secret(s: &str) -> String {
    if s.is_empty() {
        return "<empty>".into();
    }
    let prefix = s.chars().take(4).collect::<String>();
    format!("{}*** (len={})", prefix, s.len())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "lockbox_backend=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::load()?;
    tracing::info!(
        jwt_secret = %mask_secret(&config.jwt_secret),
        access_token_ttl_minutes = config.access_token_ttl_minutes,
        refresh_token_ttl_days = config.refresh_token_ttl_days,
        org_cookie_ttl_hours = config.org_cookie_ttl_hours,
        cookie_prefix = %config.cookie_prefix,
        cookie_domain = ?config.cookie_domain,
        cookie_cross_site = config.cookie_cross_site,
        app_env = ?config.app_env,
        "Loaded configuration from environment/.env"
    );

    // The hosted directory is an external collaborator; development runs
    // against a seeded in-process stand-in.
    let directory: Arc<dyn DirectoryRepository> = if config.is_development() {
        tracing::warn!("Using seeded in-memory directory (development mode)");
        Arc::new(InMemoryDirectory::seeded()?)
    } else {
        Arc::new(InMemoryDirectory::new())
    };

    let addr = config.bind_addr;
    let app = build_router(AppState::new(config, directory));

    tracing::info!("Server listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
