use axum::{
    http::{header, HeaderName, HeaderValue, Method},
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};

use crate::{config::REFRESH_PATH, docs, handlers, middleware, state::AppState};

pub fn build_router(state: AppState) -> Router {
    // Public routes (no access token)
    let public_routes = Router::new()
        .route("/api/health", get(handlers::health::health))
        .route("/api/openapi.json", get(docs::openapi_json))
        .route("/api/auth/register", post(handlers::auth::register))
        .route("/api/auth/login", post(handlers::auth::login))
        .route(REFRESH_PATH, post(handlers::auth::refresh))
        .route("/api/auth/logout", post(handlers::auth::logout));

    // Authenticated, tenant not required yet
    let session_routes = Router::new()
        .route("/api/auth/me", get(handlers::auth::me))
        .route(
            "/api/auth/select-organization",
            post(handlers::auth::select_organization),
        )
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::auth,
        ));

    // Authenticated and tenant-scoped; auth is the outer layer
    let tenant_routes = Router::new()
        .route("/api/workspace", get(handlers::workspace::current_workspace))
        .route(
            "/api/workspace/settings",
            get(handlers::workspace::workspace_settings),
        )
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::require_tenant,
        ))
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::auth,
        ));

    let mut app = Router::new()
        .merge(public_routes)
        .merge(session_routes)
        .merge(tenant_routes);

    if state.config.is_development() {
        app = app.layer(axum_middleware::from_fn(middleware::expose_internal_errors));
    }
    if let Some(cors) = cors_layer(&state.config.cors_allow_origins) {
        app = app.layer(cors);
    }

    app.layer(
        ServiceBuilder::new()
            .layer(axum_middleware::from_fn(middleware::request_id))
            .layer(TraceLayer::new_for_http())
            .layer(axum_middleware::from_fn(middleware::log_error_responses)),
    )
    .with_state(state)
}

/// Credentialed CORS needs explicit origins; without any configured origin the
/// layer is skipped and only same-origin callers are served.
fn cors_layer(origins: &[String]) -> Option<CorsLayer> {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    if origins.is_empty() {
        return None;
    }

    Some(
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_credentials(true)
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PUT,
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_headers([
                header::CONTENT_TYPE,
                header::AUTHORIZATION,
                HeaderName::from_static(middleware::ORG_OVERRIDE_HEADER),
                HeaderName::from_static(middleware::REQUEST_ID_HEADER),
            ])
            .max_age(std::time::Duration::from_secs(24 * 60 * 60)),
    )
}
