//! Route configuration and setup.
//!
//! Domain route groups live in [domains](domains); the health check in [health](health).

mod domains;
pub mod health;

use crate::auth::middleware::{AuthFailureLimiter, AuthState};
use crate::constants::{AUTH_FAILURE_WINDOW_SECS, AUTH_MAX_FAILURES};
use crate::state::AppState;
use axum::{
    extract::{DefaultBodyLimit, State},
    http::{HeaderValue, Method},
    routing::get,
    Json, Router,
};
use catalog_core::Config;
use std::sync::Arc;
use tower::limit::ConcurrencyLimitLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

/// Headroom on top of the largest file for the rest of a multipart body
const MULTIPART_OVERHEAD_BYTES: usize = 1024 * 1024;

/// Setup all application routes
pub fn setup_routes(config: &Config, state: Arc<AppState>) -> Result<Router<()>, anyhow::Error> {
    let cors = setup_cors(config)?;
    let auth_state = setup_auth_middleware(&state);

    let public_routes = public_routes();
    let protected_routes =
        protected_routes(state.clone()).layer(axum::middleware::from_fn_with_state(
            Arc::new(auth_state),
            crate::auth::middleware::auth_middleware,
        ));

    let mut app = public_routes
        .merge(protected_routes)
        .merge(utoipa_rapidoc::RapiDoc::new("/api-docs/openapi.json").path("/docs"));

    // a relative base URL means this process serves the files itself
    let media_base = config.media_base_url.trim_end_matches('/');
    if media_base.starts_with('/') {
        app = app.nest_service(media_base, ServeDir::new(&config.media_root));
    }

    let app = app
        .layer(ConcurrencyLimitLayer::new(config.http_concurrency_limit))
        .layer(RequestBodyLimitLayer::new(
            config.max_upload_size_bytes() + MULTIPART_OVERHEAD_BYTES,
        ))
        .layer(DefaultBodyLimit::disable())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    Ok(app)
}

fn setup_cors(config: &Config) -> Result<CorsLayer, anyhow::Error> {
    let methods = [
        Method::GET,
        Method::POST,
        Method::PUT,
        Method::DELETE,
        Method::OPTIONS,
    ];
    let cors = if config.cors_origins.iter().any(|o| o == "*") {
        tracing::warn!("CORS configured to allow all origins - not recommended for production");
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(methods)
            .allow_headers(Any)
    } else {
        let origins = config
            .cors_origins
            .iter()
            .map(|o| o.parse::<HeaderValue>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| anyhow::anyhow!("Invalid CORS origin: {}", e))?;
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(methods)
            .allow_headers(Any)
    };
    Ok(cors)
}

fn setup_auth_middleware(state: &Arc<AppState>) -> AuthState {
    AuthState {
        users: state.db.users.clone(),
        auth_failure_limiter: Some(Arc::new(AuthFailureLimiter::new(
            AUTH_MAX_FAILURES,
            AUTH_FAILURE_WINDOW_SECS,
        ))),
        trusted_proxy_count: state.config.trusted_proxy_count,
    }
}

fn public_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/health",
            get(|State(state): State<Arc<AppState>>| health::health_check(state)),
        )
        .route(
            "/api-docs/openapi.json",
            get(|| async { Json(crate::api_doc::get_openapi_spec()) }),
        )
}

fn protected_routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .merge(domains::import_routes(state.clone()))
        .merge(domains::entry_routes(state.clone()))
        .merge(domains::media_routes(state.clone()))
        .merge(domains::tag_routes(state.clone()))
        .merge(domains::assign_routes(state.clone()))
        .with_state(state)
}
