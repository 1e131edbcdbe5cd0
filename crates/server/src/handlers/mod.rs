//! HTTP handlers and routing.

pub(crate) mod admin;
pub(crate) mod chat;
pub(crate) mod health;

pub use admin::sync_knowledge;
pub use chat::query;
pub use health::{health, root};

use crate::state::AppState;
use axum::extract::DefaultBodyLimit;
use axum::http::{header, HeaderValue, Method};
use axum::routing::{get, post};
use axum::Router;
use itt_core::{AppError, AppResult};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

const MAX_BODY_BYTES: usize = 64 * 1024;

/// Build the application router.
pub fn router(state: AppState, allowed_origins: &[String]) -> AppResult<Router> {
    Ok(Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/chat/query", post(query))
        .route("/admin/sync-knowledge", post(sync_knowledge))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(cors_layer(allowed_origins)?)
        .layer(TraceLayer::new_for_http())
        .with_state(state))
}

/// CORS for the configured frontends only, with credentials.
pub fn cors_layer(allowed_origins: &[String]) -> AppResult<CorsLayer> {
    let origins = allowed_origins
        .iter()
        .map(|origin| {
            HeaderValue::from_str(origin.trim_end_matches('/')).map_err(|e| {
                AppError::Config(format!("Invalid CORS origin '{}': {}", origin, e))
            })
        })
        .collect::<AppResult<Vec<_>>>()?;

    Ok(CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .allow_credentials(true))
}
