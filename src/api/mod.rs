use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::http::{header, HeaderName, HeaderValue, Method};
use axum::middleware::{from_fn, from_fn_with_state};
use axum::routing::{delete, get, post};
use axum::Router;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::middleware::{headers, metrics, tracking};
use crate::models::moderation::MAX_FILE_SIZE_BYTES;
use crate::AppState;

pub mod analytics;
pub mod handlers;
pub mod moderation;

/// Body limit for `/moderate`. Leaves room for multipart framing so files
/// just over the cap reach the validator and fail with its error.
const MODERATE_BODY_LIMIT: usize = MAX_FILE_SIZE_BYTES + 1024 * 1024;

/// Build the full application router.
///
/// Stages run outermost first: process time, security headers, request id,
/// CORS, tracing, metrics, usage tracking, then the handler.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        // Liveness (no auth)
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health))
        .route("/metrics", get(metrics::metrics_handler))
        // Token lifecycle (admin)
        .route(
            "/auth/tokens",
            get(handlers::list_tokens).post(handlers::create_token),
        )
        .route("/auth/tokens/:token", delete(handlers::revoke_token))
        .route("/auth/usage", get(analytics::get_usage_stats))
        // Moderation (any valid token)
        .route(
            "/moderate",
            post(moderation::moderate).layer(DefaultBodyLimit::max(MODERATE_BODY_LIMIT)),
        )
        .route("/moderate/categories", get(moderation::categories))
        .layer(from_fn_with_state(state.clone(), tracking::track_usage))
        .layer(from_fn_with_state(state.clone(), metrics::track_metrics))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(&state.config))
        .layer(from_fn(headers::request_id))
        .layer(from_fn(headers::security_headers))
        .layer(from_fn(headers::process_time))
        .with_state(state)
}

fn cors_layer(cfg: &Config) -> CorsLayer {
    let base = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            HeaderName::from_static(headers::X_REQUEST_ID),
        ])
        .expose_headers([
            HeaderName::from_static(headers::X_REQUEST_ID),
            HeaderName::from_static(headers::X_PROCESS_TIME),
        ]);

    if cfg.environment.is_development() {
        return base
            .allow_origin(AllowOrigin::mirror_request())
            .allow_credentials(true);
    }

    // `*` cannot be combined with credentials or with an explicit list.
    if cfg.allowed_origins.iter().any(|o| o == "*") {
        tracing::warn!("ALLOWED_ORIGINS contains '*'; allowing any origin without credentials");
        return base.allow_origin(AllowOrigin::any());
    }

    let allowed: Vec<HeaderValue> = cfg
        .allowed_origins
        .iter()
        .filter_map(|o| match HeaderValue::from_str(o) {
            Ok(v) => Some(v),
            Err(_) => {
                tracing::warn!(origin = %o, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    base.allow_origin(AllowOrigin::list(allowed))
        .allow_credentials(true)
}
