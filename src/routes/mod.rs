//! Router assembly: common and entity routes behind the shared middleware stack.

mod common;
mod entity;

pub use common::common_routes;
pub use entity::{entity_routes, API_PREFIX};

use crate::handlers::fallback;
use crate::middleware::response_headers_middleware;
use crate::settings::Settings;
use crate::state::AppState;
use axum::http::{HeaderValue, Method};
use axum::{middleware, Router};
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

/// Largest accepted request body.
pub const MAX_BODY_BYTES: usize = 1024 * 1024;

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::DELETE, Method::OPTIONS])
        .allow_headers(Any);
    if allowed_origins.is_empty() {
        return layer.allow_origin(Any);
    }
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|o| match HeaderValue::from_str(o) {
            Ok(v) => Some(v),
            Err(_) => {
                tracing::warn!(origin = %o, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    layer.allow_origin(origins)
}

/// The complete service.
pub fn app(state: AppState, settings: &Settings) -> Router {
    Router::new()
        .merge(common_routes())
        .merge(entity_routes())
        .fallback(fallback)
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(cors_layer(&settings.allowed_origins))
        .layer(middleware::from_fn(response_headers_middleware))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
