//! Entity CRUD routes. Paths are parameterized; handlers resolve the entity from the collection segment.

use crate::handlers::entity::{create, delete as delete_handler, list, read, service_document, update};
use crate::state::AppState;
use axum::{routing::get, Router};

/// Versioned prefix of every entity route.
pub const API_PREFIX: &str = "/api/v1";

pub fn entity_routes() -> Router<AppState> {
    Router::new()
        .route(API_PREFIX, get(service_document))
        .route(&format!("{}/:collection", API_PREFIX), get(list).post(create))
        .route(
            &format!("{}/:collection/:key", API_PREFIX),
            get(read).patch(update).delete(delete_handler),
        )
}
