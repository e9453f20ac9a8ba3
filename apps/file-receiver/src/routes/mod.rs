//! Route modules for the file receiver

pub mod health;
pub mod upload;

use axum::{extract::DefaultBodyLimit, routing::get, Router};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Build the full application router
pub fn router(state: AppState) -> Router {
    Router::new()
        // `/health` is also a valid upload name
        .route(
            "/health",
            get(health::health_check).put(upload::receive_raw_health),
        )
        .merge(upload::router())
        // Uploads are expected to be large
        .layer(DefaultBodyLimit::disable())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
