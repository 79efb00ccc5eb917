//! HTTP API handlers and routing.

mod health;
mod read;

use axum::Router;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

pub use read::PIXEL_GIF;

/// Create the tracker router with all routes and middleware.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health endpoints
        .merge(health::routes())
        // Tracking pixel
        .merge(read::routes())
        // Middleware
        .layer(TraceLayer::new_for_http())
        // Application state
        .with_state(state)
}
