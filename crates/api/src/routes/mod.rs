pub mod health;
pub mod metrics;
pub mod notifications;
pub mod posts;

use axum::Router;

use crate::state::AppState;

/// Build the complete API router with all routes.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .merge(health::router())
        .merge(posts::router())
        .merge(notifications::router())
        .merge(metrics::router())
        .with_state(state)
}
