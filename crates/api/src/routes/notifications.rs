//! Notification read routes.

use axum::extract::{Path, State};
use axum::routing::get;
use axum::{Json, Router};

use fanout_common::types::Notification;

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/api/users/{user_id}/notifications", get(list_notifications))
}

/// GET /api/users/:user_id/notifications — The 20 most recent notifications, newest first.
async fn list_notifications(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Json<Vec<Notification>> {
    Json(state.notifications.stream_notifications(&user_id))
}
