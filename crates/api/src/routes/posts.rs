//! Post publishing routes.

use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};

use fanout_common::error::AppError;
use fanout_engine::publisher::{PublishRequest, PublishResponse};

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/api/posts", post(publish_post))
}

/// POST /api/posts — Store a post and queue notifications for the author's followers.
///
/// Responds once the notifications are queued, not when they are delivered.
async fn publish_post(
    State(state): State<AppState>,
    Json(req): Json<PublishRequest>,
) -> Result<Json<PublishResponse>, AppError> {
    let response = state.publisher.publish(&req).await?;
    Ok(Json(response))
}
