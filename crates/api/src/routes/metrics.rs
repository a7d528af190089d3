//! Delivery metrics endpoint.

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/api/metrics", get(get_metrics))
}

/// GET /api/metrics — Point-in-time delivery counters and queue depth.
async fn get_metrics(State(state): State<AppState>) -> Json<serde_json::Value> {
    let snapshot = state.metrics.snapshot();
    let system_status = if state.queue.is_closed() {
        "stopping"
    } else {
        "healthy"
    };

    Json(json!({
        "status": "success",
        "data": {
            "store_metrics": {
                "total_notifications_sent": snapshot.total_sent,
                "failed_attempts": snapshot.total_failed,
                "average_delivery_time": format!("{}ms", snapshot.average_delivery_ms as u64),
            },
            "queue": {
                "queue_size": state.queue.len(),
                "capacity": state.queue.capacity(),
                "workers_active": snapshot.active_workers,
            },
            "system_status": system_status,
        }
    }))
}
