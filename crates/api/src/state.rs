//! Shared application state for the Axum API server.

use std::sync::Arc;

use fanout_common::store::Store;
use fanout_engine::notifications::NotificationService;
use fanout_engine::publisher::PostPublisher;
use fanout_notifier::{DeliveryMetrics, QueueHandle};

/// Application state shared across all route handlers via Axum `State`.
#[derive(Clone)]
pub struct AppState {
    pub publisher: PostPublisher,
    pub notifications: NotificationService,
    pub metrics: Arc<DeliveryMetrics>,
    pub queue: QueueHandle,
}

impl AppState {
    pub fn new(store: Arc<Store>, queue: QueueHandle, metrics: Arc<DeliveryMetrics>) -> Self {
        Self {
            publisher: PostPublisher::new(Arc::clone(&store), queue.clone()),
            notifications: NotificationService::new(store),
            metrics,
            queue,
        }
    }
}
